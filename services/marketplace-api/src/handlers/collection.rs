use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::resolve::BestBidView;
use crate::resp::ApiResponse;
use crate::services::collection::{
    self, CollectionDetail, CollectionItemsPage, ItemDetail,
};
use crate::services::page_bounds;
use crate::state::AppState;
use crate::store::PricePoint;

#[derive(Debug, Deserialize)]
pub struct ChainParam {
    pub chain: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemsParams {
    pub chain: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub page_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct TopBidsParams {
    pub chain: String,
    #[serde(default = "default_top_bids_limit")]
    pub limit: usize,
}

fn default_top_bids_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub chain: String,
    pub period: String,
}

pub async fn detail(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<ChainParam>,
) -> Result<Json<ApiResponse<CollectionDetail>>, AppError> {
    let chain_id = super::chain_id_for(&state, &params.chain)?;
    let detail = collection::collection_detail(&state, chain_id, &address).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

pub async fn items(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<ItemsParams>,
) -> Result<Json<ApiResponse<CollectionItemsPage>>, AppError> {
    let chain_id = super::chain_id_for(&state, &params.chain)?;
    let (offset, limit) = page_bounds(params.page, params.page_size);
    let page = collection::collection_items(&state, chain_id, &address, offset, limit).await?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn item_detail(
    State(state): State<AppState>,
    Path((address, token_id)): Path<(String, String)>,
    Query(params): Query<ChainParam>,
) -> Result<Json<ApiResponse<ItemDetail>>, AppError> {
    let chain_id = super::chain_id_for(&state, &params.chain)?;
    let detail = collection::item_detail(&state, chain_id, &address, &token_id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

pub async fn bids(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<ItemsParams>,
) -> Result<Json<ApiResponse<Vec<BestBidView>>>, AppError> {
    let chain_id = super::chain_id_for(&state, &params.chain)?;
    let (offset, limit) = page_bounds(params.page, params.page_size);
    let bids = collection::bids_page(&state, chain_id, &address, offset, limit).await?;
    Ok(Json(ApiResponse::ok(bids)))
}

pub async fn top_bids(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<TopBidsParams>,
) -> Result<Json<ApiResponse<Vec<BestBidView>>>, AppError> {
    let chain_id = super::chain_id_for(&state, &params.chain)?;
    let bids = collection::top_bids(&state, chain_id, &address, params.limit).await?;
    Ok(Json(ApiResponse::ok(bids)))
}

pub async fn history_sales(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<Vec<PricePoint>>>, AppError> {
    let chain_id = super::chain_id_for(&state, &params.chain)?;
    let period = super::parse_period(&params.period)?;
    let points = collection::history_sales(&state, chain_id, &address, period).await?;
    Ok(Json(ApiResponse::ok(points)))
}
