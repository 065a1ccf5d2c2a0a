use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::resp::ApiResponse;
use crate::services::orders::{self, OrderInfo};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderInfosParams {
    pub chain: String,
    pub collection_address: String,
    /// Comma-separated token ids.
    pub token_ids: String,
}

pub async fn order_infos(
    State(state): State<AppState>,
    Query(params): Query<OrderInfosParams>,
) -> Result<Json<ApiResponse<Vec<OrderInfo>>>, AppError> {
    let chain_id = super::chain_id_for(&state, &params.chain)?;
    let token_ids = super::split_list(&params.token_ids);
    let infos =
        orders::order_infos(&state, chain_id, &params.collection_address, token_ids).await?;
    Ok(Json(ApiResponse::ok(infos)))
}
