use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::resp::ApiResponse;
use crate::services::ranking::{self, CollectionRanking};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RankingParams {
    pub chain: String,
    pub period: String,
}

pub async fn top_collections(
    State(state): State<AppState>,
    Query(params): Query<RankingParams>,
) -> Result<Json<ApiResponse<Vec<CollectionRanking>>>, AppError> {
    let chain_id = super::chain_id_for(&state, &params.chain)?;
    let period = super::parse_period(&params.period)?;
    let rankings = ranking::top_collections(&state, chain_id, period).await?;
    Ok(Json(ApiResponse::ok(rankings)))
}
