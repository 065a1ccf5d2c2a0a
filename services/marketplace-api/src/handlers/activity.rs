use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use types::prelude::ActivityKind;

use crate::error::AppError;
use crate::resp::ApiResponse;
use crate::services::activity::{self, ActivityPage, ActivityQuery};
use crate::services::page_bounds;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    /// Comma-separated chain names.
    pub chain: String,
    pub collection_address: Option<String>,
    pub token_id: Option<String>,
    pub user_address: Option<String>,
    /// Comma-separated event kind names; unknown names are ignored.
    #[serde(default)]
    pub event_types: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub page_size: usize,
}

pub async fn activities(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<ApiResponse<ActivityPage>>, AppError> {
    let chain_ids = super::split_list(&params.chain)
        .iter()
        .map(|chain| super::chain_id_for(&state, chain))
        .collect::<Result<Vec<_>, _>>()?;
    let event_kinds = super::split_list(&params.event_types)
        .iter()
        .filter_map(|name| ActivityKind::parse(name))
        .collect();

    let query = ActivityQuery {
        collection_address: params.collection_address,
        token_id: params.token_id,
        user_address: params.user_address,
        event_kinds,
    };
    let (offset, limit) = page_bounds(params.page, params.page_size);
    let page = activity::activities(&state, chain_ids, query, offset, limit).await?;
    Ok(Json(ApiResponse::ok(page)))
}
