use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::resp::ApiResponse;
use crate::services::user::{self, LoginMessage, LoginResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginMessageParams {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub address: String,
    pub message: String,
}

pub async fn login_message(
    State(state): State<AppState>,
    Query(params): Query<LoginMessageParams>,
) -> Result<Json<ApiResponse<LoginMessage>>, AppError> {
    let message = user::login_message(&state, &params.address).await?;
    Ok(Json(ApiResponse::ok(message)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, AppError> {
    let result = user::login(&state, &request.address, &request.message).await?;
    Ok(Json(ApiResponse::ok(result)))
}
