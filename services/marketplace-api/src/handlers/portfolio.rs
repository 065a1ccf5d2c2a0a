//! Portfolio endpoints, all session gated. Results cover every
//! address proven by the session header.

use axum::extract::State;
use axum::{Extension, Json};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::resp::ApiResponse;
use crate::services::portfolio::{self, ChainItem, ChainListing, GroupedBid, UserCollection};
use crate::state::AppState;

fn require_user(user: Option<Extension<AuthUser>>) -> Result<AuthUser, AppError> {
    user.map(|Extension(u)| u).ok_or(AppError::TokenVerify)
}

pub async fn items(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> Result<Json<ApiResponse<Vec<ChainItem>>>, AppError> {
    let user = require_user(user)?;
    let mut all = Vec::new();
    for address in &user.0 {
        all.extend(portfolio::user_items(&state, address).await?);
    }
    Ok(Json(ApiResponse::ok(all)))
}

pub async fn collections(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> Result<Json<ApiResponse<Vec<UserCollection>>>, AppError> {
    let user = require_user(user)?;
    let mut all = Vec::new();
    for address in &user.0 {
        all.extend(portfolio::user_collections(&state, address).await?);
    }
    Ok(Json(ApiResponse::ok(all)))
}

pub async fn listings(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> Result<Json<ApiResponse<Vec<ChainListing>>>, AppError> {
    let user = require_user(user)?;
    let mut all = Vec::new();
    for address in &user.0 {
        all.extend(portfolio::user_listings(&state, address).await?);
    }
    Ok(Json(ApiResponse::ok(all)))
}

pub async fn bids(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> Result<Json<ApiResponse<Vec<GroupedBid>>>, AppError> {
    let user = require_user(user)?;
    let mut all = Vec::new();
    for address in &user.0 {
        all.extend(portfolio::user_bids(&state, address).await?);
    }
    Ok(Json(ApiResponse::ok(all)))
}
