//! Route table and middleware stack
//!
//! Public read endpoints sit behind the response cache; portfolio and
//! login endpoints do not, because the cache fingerprint covers only
//! path, query and body and would mix sessions. Session auth wraps
//! everything so even cached routes see a validated identity header.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{auth, cache, handlers};

pub fn build_router(state: AppState) -> Router {
    let cached = Router::new()
        .route("/orders", get(handlers::orders::order_infos))
        .route("/collections/:address", get(handlers::collection::detail))
        .route("/collections/:address/items", get(handlers::collection::items))
        .route(
            "/collections/:address/items/:token_id",
            get(handlers::collection::item_detail),
        )
        .route("/collections/:address/bids", get(handlers::collection::bids))
        .route(
            "/collections/:address/top-bids",
            get(handlers::collection::top_bids),
        )
        .route(
            "/collections/:address/history-sales",
            get(handlers::collection::history_sales),
        )
        .route("/activities", get(handlers::activity::activities))
        .route("/ranking", get(handlers::ranking::top_collections))
        .layer(from_fn_with_state(state.clone(), cache::response_cache));

    let session_scoped = Router::new()
        .route("/portfolio/items", get(handlers::portfolio::items))
        .route("/portfolio/collections", get(handlers::portfolio::collections))
        .route("/portfolio/listings", get(handlers::portfolio::listings))
        .route("/portfolio/bids", get(handlers::portfolio::bids))
        .route("/user/login-message", get(handlers::user::login_message))
        .route("/user/login", post(handlers::user::login));

    Router::new()
        .nest("/api/v1", cached.merge(session_scoped))
        .layer(from_fn_with_state(state.clone(), auth::session_auth))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
