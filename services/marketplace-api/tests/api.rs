//! End-to-end tests over the assembled router: auth middleware,
//! response cache and the order-info read path together.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use types::prelude::*;

use marketplace_api::chain::{ChainClient, ChainClients, StaticChainClient};
use marketplace_api::config::Config;
use marketplace_api::kv::MemoryKv;
use marketplace_api::router::build_router;
use marketplace_api::state::AppState;
use marketplace_api::store::{unix_now, MemoryStore};

fn order(order_id: &str, kind: OrderKind, token_id: &str, price: i64, maker: &str) -> Order {
    Order {
        order_id: order_id.to_string(),
        collection_address: "0xcol".to_string(),
        token_id: token_id.to_string(),
        kind,
        price: Decimal::from(price),
        quantity_remaining: 1,
        size: 1,
        maker: maker.to_string(),
        expire_time: unix_now() + 3600,
        event_time: unix_now(),
        salt: 1,
        marketplace_id: 1,
        status: OrderStatus::Active,
    }
}

fn seeded_state() -> AppState {
    let store = MemoryStore::new();
    store.insert_item(
        1,
        Item {
            chain_id: 1,
            collection_address: "0xcol".to_string(),
            token_id: "1".to_string(),
            owner: "0xowner".to_string(),
            name: "One".to_string(),
        },
    );
    store.insert_order(1, order("bid", OrderKind::ItemBid, "1", 9, "0xbidder"));
    store.insert_order(1, order("list", OrderKind::Listing, "1", 12, "0xowner"));

    let config = Config::default();
    let mut clients = ChainClients::new();
    for chain in &config.chains {
        clients.insert(
            chain.chain_id,
            Arc::new(StaticChainClient::new()) as Arc<dyn ChainClient>,
        );
    }
    AppState::new(config, Arc::new(store), Arc::new(MemoryKv::new()), clients)
}

async fn get_json(app: &axum::Router, uri: &str, session: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = session {
        builder = builder.header("session_id", token);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn order_infos_resolves_and_caches() {
    let state = seeded_state();
    let app = build_router(state.clone());
    let uri = "/api/v1/orders?chain=eth&collection_address=0xcol&token_ids=1";

    let (status, body) = get_json(&app, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    let info = &body["data"][0];
    assert_eq!(info["token_id"], "1");
    assert_eq!(info["best_bid"]["order_id"], "bid");
    assert_eq!(info["listing"]["order_id"], "list");

    // Same request again comes out of the response cache unchanged.
    let (_, again) = get_json(&app, uri, None).await;
    assert_eq!(body, again);
}

#[tokio::test]
async fn unknown_chain_is_a_bad_request() {
    let app = build_router(seeded_state());
    let (status, body) =
        get_json(&app, "/api/v1/orders?chain=mars&collection_address=0xcol&token_ids=1", None)
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 40000);
}

#[tokio::test]
async fn portfolio_requires_session() {
    let app = build_router(seeded_state());
    let (status, body) = get_json(&app, "/api/v1/portfolio/bids", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 40001);
}

#[tokio::test]
async fn garbled_session_header_rejected_before_handler() {
    let app = build_router(seeded_state());
    let (status, body) = get_json(&app, "/api/v1/portfolio/bids", Some("zz")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 40001);
}

#[tokio::test]
async fn login_then_portfolio_round_trip() {
    let state = seeded_state();
    let app = build_router(state.clone());

    let (status, issued) =
        get_json(&app, "/api/v1/user/login-message?address=0xbidder", None).await;
    assert_eq!(status, StatusCode::OK);
    let message = issued["data"]["message"].as_str().unwrap().to_string();

    let login = Request::builder()
        .method("POST")
        .uri("/api/v1/user/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"address": "0xbidder", "message": message}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, bids) = get_json(&app, "/api/v1/portfolio/bids", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bids["code"], 200);
    let rows = bids["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["order_ids"][0], "bid");
}

#[tokio::test]
async fn expired_session_yields_expired_code() {
    let state = seeded_state();
    let app = build_router(state.clone());

    // Token is well formed but there is no session record behind it.
    let key = marketplace_api::session::login_session_key("0xghost");
    let token = marketplace_api::session::encrypt_token(
        &key,
        state.config.session_secret.as_bytes(),
    )
    .unwrap();

    let (status, body) = get_json(&app, "/api/v1/portfolio/bids", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 40002);
}
