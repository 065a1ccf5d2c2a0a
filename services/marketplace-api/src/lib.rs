//! Multi-chain marketplace read API
//!
//! Aggregates order-book state replicated from several chains and
//! answers best-bid, listing, activity and ranking queries. Request
//! flow: session auth, then response memoization, then a thin handler
//! over the service layer, which fans queries out per chain and runs
//! the bid resolution engine over the merged rows.

pub mod aggregator;
pub mod auth;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod handlers;
pub mod kv;
pub mod resolve;
pub mod resp;
pub mod retry;
pub mod router;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
