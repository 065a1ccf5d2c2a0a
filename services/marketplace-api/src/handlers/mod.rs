//! HTTP handlers
//!
//! Thin translation layer: parse and validate request parameters,
//! call the matching service, wrap the result in the response
//! envelope. No business logic here.

pub mod activity;
pub mod collection;
pub mod orders;
pub mod portfolio;
pub mod ranking;
pub mod user;

use types::prelude::Period;

use crate::error::AppError;
use crate::state::AppState;

/// Resolves a chain name query parameter to its configured id.
pub(crate) fn chain_id_for(state: &AppState, chain: &str) -> Result<i32, AppError> {
    state
        .config
        .chain_id(chain)
        .ok_or_else(|| AppError::BadRequest(format!("unknown chain: {chain}")))
}

pub(crate) fn parse_period(raw: &str) -> Result<Period, AppError> {
    Period::parse(raw).map_err(|err| AppError::BadRequest(err.to_string()))
}

/// Splits a comma-separated list parameter, dropping empty segments.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
