//! Response memoization middleware
//!
//! Wrapped routes answer repeated identical requests straight from
//! the cache store. A request is identified by path, raw query string
//! and body; long fingerprints are folded through SHA-512 so keys
//! stay bounded. Only application-level successes are stored or
//! served; the store is shared across instances, so the hit path
//! re-checks the stored envelope instead of trusting the write guard.
//! The write is set-if-absent so concurrent misses on one key produce
//! a single store entry. Cache-store failures in either direction
//! degrade to a normal pass-through, never to a request failure.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::error::AppError;
use crate::kv::API_CACHE_PREFIX;
use crate::resp::is_success_body;
use crate::state::AppState;

/// Fingerprints longer than this are digested.
const MAX_RAW_FINGERPRINT: usize = 128;

/// Request body buffering cap for fingerprinting.
const MAX_BODY_BYTES: usize = 1 << 20;

#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    status: u16,
    headers: Vec<(String, Vec<u8>)>,
    body: Vec<u8>,
}

/// Cache key for one request. The raw fingerprint is
/// `path,query` followed by the body; anything over
/// `MAX_RAW_FINGERPRINT` bytes is replaced by its SHA-512 hex digest.
pub fn cache_key(path: &str, raw_query: &str, body: &[u8]) -> String {
    let mut fingerprint =
        Vec::with_capacity(path.len() + 1 + raw_query.len() + body.len());
    fingerprint.extend_from_slice(path.as_bytes());
    fingerprint.push(b',');
    fingerprint.extend_from_slice(raw_query.as_bytes());
    fingerprint.extend_from_slice(body);

    if fingerprint.len() > MAX_RAW_FINGERPRINT {
        let digest = Sha512::digest(&fingerprint);
        format!("{API_CACHE_PREFIX}{}", hex::encode(digest))
    } else {
        format!("{API_CACHE_PREFIX}{}", String::from_utf8_lossy(&fingerprint))
    }
}

pub async fn response_cache(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();
    let body_bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("request body too large".to_string()))?;

    let key = cache_key(
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
        &body_bytes,
    );

    // A failed or garbled read is just a miss, and so is an entry
    // whose stored envelope is not a success.
    match state.kv.get(&key).await {
        Ok(Some(raw)) => match bincode::deserialize::<CachedResponse>(&raw) {
            Ok(cached) if is_success_body(&cached.body) => return Ok(rebuild(cached)),
            Ok(_) => tracing::warn!(%key, "skipping non-success cache entry"),
            Err(_) => tracing::warn!(%key, "discarding undecodable cache entry"),
        },
        Ok(None) => {}
        Err(err) => tracing::warn!(%key, error = %err, "cache read failed"),
    }

    let req = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(req).await;

    let (resp_parts, resp_body) = response.into_parts();
    let resp_bytes = to_bytes(resp_body, usize::MAX)
        .await
        .map_err(|err| AppError::Internal(anyhow::anyhow!("response body: {err}")))?;

    if resp_parts.status.is_success() && is_success_body(&resp_bytes) {
        let cached = CachedResponse {
            status: resp_parts.status.as_u16(),
            headers: resp_parts
                .headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.as_bytes().to_vec()))
                .collect(),
            body: resp_bytes.to_vec(),
        };
        match bincode::serialize(&cached) {
            Ok(encoded) => {
                let ttl = state.config.api_cache_ttl_seconds;
                if let Err(err) = state.kv.set_nx_ex(&key, encoded, ttl).await {
                    tracing::warn!(%key, error = %err, "cache write failed");
                }
            }
            Err(err) => tracing::warn!(%key, error = %err, "cache encode failed"),
        }
    }

    Ok(Response::from_parts(resp_parts, Body::from(resp_bytes)))
}

fn rebuild(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    *response.status_mut() = axum::http::StatusCode::from_u16(cached.status)
        .unwrap_or(axum::http::StatusCode::OK);
    for (name, value) in cached.headers {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_bytes(&value),
        ) {
            // Append, not insert: header names may repeat.
            response.headers_mut().append(name, value);
        }
    }
    response
}
