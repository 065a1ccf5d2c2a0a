//! Uniform response envelope
//!
//! Every endpoint answers `{code, msg, data}`. `code == 200` is the
//! application-level success the response cache keys on, independent
//! of the HTTP status line.

use serde::{Deserialize, Serialize};

/// Application-level success code.
pub const CODE_OK: i32 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: CODE_OK,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn err(code: i32, msg: String) -> Self {
        Self { code, msg, data: None }
    }
}

/// Minimal view of an envelope, used to sniff the application status
/// of an already-serialized response body.
#[derive(Debug, Deserialize)]
pub struct EnvelopeProbe {
    pub code: i32,
}

/// Whether a serialized response body is an application-level success.
pub fn is_success_body(body: &[u8]) -> bool {
    serde_json::from_slice::<EnvelopeProbe>(body)
        .map(|probe| probe.code == CODE_OK)
        .unwrap_or(false)
}
