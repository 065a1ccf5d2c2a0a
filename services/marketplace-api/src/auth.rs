//! Session authentication middleware
//!
//! Requests carry hex session tokens in the `session_id` header, one
//! or several separated by commas (a wallet app may hold sessions for
//! multiple addresses). A request with the header is authenticated
//! only if every token decrypts and its session record still exists;
//! requests without the header pass through unauthenticated and are
//! rejected later by handlers that need an identity.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::session;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "session_id";

/// Wallet addresses proven by the request's session tokens, in header
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub Vec<String>);

impl AuthUser {
    /// The primary address: the first token in the header.
    pub fn primary(&self) -> &str {
        &self.0[0]
    }
}

pub async fn session_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(raw) = header {
        let user = verify_tokens(&state, &raw).await?;
        req.extensions_mut().insert(user);
    }

    Ok(next.run(req).await)
}

/// Verifies every comma-separated token; one bad token fails the
/// whole header.
async fn verify_tokens(state: &AppState, raw: &str) -> Result<AuthUser, AppError> {
    let secret = state.config.session_secret.as_bytes();
    let mut addresses = Vec::new();

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let plaintext =
            session::decrypt_token(token, secret).map_err(|_| AppError::TokenVerify)?;
        let address = session::extract_address(&plaintext).ok_or(AppError::TokenVerify)?;

        let live = state
            .kv
            .get(&plaintext)
            .await
            .map_err(AppError::Internal)?
            .is_some();
        if !live {
            return Err(AppError::TokenExpired);
        }
        addresses.push(address.to_string());
    }

    if addresses.is_empty() {
        return Err(AppError::TokenVerify);
    }
    Ok(AuthUser(addresses))
}
