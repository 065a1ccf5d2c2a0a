//! Wallet login flow
//!
//! Login is a two-step exchange: the client asks for a one-time
//! message bound to its address, signs it in the wallet, and presents
//! it back. On success a session record is written to the cache store
//! and its key, encrypted, becomes the bearer token. Signature
//! verification itself happens at the wallet gateway in front of this
//! service; here the presented message must match the stored one.

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::session;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct LoginMessage {
    pub address: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub address: String,
    pub token: String,
}

fn normalize_address(address: &str) -> Result<String, AppError> {
    let address = address.trim().to_lowercase();
    if address.is_empty() {
        return Err(AppError::BadRequest("address must not be empty".to_string()));
    }
    Ok(address)
}

/// Issues the message the wallet must sign. Re-requesting within the
/// message TTL returns the already-issued message so an impatient
/// client cannot invalidate its own pending login.
pub async fn login_message(state: &AppState, address: &str) -> Result<LoginMessage, AppError> {
    let address = normalize_address(address)?;
    let key = session::login_message_key(&address);

    if let Some(existing) = state.kv.get(&key).await.map_err(AppError::Internal)? {
        if let Ok(message) = String::from_utf8(existing) {
            return Ok(LoginMessage { address, message });
        }
    }

    let message = format!("Welcome to OpenMarket!\nNonce:{}", Uuid::new_v4());
    state
        .kv
        .set_ex(
            &key,
            message.clone().into_bytes(),
            session::LOGIN_MESSAGE_TTL_SECONDS,
        )
        .await
        .map_err(AppError::Internal)?;

    Ok(LoginMessage { address, message })
}

/// Completes the login: the presented message must be the one issued
/// for this address and still unexpired.
pub async fn login(
    state: &AppState,
    address: &str,
    message: &str,
) -> Result<LoginResult, AppError> {
    let address = normalize_address(address)?;
    let key = session::login_message_key(&address);

    let issued = state
        .kv
        .get(&key)
        .await
        .map_err(AppError::Internal)?
        .and_then(|raw| String::from_utf8(raw).ok())
        .ok_or(AppError::TokenExpired)?;
    if issued != message {
        return Err(AppError::TokenVerify);
    }

    let session_key = session::login_session_key(&address);
    state
        .kv
        .set_ex(
            &session_key,
            address.clone().into_bytes(),
            session::SESSION_TTL_SECONDS,
        )
        .await
        .map_err(AppError::Internal)?;

    let token = session::encrypt_token(&session_key, state.config.session_secret.as_bytes())
        .map_err(|err| AppError::Internal(anyhow::anyhow!("token encryption: {err}")))?;

    tracing::info!(%address, "session opened");
    Ok(LoginResult { address, token })
}
