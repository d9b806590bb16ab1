use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};

use roost_store::Error;

use crate::AppState;
use crate::error::ApiError;

/// The authenticated caller, inserted as a request extension by
/// `require_auth`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: u64,
}

/// Raw tokens never touch the store: sessions are matched by SHA-256 digest.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Extract the bearer token from the Authorization header and resolve it to
/// a user through the session table.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::unauthorized("missing authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::unauthorized("malformed authorization header"))?;

    let token_hash = hash_token(token);
    let user_id = state.store.with_data(|data| {
        data.session_user(&token_hash)
            .ok_or_else(|| Error::unauthorized("invalid session token"))
    })?;

    req.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(req).await)
}
