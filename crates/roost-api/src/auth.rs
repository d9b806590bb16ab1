use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use tracing::info;
use uuid::Uuid;

use roost_store::data::Data;
use roost_store::{Error, Result};
use roost_types::api::{AuthResponse, LoginRequest, RegisterRequest, ResetBody, ResetRequestBody};
use roost_types::models::{PERM_MEMBER, PERM_OWNER, ResetCode, Session, User, UserStats};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AuthUser, hash_token};
use crate::{AppState, now};

/// Minimal shape check; deliverability is not our problem.
pub(crate) fn email_is_valid(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Lowercase alphanumeric concatenation of the names, truncated to 20
/// characters, with a numeric suffix on collision.
fn generate_handle(data: &Data, name_first: &str, name_last: &str) -> String {
    let base: String = format!("{name_first}{name_last}")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(20)
        .collect();

    let taken = |h: &str| data.users.iter().any(|u| u.handle == h);
    if !taken(&base) {
        return base;
    }
    // The suffix may push the handle past 20 characters; that matches how
    // registration has always behaved.
    let mut n = 0u64;
    loop {
        let candidate = format!("{base}{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("password hashing failed: {e}")))?
        .to_string())
}

/// Mint a session token, recording only its digest. The raw token goes back
/// to the client.
fn open_session(data: &mut Data, user_id: u64) -> String {
    let token = Uuid::new_v4().to_string();
    data.sessions.push(Session { user_id, token_hash: hash_token(&token) });
    token
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if !email_is_valid(&req.email) {
        return Err(Error::invalid("email is not valid").into());
    }
    if req.password.chars().count() < 6 {
        return Err(Error::invalid("password must be at least 6 characters").into());
    }
    for (field, name) in [(&req.name_first, "first name"), (&req.name_last, "last name")] {
        let len = field.chars().count();
        if len < 1 || len > 50 {
            return Err(Error::invalid(format!("{name} must be 1 to 50 characters")).into());
        }
    }

    let password_hash = hash_password(&req.password)?;
    let at = now();

    let response = state.store.with_data_mut(|data| {
        if data.user_by_email(&req.email).is_some() {
            return Err(Error::conflict("email already in use"));
        }

        let user_id = data.next_user_id();
        let handle = generate_handle(data, &req.name_first, &req.name_last);
        // First registered user is the global owner.
        let perm = if user_id == 0 { PERM_OWNER } else { PERM_MEMBER };

        data.users.push(User {
            user_id,
            email: req.email.clone(),
            password_hash: password_hash.clone(),
            name_first: req.name_first.clone(),
            name_last: req.name_last.clone(),
            handle,
            perm,
            notifications: Vec::new(),
        });
        data.user_stats.push(UserStats::seeded(user_id, at));

        let token = open_session(data, user_id);
        Ok(AuthResponse { token, user_id })
    })?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state.store.with_data_mut(|data| {
        let user = data
            .user_by_email(&req.email)
            .ok_or_else(|| Error::unauthorized("unknown email or wrong password"))?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| Error::Internal(format!("corrupt password hash: {e}")))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed)
            .map_err(|_| Error::unauthorized("unknown email or wrong password"))?;

        let user_id = user.user_id;
        let token = open_session(data, user_id);
        Ok(AuthResponse { token, user_id })
    })?;

    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let token_hash = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(hash_token)
        .ok_or_else(|| ApiError(Error::unauthorized("missing authorization header")))?;

    state.store.with_data_mut(|data| {
        data.sessions.retain(|s| s.token_hash != token_hash);
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

/// Always succeeds from the caller's perspective, so the endpoint cannot be
/// used to probe which emails are registered. All of the user's sessions are
/// revoked. The code is only logged: real email delivery is out of scope.
pub async fn reset_request(
    State(state): State<AppState>,
    Json(req): Json<ResetRequestBody>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let Some(user) = data.user_by_email(&req.email) else {
            return Ok(());
        };
        let user_id = user.user_id;

        data.sessions.retain(|s| s.user_id != user_id);
        let code = Uuid::new_v4().to_string();
        info!(email = %req.email, %code, "password reset code issued");
        data.reset_codes.push(ResetCode { code, email: req.email.clone() });
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn reset(
    State(state): State<AppState>,
    Json(req): Json<ResetBody>,
) -> ApiResult<impl IntoResponse> {
    if req.new_password.chars().count() < 6 {
        return Err(Error::invalid("password must be at least 6 characters").into());
    }
    let password_hash = hash_password(&req.new_password)?;

    state.store.with_data_mut(|data| {
        let idx = data
            .reset_codes
            .iter()
            .position(|r| r.code == req.code)
            .ok_or_else(|| Error::invalid("unknown reset code"))?;
        let email = data.reset_codes.remove(idx).email;

        if let Some(user) = data.users.iter_mut().find(|u| u.email == email) {
            user.password_hash = password_hash.clone();
        }
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(email_is_valid("ada@lovelace.dev"));
        assert!(!email_is_valid("adalovelace.dev"));
        assert!(!email_is_valid("@lovelace.dev"));
        assert!(!email_is_valid("ada@"));
        assert!(!email_is_valid("ada@localhost"));
    }

    #[test]
    fn handles_collide_with_numeric_suffix() {
        let mut data = Data::default();
        assert_eq!(generate_handle(&data, "Ada", "Lovelace"), "adalovelace");

        data.users.push(User {
            user_id: 0,
            email: "a@b.co".into(),
            password_hash: String::new(),
            name_first: "Ada".into(),
            name_last: "Lovelace".into(),
            handle: "adalovelace".into(),
            perm: PERM_OWNER,
            notifications: vec![],
        });
        assert_eq!(generate_handle(&data, "Ada", "Lovelace!"), "adalovelace0");
    }

    #[test]
    fn handle_is_truncated_to_twenty() {
        let data = Data::default();
        let handle = generate_handle(&data, "Bartholomew", "Featherstonehaugh");
        assert_eq!(handle.chars().count(), 20);
    }
}
