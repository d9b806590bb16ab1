use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};

use roost_store::Error;
use roost_types::api::{
    ProfileResponse, SetEmailRequest, SetHandleRequest, SetNameRequest, UserProfile,
    UserStatsResponse, UsersResponse, WorkspaceStatsResponse,
};
use roost_types::models::User;

use crate::auth::email_is_valid;
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::{AppState, now};

pub(crate) fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        user_id: user.user_id,
        email: user.email.clone(),
        name_first: user.name_first.clone(),
        name_last: user.name_last.clone(),
        handle: user.handle.clone(),
    }
}

pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state.store.with_data(|data| Ok(profile_of(data.user(user_id)?)))?;
    Ok(Json(ProfileResponse { user }))
}

/// Every registered account, removed users included.
pub async fn list_all(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let users = state
        .store
        .with_data(|data| Ok(data.users.iter().map(profile_of).collect::<Vec<_>>()))?;
    Ok(Json(UsersResponse { users }))
}

pub async fn set_name(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetNameRequest>,
) -> ApiResult<impl IntoResponse> {
    for (field, name) in [(&req.name_first, "first name"), (&req.name_last, "last name")] {
        let len = field.chars().count();
        if len < 1 || len > 50 {
            return Err(Error::invalid(format!("{name} must be 1 to 50 characters")).into());
        }
    }

    state.store.with_data_mut(|data| {
        let user = data.user_mut(auth.user_id)?;
        user.name_first = req.name_first.clone();
        user.name_last = req.name_last.clone();
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn set_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetEmailRequest>,
) -> ApiResult<impl IntoResponse> {
    if !email_is_valid(&req.email) {
        return Err(Error::invalid("email is not valid").into());
    }

    state.store.with_data_mut(|data| {
        if data.user_by_email(&req.email).is_some() {
            return Err(Error::conflict("email already in use"));
        }
        data.user_mut(auth.user_id)?.email = req.email.clone();
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn set_handle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetHandleRequest>,
) -> ApiResult<impl IntoResponse> {
    let len = req.handle.chars().count();
    if len < 3 || len > 20 {
        return Err(Error::invalid("handle must be 3 to 20 characters").into());
    }
    if !req.handle.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::invalid("handle must be alphanumeric").into());
    }

    state.store.with_data_mut(|data| {
        if data.users.iter().any(|u| u.handle == req.handle) {
            return Err(Error::conflict("handle already in use"));
        }
        data.user_mut(auth.user_id)?.handle = req.handle.clone();
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn user_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let user_stats = state.store.with_data_mut(|data| data.user_stats_view(auth.user_id))?;
    Ok(Json(UserStatsResponse { user_stats }))
}

/// Read endpoint that grows the stored series on every call; see the ledger
/// docs in roost-store.
pub async fn workspace_stats(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let workspace_stats = state.store.with_data_mut(|data| Ok(data.workspace_stats_view(now())))?;
    Ok(Json(WorkspaceStatsResponse { workspace_stats }))
}
