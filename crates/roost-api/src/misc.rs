use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};

use roost_store::Error;
use roost_types::api::{NotificationsResponse, SearchQuery, SearchResponse};

use crate::AppState;
use crate::error::ApiResult;
use crate::messages::view_for;
use crate::middleware::AuthUser;

/// Case-insensitive substring search over every message in the workspace,
/// in container insertion order, channels before DMs.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let len = query.query.chars().count();
    if len == 0 || len > 1000 {
        return Err(Error::invalid("query must be 1 to 1000 characters").into());
    }
    let needle = query.query.to_lowercase();

    let messages = state.store.with_data(|data| {
        let channel_messages = data.channels.iter().flat_map(|c| c.messages.iter());
        let dm_messages = data.dms.iter().flat_map(|d| d.messages.iter());
        Ok(channel_messages
            .chain(dm_messages)
            .filter(|m| m.body.to_lowercase().contains(&needle))
            .map(|m| view_for(m, auth.user_id))
            .collect::<Vec<_>>())
    })?;

    Ok(Json(SearchResponse { messages }))
}

pub async fn notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let notifications = state.store.with_data(|data| {
        Ok(data
            .user(auth.user_id)?
            .notifications
            .iter()
            .take(20)
            .cloned()
            .collect::<Vec<_>>())
    })?;
    Ok(Json(NotificationsResponse { notifications }))
}

/// Wipe the workspace back to empty. Unauthenticated, like the rest of the
/// bootstrap surface.
pub async fn clear(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.store.clear()?;
    Ok(Json(serde_json::json!({})))
}
