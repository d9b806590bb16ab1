use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};

use roost_store::Error;
use roost_types::api::{
    StandupSendRequest, StandupStartRequest, StandupStartResponse, StandupStatusResponse,
};

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::{AppState, now};

const MAX_BODY: usize = 1000;

/// Schedule the flush that closes a standup. The timer holds no lock; the
/// flush itself re-takes the store so it is atomic with id allocation. A
/// channel that disappeared in the meantime makes the flush a no-op.
pub(crate) fn arm_flush(state: AppState, channel_id: u64, delay_secs: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        let flushed = state
            .store
            .with_data_mut(|data| Ok(data.flush_standup(channel_id)));
        match flushed {
            Ok(Some(message_id)) => {
                tracing::debug!(channel_id, message_id, "standup flushed");
            }
            Ok(None) => {
                tracing::debug!(channel_id, "standup closed with nothing to flush");
            }
            Err(err) => tracing::error!(channel_id, %err, "standup flush failed"),
        }
    });
}

/// Re-arm flush timers after a restart. Standups whose window already passed
/// flush immediately.
pub fn rearm_standups(state: &AppState) {
    let pending = state
        .store
        .with_data(|data| {
            Ok(data
                .channels
                .iter()
                .filter(|c| c.standup.active)
                .map(|c| (c.channel_id, c.standup.finish_at.unwrap_or_default()))
                .collect::<Vec<_>>())
        })
        .unwrap_or_default();
    let at = now();
    for (channel_id, finish_at) in pending {
        arm_flush(state.clone(), channel_id, (finish_at - at).max(0) as u64);
    }
}

pub async fn start(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<StandupStartRequest>,
) -> ApiResult<impl IntoResponse> {
    let finish_at = state.store.with_data_mut(|data| {
        let channel = data.channel(channel_id)?;
        if req.length_secs < 0 {
            return Err(Error::invalid("standup length cannot be negative"));
        }
        if channel.standup.active {
            return Err(Error::conflict("a standup is already running in this channel"));
        }
        if !channel.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the channel"));
        }
        let finish_at = now() + req.length_secs;
        data.begin_standup(channel_id, auth.user_id, finish_at);
        Ok(finish_at)
    })?;

    arm_flush(state.clone(), channel_id, req.length_secs.max(0) as u64);
    Ok(Json(StandupStartResponse { finish_at }))
}

pub async fn active(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let status = state.store.with_data(|data| {
        let channel = data.channel(channel_id)?;
        if !channel.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the channel"));
        }
        Ok(StandupStatusResponse {
            active: channel.standup.active,
            finish_at: channel.standup.finish_at,
        })
    })?;
    Ok(Json(status))
}

pub async fn send(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<StandupSendRequest>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let channel = data.channel(channel_id)?;
        if req.body.chars().count() > MAX_BODY {
            return Err(Error::invalid("message is over 1000 characters"));
        }
        if !channel.standup.active {
            return Err(Error::conflict("no standup is running in this channel"));
        }
        if !channel.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the channel"));
        }
        let handle = data.handle_of(auth.user_id)?;
        data.buffer_standup_line(channel_id, handle, req.body);
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}
