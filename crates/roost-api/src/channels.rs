use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use roost_store::Error;
use roost_types::api::{
    AddOwnerRequest, ChannelDetailsResponse, ChannelIdResponse, ChannelListResponse,
    ChannelSummary, CreateChannelRequest, InviteRequest, MessagesPage, MessagesQuery,
};
use roost_types::models::{Channel, Notification, PERM_OWNER, Standup};

use crate::error::ApiResult;
use crate::messages::page_of;
use crate::middleware::AuthUser;
use crate::users::profile_of;
use crate::{AppState, now};

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateChannelRequest>,
) -> ApiResult<impl IntoResponse> {
    let len = req.name.chars().count();
    if len < 1 || len > 20 {
        return Err(Error::invalid("channel name must be 1 to 20 characters").into());
    }

    let channel_id = state.store.with_data_mut(|data| {
        let channel_id = data.next_channel_id();
        data.channels.push(Channel {
            channel_id,
            name: req.name.clone(),
            is_public: req.is_public,
            owners: vec![auth.user_id],
            members: vec![auth.user_id],
            messages: Vec::new(),
            standup: Standup::default(),
        });
        data.record_channel_join_delta(auth.user_id, 1, now());
        Ok(channel_id)
    })?;

    Ok((StatusCode::CREATED, Json(ChannelIdResponse { channel_id })))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let channels = state.store.with_data(|data| {
        Ok(data
            .channels
            .iter()
            .filter(|c| c.members.contains(&auth.user_id))
            .map(|c| ChannelSummary { channel_id: c.channel_id, name: c.name.clone() })
            .collect::<Vec<_>>())
    })?;
    Ok(Json(ChannelListResponse { channels }))
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let channels = state.store.with_data(|data| {
        Ok(data
            .channels
            .iter()
            .map(|c| ChannelSummary { channel_id: c.channel_id, name: c.name.clone() })
            .collect::<Vec<_>>())
    })?;
    Ok(Json(ChannelListResponse { channels }))
}

pub async fn details(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let details = state.store.with_data(|data| {
        let channel = data.channel(channel_id)?;
        if !channel.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the channel"));
        }
        let profiles = |ids: &[u64]| {
            ids.iter()
                .filter_map(|id| data.user(*id).ok())
                .map(profile_of)
                .collect::<Vec<_>>()
        };
        Ok(ChannelDetailsResponse {
            name: channel.name.clone(),
            is_public: channel.is_public,
            owner_members: profiles(&channel.owners),
            all_members: profiles(&channel.members),
        })
    })?;
    Ok(Json(details))
}

pub async fn join(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let perm = data.user(auth.user_id)?.perm;
        let channel = data.channel(channel_id)?;
        if channel.members.contains(&auth.user_id) {
            return Err(Error::conflict("already a member of the channel"));
        }
        if !channel.is_public && perm != PERM_OWNER {
            return Err(Error::forbidden("channel is private, invite required"));
        }
        data.channel_mut(channel_id)?.members.push(auth.user_id);
        data.record_channel_join_delta(auth.user_id, 1, now());
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn invite(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let channel = data.channel(channel_id)?;
        data.user(req.user_id)?;
        if !channel.members.contains(&auth.user_id) {
            return Err(Error::forbidden("inviter is not a member of the channel"));
        }
        if channel.members.contains(&req.user_id) {
            return Err(Error::conflict("invitee is already a member of the channel"));
        }

        let channel_name = channel.name.clone();
        let inviter_handle = data.handle_of(auth.user_id)?;
        data.channel_mut(channel_id)?.members.push(req.user_id);
        data.notify(
            req.user_id,
            Notification {
                channel_id: Some(channel_id),
                dm_id: None,
                text: format!("{inviter_handle} added you to {channel_name}"),
            },
        );
        data.record_channel_join_delta(req.user_id, 1, now());
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn leave(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let channel = data.channel(channel_id)?;
        if !channel.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the channel"));
        }
        // The initiator of a running standup is the one its flush will be
        // attributed to; they stay until it fires.
        if channel.standup.active && channel.standup.initiator == Some(auth.user_id) {
            return Err(Error::conflict("cannot leave while your standup is running"));
        }

        let channel = data.channel_mut(channel_id)?;
        channel.members.retain(|id| *id != auth.user_id);
        channel.owners.retain(|id| *id != auth.user_id);
        data.record_channel_join_delta(auth.user_id, -1, now());
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn add_owner(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<AddOwnerRequest>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let channel = data.channel(channel_id)?;
        data.user(req.user_id)?;
        if !channel.members.contains(&req.user_id) {
            return Err(Error::invalid("user is not a member of the channel"));
        }
        if channel.owners.contains(&req.user_id) {
            return Err(Error::conflict("user is already an owner of the channel"));
        }
        let actor_is_global = data.user(auth.user_id)?.perm == PERM_OWNER;
        if !channel.owners.contains(&auth.user_id) && !actor_is_global {
            return Err(Error::forbidden("caller does not have owner permissions"));
        }

        data.channel_mut(channel_id)?.owners.push(req.user_id);
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn remove_owner(
    State(state): State<AppState>,
    Path((channel_id, user_id)): Path<(u64, u64)>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let channel = data.channel(channel_id)?;
        data.user(user_id)?;
        if !channel.members.contains(&user_id) {
            return Err(Error::invalid("user is not a member of the channel"));
        }
        if !channel.owners.contains(&user_id) {
            return Err(Error::invalid("user is not an owner of the channel"));
        }
        if channel.owners.len() == 1 {
            return Err(Error::invalid("user is the only owner of the channel"));
        }
        let actor_is_global = data.user(auth.user_id)?.perm == PERM_OWNER;
        let actor_has_owner_perms = channel.owners.contains(&auth.user_id)
            || (actor_is_global && channel.members.contains(&auth.user_id));
        if !actor_has_owner_perms {
            return Err(Error::forbidden("caller does not have owner permissions"));
        }

        data.channel_mut(channel_id)?.owners.retain(|id| *id != user_id);
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn messages(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Query(query): Query<MessagesQuery>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let page: MessagesPage = state.store.with_data(|data| {
        let channel = data.channel(channel_id)?;
        if !channel.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the channel"));
        }
        if channel.messages.is_empty() && query.start == 0 {
            return Ok(MessagesPage { messages: vec![], start: 0, end: -1 });
        }
        if query.start >= channel.messages.len() {
            return Err(Error::invalid("start is past the end of the history"));
        }
        Ok(page_of(&channel.messages, query.start, auth.user_id))
    })?;
    Ok(Json(page))
}
