use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use roost_store::Error;
use roost_types::api::{
    CreateDmRequest, DmDetailsResponse, DmIdResponse, DmListResponse, DmSummary, MessagesPage,
    MessagesQuery,
};
use roost_types::models::{Dm, Notification};

use crate::error::ApiResult;
use crate::messages::page_of;
use crate::middleware::AuthUser;
use crate::users::profile_of;
use crate::{AppState, now};

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateDmRequest>,
) -> ApiResult<impl IntoResponse> {
    let dm_id = state.store.with_data_mut(|data| {
        // The creator is a member implicitly and must not appear in the list.
        let mut deduped = req.user_ids.clone();
        deduped.push(auth.user_id);
        deduped.sort_unstable();
        deduped.dedup();
        if deduped.len() != req.user_ids.len() + 1 {
            return Err(Error::invalid("duplicate user ids"));
        }
        for user_id in &req.user_ids {
            data.user(*user_id)?;
        }

        // DM name is the alphabetically sorted, comma-and-space separated
        // list of member handles, creator included.
        let mut handles = vec![data.handle_of(auth.user_id)?];
        for user_id in &req.user_ids {
            handles.push(data.handle_of(*user_id)?);
        }
        handles.sort();
        let name = handles.join(", ");

        let dm_id = data.next_dm_id();
        let creator_handle = data.handle_of(auth.user_id)?;
        for user_id in &req.user_ids {
            data.notify(
                *user_id,
                Notification {
                    channel_id: None,
                    dm_id: Some(dm_id),
                    text: format!("{creator_handle} added you to {name}"),
                },
            );
        }

        let mut members = vec![auth.user_id];
        members.extend(req.user_ids.iter().copied());
        let at = now();
        for user_id in &members {
            data.record_dm_join_delta(*user_id, 1, at);
        }

        data.dms.push(Dm {
            dm_id,
            name,
            owners: vec![auth.user_id],
            members,
            messages: Vec::new(),
        });
        Ok(dm_id)
    })?;

    Ok((StatusCode::CREATED, Json(DmIdResponse { dm_id })))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let dms = state.store.with_data(|data| {
        Ok(data
            .dms
            .iter()
            .filter(|d| d.members.contains(&auth.user_id))
            .map(|d| DmSummary { dm_id: d.dm_id, name: d.name.clone() })
            .collect::<Vec<_>>())
    })?;
    Ok(Json(DmListResponse { dms }))
}

pub async fn details(
    State(state): State<AppState>,
    Path(dm_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let details = state.store.with_data(|data| {
        let dm = data.dm(dm_id)?;
        if !dm.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the dm"));
        }
        Ok(DmDetailsResponse {
            name: dm.name.clone(),
            members: dm
                .members
                .iter()
                .filter_map(|id| data.user(*id).ok())
                .map(profile_of)
                .collect(),
        })
    })?;
    Ok(Json(details))
}

/// Only the creator can tear a DM down, and only while still a member.
/// Every member's dms-joined counter steps back down.
pub async fn remove(
    State(state): State<AppState>,
    Path(dm_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let dm = data.dm(dm_id)?;
        if !dm.members.contains(&auth.user_id) {
            return Err(Error::forbidden("no longer a member of the dm"));
        }
        if !dm.owners.contains(&auth.user_id) {
            return Err(Error::forbidden("not the creator of the dm"));
        }

        let members = dm.members.clone();
        data.dms.retain(|d| d.dm_id != dm_id);
        let at = now();
        for user_id in members {
            data.record_dm_join_delta(user_id, -1, at);
        }
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn leave(
    State(state): State<AppState>,
    Path(dm_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let dm = data.dm_mut(dm_id)?;
        if !dm.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the dm"));
        }
        dm.members.retain(|id| *id != auth.user_id);
        dm.owners.retain(|id| *id != auth.user_id);
        data.record_dm_join_delta(auth.user_id, -1, now());
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn messages(
    State(state): State<AppState>,
    Path(dm_id): Path<u64>,
    Query(query): Query<MessagesQuery>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let page: MessagesPage = state.store.with_data(|data| {
        let dm = data.dm(dm_id)?;
        if !dm.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the dm"));
        }
        if query.start > dm.messages.len() {
            return Err(Error::invalid("start is past the end of the history"));
        }
        Ok(page_of(&dm.messages, query.start, auth.user_id))
    })?;
    Ok(Json(page))
}
