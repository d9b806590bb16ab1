use std::sync::LazyLock;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use regex::Regex;

use roost_store::data::Locator;
use roost_store::{Data, Error};
use roost_types::api::{
    EditMessageRequest, MessageIdResponse, MessageView, MessagesPage, ReactRequest, ReactionView,
    SendLaterRequest, SendMessageRequest, SendMessageResponse, ShareRequest, ShareResponse,
};
use roost_types::models::{Message, Notification, PERM_OWNER, REACTION_LIKE, Reaction};

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::{AppState, now};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[a-z0-9]+").expect("tag pattern"));

const MAX_BODY: usize = 1000;
const PAGE_SIZE: usize = 50;

#[derive(Debug)]
pub(crate) enum SendOutcome {
    Sent(u64),
    Buffered,
}

pub(crate) fn view_for(message: &Message, viewer: u64) -> MessageView {
    MessageView {
        message_id: message.message_id,
        sender_id: message.sender_id,
        body: message.body.clone(),
        sent_at: message.sent_at,
        reactions: message
            .reactions
            .iter()
            .map(|r| ReactionView {
                reaction_kind: r.reaction_kind,
                user_ids: r.user_ids.clone(),
                current_user_reacted: r.user_ids.contains(&viewer),
            })
            .collect(),
        pinned: message.pinned,
    }
}

/// Slice one page of history, newest message first.
pub(crate) fn page_of(messages: &[Message], start: usize, viewer: u64) -> MessagesPage {
    let page: Vec<MessageView> = messages
        .iter()
        .rev()
        .skip(start)
        .take(PAGE_SIZE)
        .map(|m| view_for(m, viewer))
        .collect();
    let end = if start + PAGE_SIZE < messages.len() {
        (start + PAGE_SIZE) as i64
    } else {
        -1
    };
    MessagesPage { messages: page, start, end }
}

/// Notify every member whose handle is `@`-tagged in the body. Handles that
/// match nobody in the container are ignored, and each member is notified at
/// most once per message.
fn notify_tagged(
    data: &mut Data,
    sender: u64,
    members: &[u64],
    channel_id: Option<u64>,
    dm_id: Option<u64>,
    name: &str,
    body: &str,
) -> Result<(), Error> {
    let sender_handle = data.handle_of(sender)?;
    let snippet: String = body.chars().take(20).collect();
    let mut seen: Vec<String> = Vec::new();
    let tags: Vec<String> = TAG_RE
        .find_iter(body)
        .map(|m| m.as_str()[1..].to_string())
        .collect();
    for tag in tags {
        if seen.contains(&tag) {
            continue;
        }
        let target = members
            .iter()
            .copied()
            .find(|id| data.handle_of(*id).is_ok_and(|h| h == tag));
        if let Some(target) = target {
            data.notify(
                target,
                Notification {
                    channel_id,
                    dm_id,
                    text: format!("{sender_handle} tagged you in {name}: {snippet}"),
                },
            );
        }
        seen.push(tag);
    }
    Ok(())
}

/// Deliver a message into a channel, or hand it to the channel's standup
/// buffer when one is running. Tag notifications and the sender's stats fire
/// only on real delivery.
pub(crate) fn channel_send(
    data: &mut Data,
    channel_id: u64,
    sender: u64,
    body: &str,
    sent_at: i64,
) -> Result<SendOutcome, Error> {
    let channel = data.channel(channel_id)?;
    if !channel.members.contains(&sender) {
        return Err(Error::forbidden("not a member of the channel"));
    }

    if channel.standup.active {
        if body.chars().count() > MAX_BODY {
            return Err(Error::invalid("message is over 1000 characters"));
        }
        let handle = data.handle_of(sender)?;
        data.buffer_standup_line(channel_id, handle, body.to_string());
        return Ok(SendOutcome::Buffered);
    }

    let len = body.chars().count();
    if len == 0 || len > MAX_BODY {
        return Err(Error::invalid("message must be 1 to 1000 characters"));
    }

    let name = channel.name.clone();
    let members = channel.members.clone();
    let message_id = data.next_message_id();
    data.channel_mut(channel_id)?.messages.push(Message {
        message_id,
        sender_id: sender,
        body: body.to_string(),
        sent_at,
        reactions: vec![Reaction::like()],
        pinned: false,
    });
    notify_tagged(data, sender, &members, Some(channel_id), None, &name, body)?;
    data.record_message_sent_delta(sender, 1, sent_at);
    Ok(SendOutcome::Sent(message_id))
}

pub(crate) fn dm_send(
    data: &mut Data,
    dm_id: u64,
    sender: u64,
    body: &str,
    sent_at: i64,
) -> Result<u64, Error> {
    let dm = data.dm(dm_id)?;
    if !dm.members.contains(&sender) {
        return Err(Error::forbidden("not a member of the dm"));
    }
    let len = body.chars().count();
    if len == 0 || len > MAX_BODY {
        return Err(Error::invalid("message must be 1 to 1000 characters"));
    }

    let name = dm.name.clone();
    let members = dm.members.clone();
    let message_id = data.next_message_id();
    data.dm_mut(dm_id)?.messages.push(Message {
        message_id,
        sender_id: sender,
        body: body.to_string(),
        sent_at,
        reactions: vec![Reaction::like()],
        pinned: false,
    });
    notify_tagged(data, sender, &members, None, Some(dm_id), &name, body)?;
    data.record_message_sent_delta(sender, 1, sent_at);
    Ok(message_id)
}

fn is_member(data: &Data, loc: Locator, user_id: u64) -> bool {
    match loc {
        Locator::Channel(i) => data.channels[i].members.contains(&user_id),
        Locator::Dm(i) => data.dms[i].members.contains(&user_id),
    }
}

/// Owner permissions over a message's container: a channel owner, a global
/// owner who is a channel member, or the DM's creator.
fn may_moderate(data: &Data, loc: Locator, user_id: u64) -> bool {
    match loc {
        Locator::Channel(i) => {
            let channel = &data.channels[i];
            channel.owners.contains(&user_id)
                || (channel.members.contains(&user_id)
                    && data.user(user_id).map(|u| u.perm == PERM_OWNER).unwrap_or(false))
        }
        Locator::Dm(i) => data.dms[i].owners.contains(&user_id),
    }
}

fn container_of(data: &Data, loc: Locator) -> (Option<u64>, Option<u64>, String) {
    match loc {
        Locator::Channel(i) => {
            (Some(data.channels[i].channel_id), None, data.channels[i].name.clone())
        }
        Locator::Dm(i) => (None, Some(data.dms[i].dm_id), data.dms[i].name.clone()),
    }
}

fn drop_message(data: &mut Data, loc: Locator, message_id: u64) {
    match loc {
        Locator::Channel(i) => data.channels[i].messages.retain(|m| m.message_id != message_id),
        Locator::Dm(i) => data.dms[i].messages.retain(|m| m.message_id != message_id),
    }
}

pub async fn send_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .store
        .with_data_mut(|data| channel_send(data, channel_id, auth.user_id, &req.body, now()))?;
    let message_id = match outcome {
        SendOutcome::Sent(id) => Some(id),
        SendOutcome::Buffered => None,
    };
    Ok(Json(SendMessageResponse { message_id }))
}

pub async fn send_dm(
    State(state): State<AppState>,
    Path(dm_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message_id = state
        .store
        .with_data_mut(|data| dm_send(data, dm_id, auth.user_id, &req.body, now()))?;
    Ok(Json(SendMessageResponse { message_id: Some(message_id) }))
}

/// Schedule a channel message. The returned id is the one the send would get
/// if nothing else were minted in the meantime; a send that lands first takes
/// it and the delivery gets a fresh one.
pub async fn send_channel_later(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendLaterRequest>,
) -> ApiResult<impl IntoResponse> {
    let at = now();
    let predicted = state.store.with_data(|data| {
        let channel = data.channel(channel_id)?;
        if !channel.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the channel"));
        }
        let len = req.body.chars().count();
        if len == 0 || len > MAX_BODY {
            return Err(Error::invalid("message must be 1 to 1000 characters"));
        }
        if req.send_at < at {
            return Err(Error::invalid("send time is in the past"));
        }
        Ok(data.next_message_id())
    })?;

    let delay = (req.send_at - at).max(0) as u64;
    let task_state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(delay)).await;
        let sent = task_state.store.with_data_mut(|data| {
            channel_send(data, channel_id, auth.user_id, &req.body, req.send_at)
        });
        if let Err(err) = sent {
            tracing::debug!(channel_id, %err, "scheduled channel message dropped");
        }
    });

    Ok(Json(MessageIdResponse { message_id: predicted }))
}

pub async fn send_dm_later(
    State(state): State<AppState>,
    Path(dm_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendLaterRequest>,
) -> ApiResult<impl IntoResponse> {
    let at = now();
    let predicted = state.store.with_data(|data| {
        let dm = data.dm(dm_id)?;
        if !dm.members.contains(&auth.user_id) {
            return Err(Error::forbidden("not a member of the dm"));
        }
        let len = req.body.chars().count();
        if len == 0 || len > MAX_BODY {
            return Err(Error::invalid("message must be 1 to 1000 characters"));
        }
        if req.send_at < at {
            return Err(Error::invalid("send time is in the past"));
        }
        Ok(data.next_message_id())
    })?;

    let delay = (req.send_at - at).max(0) as u64;
    let task_state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(delay)).await;
        let sent = task_state
            .store
            .with_data_mut(|data| dm_send(data, dm_id, auth.user_id, &req.body, req.send_at));
        if let Err(err) = sent {
            tracing::debug!(dm_id, %err, "scheduled dm message dropped");
        }
    });

    Ok(Json(MessageIdResponse { message_id: predicted }))
}

/// Rewrite a message. An empty body deletes it instead. Tag notifications
/// fire again for the new body.
pub async fn edit(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<EditMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        if req.body.chars().count() > MAX_BODY {
            return Err(Error::invalid("message is over 1000 characters"));
        }
        let loc = data
            .locate_message(message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        let message = data
            .message_in(loc, message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        let sender = message.sender_id;
        if sender != auth.user_id && !may_moderate(data, loc, auth.user_id) {
            return Err(Error::forbidden("cannot edit someone else's message"));
        }

        if req.body.is_empty() {
            drop_message(data, loc, message_id);
            return Ok(());
        }

        let (channel_id, dm_id, name) = container_of(data, loc);
        let members = match loc {
            Locator::Channel(i) => data.channels[i].members.clone(),
            Locator::Dm(i) => data.dms[i].members.clone(),
        };
        if let Some(message) = data.message_in_mut(loc, message_id) {
            message.body = req.body.clone();
        }
        notify_tagged(data, sender, &members, channel_id, dm_id, &name, &req.body)?;
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let loc = data
            .locate_message(message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        let message = data
            .message_in(loc, message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        if message.sender_id != auth.user_id && !may_moderate(data, loc, auth.user_id) {
            return Err(Error::forbidden("cannot remove someone else's message"));
        }
        drop_message(data, loc, message_id);
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn react(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ReactRequest>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        if req.reaction_kind != REACTION_LIKE {
            return Err(Error::invalid("unknown reaction kind"));
        }
        let loc = data
            .locate_message(message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        if !is_member(data, loc, auth.user_id) {
            return Err(Error::forbidden("not a member of the message's channel or dm"));
        }

        let (channel_id, dm_id, name) = container_of(data, loc);
        let sender = data
            .message_in(loc, message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?
            .sender_id;
        let reactor_handle = data.handle_of(auth.user_id)?;

        let message = data
            .message_in_mut(loc, message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        if message.reactions.iter().all(|r| r.reaction_kind != req.reaction_kind) {
            message.reactions.push(Reaction::like());
        }
        for group in &mut message.reactions {
            if group.reaction_kind != req.reaction_kind {
                continue;
            }
            if group.user_ids.contains(&auth.user_id) {
                return Err(Error::conflict("already reacted to this message"));
            }
            group.user_ids.push(auth.user_id);
        }

        // The author only hears about it while still in the conversation.
        if is_member(data, loc, sender) {
            data.notify(
                sender,
                Notification {
                    channel_id,
                    dm_id,
                    text: format!("{reactor_handle} reacted to your message in {name}"),
                },
            );
        }
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn unreact(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ReactRequest>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        if req.reaction_kind != REACTION_LIKE {
            return Err(Error::invalid("unknown reaction kind"));
        }
        let loc = data
            .locate_message(message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        if !is_member(data, loc, auth.user_id) {
            return Err(Error::forbidden("not a member of the message's channel or dm"));
        }
        let message = data
            .message_in_mut(loc, message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        let group = message
            .reactions
            .iter_mut()
            .find(|r| r.reaction_kind == req.reaction_kind);
        match group {
            Some(group) if group.user_ids.contains(&auth.user_id) => {
                group.user_ids.retain(|id| *id != auth.user_id);
                Ok(())
            }
            _ => Err(Error::conflict("have not reacted to this message")),
        }
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn pin(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let loc = data
            .locate_message(message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        if !is_member(data, loc, auth.user_id) {
            return Err(Error::forbidden("not a member of the message's channel or dm"));
        }
        let pinned = data
            .message_in(loc, message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?
            .pinned;
        if pinned {
            return Err(Error::conflict("message is already pinned"));
        }
        if !may_moderate(data, loc, auth.user_id) {
            return Err(Error::forbidden("need owner permissions to pin"));
        }
        if let Some(message) = data.message_in_mut(loc, message_id) {
            message.pinned = true;
        }
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

pub async fn unpin(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    state.store.with_data_mut(|data| {
        let loc = data
            .locate_message(message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        if !is_member(data, loc, auth.user_id) {
            return Err(Error::forbidden("not a member of the message's channel or dm"));
        }
        let pinned = data
            .message_in(loc, message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?
            .pinned;
        if !pinned {
            return Err(Error::conflict("message is not pinned"));
        }
        if !may_moderate(data, loc, auth.user_id) {
            return Err(Error::forbidden("need owner permissions to unpin"));
        }
        if let Some(message) = data.message_in_mut(loc, message_id) {
            message.pinned = false;
        }
        Ok(())
    })?;

    Ok(Json(serde_json::json!({})))
}

/// Forward a message into exactly one other channel or DM, optionally with a
/// comment appended. Delivery goes through the normal send path, so a running
/// standup in the target buffers the share.
pub async fn share(
    State(state): State<AppState>,
    Path(message_id): Path<u64>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<impl IntoResponse> {
    let shared_message_id = state.store.with_data_mut(|data| {
        if req.body.chars().count() > MAX_BODY {
            return Err(Error::invalid("comment is over 1000 characters"));
        }
        let loc = data
            .locate_message(message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?;
        if !is_member(data, loc, auth.user_id) {
            return Err(Error::forbidden("not a member of the message's channel or dm"));
        }
        let original = data
            .message_in(loc, message_id)
            .ok_or_else(|| Error::not_found("unknown message"))?
            .body
            .clone();
        let body = if req.body.is_empty() {
            original
        } else {
            format!("{original} {}", req.body)
        };

        match (req.channel_id, req.dm_id) {
            (Some(channel_id), None) => {
                match channel_send(data, channel_id, auth.user_id, &body, now())? {
                    SendOutcome::Sent(id) => Ok(Some(id)),
                    SendOutcome::Buffered => Ok(None),
                }
            }
            (None, Some(dm_id)) => Ok(Some(dm_send(data, dm_id, auth.user_id, &body, now())?)),
            _ => Err(Error::invalid("share needs exactly one target")),
        }
    })?;

    Ok(Json(ShareResponse { shared_message_id }))
}
