use serde::{Deserialize, Serialize};

use crate::models::{Notification, StatSample};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name_first: String,
    pub name_last: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetRequestBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetBody {
    pub code: String,
    pub new_password: String,
}

// -- Users --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: u64,
    pub email: String,
    pub name_first: String,
    pub name_last: String,
    pub handle: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetNameRequest {
    pub name_first: String,
    pub name_last: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetEmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetHandleRequest {
    pub handle: String,
}

// -- Statistics --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatsView {
    pub channels_joined: Vec<StatSample>,
    pub dms_joined: Vec<StatSample>,
    pub messages_sent: Vec<StatSample>,
    pub involvement_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStatsResponse {
    pub user_stats: UserStatsView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceStatsView {
    pub channels_exist: Vec<StatSample>,
    pub dms_exist: Vec<StatSample>,
    pub messages_exist: Vec<StatSample>,
    pub utilization_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkspaceStatsResponse {
    pub workspace_stats: WorkspaceStatsView,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub name: String,
    pub is_public: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelIdResponse {
    pub channel_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel_id: u64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelListResponse {
    pub channels: Vec<ChannelSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelDetailsResponse {
    pub name: String,
    pub is_public: bool,
    pub owner_members: Vec<UserProfile>,
    pub all_members: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InviteRequest {
    pub user_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddOwnerRequest {
    pub user_id: u64,
}

// -- DMs --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDmRequest {
    pub user_ids: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmIdResponse {
    pub dm_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmSummary {
    pub dm_id: u64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmListResponse {
    pub dms: Vec<DmSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmDetailsResponse {
    pub name: String,
    pub members: Vec<UserProfile>,
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionView {
    pub reaction_kind: u64,
    pub user_ids: Vec<u64>,
    pub current_user_reacted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub message_id: u64,
    pub sender_id: u64,
    pub body: String,
    pub sent_at: i64,
    pub reactions: Vec<ReactionView>,
    pub pinned: bool,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default)]
    pub start: usize,
}

/// One page of history, newest first. `end` is `start + 50`, or -1 when the
/// page reaches the oldest message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesPage {
    pub messages: Vec<MessageView>,
    pub start: usize,
    pub end: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

/// `message_id` is absent when an active standup buffered the send instead
/// of delivering it.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendLaterRequest {
    pub body: String,
    pub send_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageIdResponse {
    pub message_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactRequest {
    pub reaction_kind: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareRequest {
    pub channel_id: Option<u64>,
    pub dm_id: Option<u64>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShareResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_message_id: Option<u64>,
}

// -- Standups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StandupStartRequest {
    pub length_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StandupStartResponse {
    pub finish_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StandupStatusResponse {
    pub active: bool,
    pub finish_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StandupSendRequest {
    pub body: String,
}

// -- Misc --

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionChangeRequest {
    pub user_id: u64,
    pub perm: u8,
}
