use serde::{Deserialize, Serialize};

/// Global owner permission level. The first registered user gets it.
pub const PERM_OWNER: u8 = 1;
/// Ordinary member permission level.
pub const PERM_MEMBER: u8 = 2;

/// The only reaction kind the workspace currently supports.
pub const REACTION_LIKE: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub email: String,
    pub password_hash: String,
    pub name_first: String,
    pub name_last: String,
    pub handle: String,
    pub perm: u8,
    /// Newest first, capped at 20 entries on read.
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub channel_id: Option<u64>,
    pub dm_id: Option<u64>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub reaction_kind: u64,
    pub user_ids: Vec<u64>,
}

impl Reaction {
    pub fn like() -> Self {
        Self { reaction_kind: REACTION_LIKE, user_ids: Vec::new() }
    }
}

/// A message owned by exactly one channel or one DM. `message_id` is unique
/// across the whole workspace, channels and DMs combined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: u64,
    pub sender_id: u64,
    pub body: String,
    pub sent_at: i64,
    pub reactions: Vec<Reaction>,
    pub pinned: bool,
}

/// Per-channel standup window. `handles` and `lines` grow in lockstep while
/// the standup is active; both are drained by the flush.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Standup {
    pub active: bool,
    pub finish_at: Option<i64>,
    pub initiator: Option<u64>,
    pub handles: Vec<String>,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: u64,
    pub name: String,
    pub is_public: bool,
    pub owners: Vec<u64>,
    pub members: Vec<u64>,
    pub messages: Vec<Message>,
    pub standup: Standup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dm {
    pub dm_id: u64,
    pub name: String,
    pub owners: Vec<u64>,
    pub members: Vec<u64>,
    pub messages: Vec<Message>,
}

/// A login session. The raw token is only ever held by the client; the store
/// keeps its SHA-256 hex digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: u64,
    pub token_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetCode {
    pub code: String,
    pub email: String,
}

/// One point of an append-only counter time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSample {
    pub count: i64,
    pub at: i64,
}

/// Per-user usage ledger. Each series is seeded with a zero sample at
/// registration and only ever appended to, so the current value of a counter
/// is always the last sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: u64,
    pub channels_joined: Vec<StatSample>,
    pub dms_joined: Vec<StatSample>,
    pub messages_sent: Vec<StatSample>,
    pub involvement_rate: f64,
}

impl UserStats {
    pub fn seeded(user_id: u64, at: i64) -> Self {
        let zero = vec![StatSample { count: 0, at }];
        Self {
            user_id,
            channels_joined: zero.clone(),
            dms_joined: zero.clone(),
            messages_sent: zero,
            involvement_rate: 0.0,
        }
    }
}

/// Workspace-wide ledger. Unlike `UserStats` this is sampled lazily: the
/// stats query itself appends to the series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceStats {
    pub channels_exist: Vec<StatSample>,
    pub dms_exist: Vec<StatSample>,
    pub messages_exist: Vec<StatSample>,
    pub utilization_rate: f64,
}
