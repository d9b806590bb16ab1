use serde::{Deserialize, Serialize};

use roost_types::models::{
    Channel, Dm, Message, Notification, ResetCode, Session, User, UserStats, WorkspaceStats,
};

use crate::error::{Error, Result};

/// The whole workspace state. One instance lives behind the store mutex and
/// is what gets serialized to the snapshot file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Data {
    pub users: Vec<User>,
    pub sessions: Vec<Session>,
    pub channels: Vec<Channel>,
    pub dms: Vec<Dm>,
    pub reset_codes: Vec<ResetCode>,
    pub user_stats: Vec<UserStats>,
    pub workspace_stats: WorkspaceStats,
}

/// Where a message lives: index into `channels` or `dms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Channel(usize),
    Dm(usize),
}

impl Data {
    pub fn user(&self, user_id: u64) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| Error::not_found("unknown user"))
    }

    pub fn user_mut(&mut self, user_id: u64) -> Result<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| Error::not_found("unknown user"))
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn handle_of(&self, user_id: u64) -> Result<String> {
        Ok(self.user(user_id)?.handle.clone())
    }

    pub fn channel(&self, channel_id: u64) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.channel_id == channel_id)
            .ok_or_else(|| Error::not_found("unknown channel"))
    }

    pub fn channel_mut(&mut self, channel_id: u64) -> Result<&mut Channel> {
        self.channels
            .iter_mut()
            .find(|c| c.channel_id == channel_id)
            .ok_or_else(|| Error::not_found("unknown channel"))
    }

    pub fn dm(&self, dm_id: u64) -> Result<&Dm> {
        self.dms
            .iter()
            .find(|d| d.dm_id == dm_id)
            .ok_or_else(|| Error::not_found("unknown dm"))
    }

    pub fn dm_mut(&mut self, dm_id: u64) -> Result<&mut Dm> {
        self.dms
            .iter_mut()
            .find(|d| d.dm_id == dm_id)
            .ok_or_else(|| Error::not_found("unknown dm"))
    }

    pub fn session_user(&self, token_hash: &str) -> Option<u64> {
        self.sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .map(|s| s.user_id)
    }

    pub fn next_user_id(&self) -> u64 {
        self.users.iter().map(|u| u.user_id).max().map_or(0, |m| m + 1)
    }

    pub fn next_channel_id(&self) -> u64 {
        self.channels.len() as u64
    }

    pub fn next_dm_id(&self) -> u64 {
        self.dms.last().map_or(0, |d| d.dm_id + 1)
    }

    /// Find the container that owns a message. Channels are scanned before
    /// DMs, in insertion order.
    pub fn locate_message(&self, message_id: u64) -> Option<Locator> {
        if let Some(i) = self
            .channels
            .iter()
            .position(|c| c.messages.iter().any(|m| m.message_id == message_id))
        {
            return Some(Locator::Channel(i));
        }
        self.dms
            .iter()
            .position(|d| d.messages.iter().any(|m| m.message_id == message_id))
            .map(Locator::Dm)
    }

    pub fn message_in(&self, loc: Locator, message_id: u64) -> Option<&Message> {
        let messages = match loc {
            Locator::Channel(i) => &self.channels[i].messages,
            Locator::Dm(i) => &self.dms[i].messages,
        };
        messages.iter().find(|m| m.message_id == message_id)
    }

    pub fn message_in_mut(&mut self, loc: Locator, message_id: u64) -> Option<&mut Message> {
        let messages = match loc {
            Locator::Channel(i) => &mut self.channels[i].messages,
            Locator::Dm(i) => &mut self.dms[i].messages,
        };
        messages.iter_mut().find(|m| m.message_id == message_id)
    }

    pub fn total_messages(&self) -> usize {
        self.channels.iter().map(|c| c.messages.len()).sum::<usize>()
            + self.dms.iter().map(|d| d.messages.len()).sum::<usize>()
    }

    /// Push a notification to the front of a user's feed. Unknown users are
    /// ignored; notifications are best effort.
    pub fn notify(&mut self, user_id: u64, notification: Notification) {
        if let Some(user) = self.users.iter_mut().find(|u| u.user_id == user_id) {
            user.notifications.insert(0, notification);
        }
    }
}
