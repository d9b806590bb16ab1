use roost_types::api::{UserStatsView, WorkspaceStatsView};
use roost_types::models::StatSample;

use crate::data::Data;
use crate::error::{Error, Result};

fn append_delta(series: &mut Vec<StatSample>, delta: i64, at: i64) {
    // Seeded at registration, so the series is never empty in practice.
    let current = series.last().map_or(0, |s| s.count);
    series.push(StatSample { count: current + delta, at });
}

impl Data {
    /// Append a channels-joined sample for `user_id`. Deltas are applied as
    /// given: nothing clamps the running count at zero, a decrement below
    /// the true membership count is a caller bug.
    pub fn record_channel_join_delta(&mut self, user_id: u64, delta: i64, at: i64) {
        if let Some(rec) = self.user_stats.iter_mut().find(|s| s.user_id == user_id) {
            append_delta(&mut rec.channels_joined, delta, at);
        }
    }

    pub fn record_dm_join_delta(&mut self, user_id: u64, delta: i64, at: i64) {
        if let Some(rec) = self.user_stats.iter_mut().find(|s| s.user_id == user_id) {
            append_delta(&mut rec.dms_joined, delta, at);
        }
    }

    pub fn record_message_sent_delta(&mut self, user_id: u64, delta: i64, at: i64) {
        if let Some(rec) = self.user_stats.iter_mut().find(|s| s.user_id == user_id) {
            append_delta(&mut rec.messages_sent, delta, at);
        }
    }

    /// Recompute the involvement rate for one user and return their ledger.
    ///
    /// involvement = (channels joined + dms joined + messages sent)
    ///             / (channels + dms + messages in the workspace),
    /// 0 when the workspace is empty, capped at 1: a user's sent count keeps
    /// the messages they sent even after removal, so the numerator can
    /// exceed what still exists.
    pub fn user_stats_view(&mut self, user_id: u64) -> Result<UserStatsView> {
        let denominator =
            (self.channels.len() + self.dms.len() + self.total_messages()) as f64;

        let rec = self
            .user_stats
            .iter_mut()
            .find(|s| s.user_id == user_id)
            .ok_or_else(|| Error::not_found("no statistics for user"))?;

        let numerator = (rec.channels_joined.last().map_or(0, |s| s.count)
            + rec.dms_joined.last().map_or(0, |s| s.count)
            + rec.messages_sent.last().map_or(0, |s| s.count)) as f64;

        rec.involvement_rate = if denominator == 0.0 {
            0.0
        } else {
            (numerator / denominator).min(1.0)
        };

        Ok(UserStatsView {
            channels_joined: rec.channels_joined.clone(),
            dms_joined: rec.dms_joined.clone(),
            messages_sent: rec.messages_sent.clone(),
            involvement_rate: rec.involvement_rate,
        })
    }

    /// Sample the workspace ledger and return it. This appends one point to
    /// each series on every call: the stored history is a time series of
    /// activity sampled at query time, so the read deliberately mutates.
    pub fn workspace_stats_view(&mut self, at: i64) -> WorkspaceStatsView {
        let channels = self.channels.len() as i64;
        let dms = self.dms.len() as i64;
        let messages = self.total_messages() as i64;

        let engaged = self
            .users
            .iter()
            .filter(|u| {
                self.channels.iter().any(|c| c.members.contains(&u.user_id))
                    || self.dms.iter().any(|d| d.members.contains(&u.user_id))
            })
            .count();

        let ws = &mut self.workspace_stats;
        ws.channels_exist.push(StatSample { count: channels, at });
        ws.dms_exist.push(StatSample { count: dms, at });
        ws.messages_exist.push(StatSample { count: messages, at });
        ws.utilization_rate = if self.users.is_empty() {
            0.0
        } else {
            engaged as f64 / self.users.len() as f64
        };

        WorkspaceStatsView {
            channels_exist: ws.channels_exist.clone(),
            dms_exist: ws.dms_exist.clone(),
            messages_exist: ws.messages_exist.clone(),
            utilization_rate: ws.utilization_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use roost_types::models::{Channel, Dm, Message, Standup, User, UserStats};

    use super::*;

    fn user(id: u64) -> User {
        User {
            user_id: id,
            email: format!("u{id}@example.com"),
            password_hash: String::new(),
            name_first: "A".into(),
            name_last: "B".into(),
            handle: format!("user{id}"),
            perm: if id == 0 { 1 } else { 2 },
            notifications: vec![],
        }
    }

    fn seeded(id: u64) -> Data {
        let mut data = Data::default();
        for uid in 0..=id {
            data.users.push(user(uid));
            data.user_stats.push(UserStats::seeded(uid, 100));
        }
        data
    }

    fn message(id: u64, sender: u64) -> Message {
        Message {
            message_id: id,
            sender_id: sender,
            body: "hi".into(),
            sent_at: 0,
            reactions: vec![],
            pinned: false,
        }
    }

    #[test]
    fn register_then_create_and_send_scenario() {
        let mut data = seeded(0);

        data.channels.push(Channel {
            channel_id: 0,
            name: "general".into(),
            is_public: true,
            owners: vec![0],
            members: vec![0],
            messages: vec![],
            standup: Standup::default(),
        });
        data.record_channel_join_delta(0, 1, 110);

        for i in 0..3 {
            let id = data.next_message_id();
            data.channels[0].messages.push(message(id, 0));
            data.record_message_sent_delta(0, 1, 120 + i);
        }

        let view = data.user_stats_view(0).unwrap();
        assert_eq!(view.messages_sent.len(), 4); // zero seed + 3 sends
        assert_eq!(view.messages_sent.last().unwrap().count, 3);
        assert_eq!(view.channels_joined.last().unwrap().count, 1);
        assert_eq!(view.dms_joined.last().unwrap().count, 0);
    }

    #[test]
    fn involvement_rate_is_zero_for_empty_workspace() {
        let mut data = seeded(0);
        let view = data.user_stats_view(0).unwrap();
        assert_eq!(view.involvement_rate, 0.0);
    }

    #[test]
    fn involvement_rate_capped_at_one() {
        let mut data = seeded(0);
        data.channels.push(Channel {
            channel_id: 0,
            name: "c".into(),
            is_public: true,
            owners: vec![0],
            members: vec![0],
            messages: vec![],
            standup: Standup::default(),
        });
        data.record_channel_join_delta(0, 1, 110);
        // Counters outrun what still exists in the workspace.
        data.record_message_sent_delta(0, 1, 111);
        data.record_message_sent_delta(0, 1, 112);

        let view = data.user_stats_view(0).unwrap();
        assert_eq!(view.involvement_rate, 1.0);
    }

    #[test]
    fn deltas_are_not_clamped_at_zero() {
        let mut data = seeded(0);
        data.record_channel_join_delta(0, -1, 110);
        let view = data.user_stats_view(0).unwrap();
        assert_eq!(view.channels_joined.last().unwrap().count, -1);
    }

    #[test]
    fn workspace_stats_history_grows_per_query() {
        let mut data = seeded(1);
        data.dms.push(Dm {
            dm_id: 0,
            name: "a, b".into(),
            owners: vec![0],
            members: vec![0, 1],
            messages: vec![message(0, 0)],
        });

        let first = data.workspace_stats_view(200);
        assert_eq!(first.channels_exist.len(), 1);
        assert_eq!(first.dms_exist.last().unwrap().count, 1);
        assert_eq!(first.messages_exist.last().unwrap().count, 1);
        assert_eq!(first.utilization_rate, 1.0);

        let second = data.workspace_stats_view(201);
        assert_eq!(second.channels_exist.len(), 2);
    }

    #[test]
    fn utilization_counts_distinct_members_only() {
        let mut data = seeded(2);
        // User 0 in a channel and a DM; users 1 and 2 in nothing.
        data.channels.push(Channel {
            channel_id: 0,
            name: "c".into(),
            is_public: true,
            owners: vec![0],
            members: vec![0],
            messages: vec![],
            standup: Standup::default(),
        });
        data.dms.push(Dm {
            dm_id: 0,
            name: "a".into(),
            owners: vec![0],
            members: vec![0],
            messages: vec![],
        });

        let view = data.workspace_stats_view(200);
        assert!((view.utilization_rate - 1.0 / 3.0).abs() < 1e-9);
    }
}
