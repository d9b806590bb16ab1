use roost_types::models::{Message, Standup};

use crate::data::Data;

impl Data {
    /// Open a standup window. Validation (membership, length, no standup
    /// already running) happens in the handler before this is called.
    pub fn begin_standup(&mut self, channel_id: u64, initiator: u64, finish_at: i64) {
        if let Ok(channel) = self.channel_mut(channel_id) {
            channel.standup = Standup {
                active: true,
                finish_at: Some(finish_at),
                initiator: Some(initiator),
                handles: Vec::new(),
                lines: Vec::new(),
            };
        }
    }

    /// Buffer one line into an active standup. Buffering is not sending: no
    /// message is created and no statistics move until the flush.
    pub fn buffer_standup_line(&mut self, channel_id: u64, handle: String, line: String) {
        if let Ok(channel) = self.channel_mut(channel_id) {
            channel.standup.handles.push(handle);
            channel.standup.lines.push(line);
        }
    }

    /// Timer-driven flush. A no-op when the channel has vanished or the
    /// standup is no longer active; an empty buffer resets the standup
    /// without emitting anything. Otherwise the buffered lines become one
    /// message, attributed to the initiator and stamped with the window's
    /// finish time. Returns the minted message id, if any.
    pub fn flush_standup(&mut self, channel_id: u64) -> Option<u64> {
        let idx = self.channels.iter().position(|c| c.channel_id == channel_id)?;

        let standup = std::mem::take(&mut self.channels[idx].standup);
        if !standup.active {
            self.channels[idx].standup = standup;
            return None;
        }
        if standup.lines.is_empty() {
            return None;
        }

        let mut body = String::new();
        for (handle, line) in standup.handles.iter().zip(standup.lines.iter()) {
            body.push_str(handle);
            body.push_str(": ");
            body.push_str(line);
            body.push('\n');
        }

        // Mint before insert so the scan cannot see the new message.
        let message_id = self.next_message_id();
        self.channels[idx].messages.push(Message {
            message_id,
            sender_id: standup.initiator.unwrap_or_default(),
            body,
            sent_at: standup.finish_at.unwrap_or_default(),
            reactions: Vec::new(),
            pinned: false,
        });

        Some(message_id)
    }
}

#[cfg(test)]
mod tests {
    use roost_types::models::Channel;

    use super::*;

    fn data_with_channel() -> Data {
        let mut data = Data::default();
        data.channels.push(Channel {
            channel_id: 0,
            name: "general".into(),
            is_public: true,
            owners: vec![0],
            members: vec![0, 1, 2],
            messages: vec![],
            standup: Standup::default(),
        });
        data
    }

    #[test]
    fn buffers_stay_in_lockstep() {
        let mut data = data_with_channel();
        data.begin_standup(0, 0, 1000);
        data.buffer_standup_line(0, "alice".into(), "hi".into());
        data.buffer_standup_line(0, "bob".into(), "yo".into());

        let standup = &data.channels[0].standup;
        assert_eq!(standup.handles.len(), standup.lines.len());
        assert_eq!(standup.finish_at, Some(1000));
        assert_eq!(standup.initiator, Some(0));
    }

    #[test]
    fn empty_flush_emits_nothing_and_resets() {
        let mut data = data_with_channel();
        data.begin_standup(0, 0, 1000);

        assert_eq!(data.flush_standup(0), None);
        assert!(data.channels[0].messages.is_empty());
        assert!(!data.channels[0].standup.active);
        assert_eq!(data.channels[0].standup.finish_at, None);
    }

    #[test]
    fn flush_joins_lines_in_buffer_order() {
        let mut data = data_with_channel();
        data.begin_standup(0, 2, 1000);
        data.buffer_standup_line(0, "alice".into(), "hi".into());
        data.buffer_standup_line(0, "bob".into(), "yo".into());

        let id = data.flush_standup(0).unwrap();
        let message = &data.channels[0].messages[0];
        assert_eq!(message.message_id, id);
        assert_eq!(message.body, "alice: hi\nbob: yo\n");
        assert_eq!(message.sender_id, 2);
        assert_eq!(message.sent_at, 1000);
        assert!(message.reactions.is_empty());
        assert!(!message.pinned);
        assert!(!data.channels[0].standup.active);
    }

    #[test]
    fn flush_on_missing_channel_is_noop() {
        let mut data = data_with_channel();
        assert_eq!(data.flush_standup(42), None);
    }

    #[test]
    fn flush_on_inactive_standup_is_noop() {
        let mut data = data_with_channel();
        assert_eq!(data.flush_standup(0), None);
        assert!(data.channels[0].messages.is_empty());
    }

    #[test]
    fn flushed_message_id_is_globally_unique() {
        let mut data = data_with_channel();
        let id = data.next_message_id();
        data.channels[0].messages.push(Message {
            message_id: id,
            sender_id: 0,
            body: "before".into(),
            sent_at: 0,
            reactions: vec![],
            pinned: false,
        });

        data.begin_standup(0, 0, 1000);
        data.buffer_standup_line(0, "alice".into(), "hi".into());
        let flushed = data.flush_standup(0).unwrap();
        assert_ne!(flushed, id);
    }
}
