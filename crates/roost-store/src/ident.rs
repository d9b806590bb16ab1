use crate::data::Data;

impl Data {
    /// Mint the next globally unique message id: one more than the highest
    /// id found in any channel or DM, 0 when the workspace has no messages.
    ///
    /// Must be called before the new message is inserted into its owning
    /// collection, otherwise the scan would count the message itself. All
    /// callers run under the store mutex, so no two sends can observe the
    /// same maximum.
    pub fn next_message_id(&self) -> u64 {
        self.channels
            .iter()
            .map(|c| &c.messages)
            .chain(self.dms.iter().map(|d| &d.messages))
            .flatten()
            .map(|m| m.message_id)
            .max()
            .map_or(0, |m| m + 1)
    }
}
