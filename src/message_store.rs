//! Ordered log of one thread's messages
//!
//! Every list result is treated as a full snapshot. Refreshes that resolve
//! out of order simply overwrite each other; the last one observed wins.


use crate::model::Message;

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with `messages`, sorted ascending by creation
    /// time and stripped of anything without presentable text.
    ///
    /// The sort is stable, so equal timestamps keep their input order and
    /// ingesting a snapshot twice yields the same log.
    pub fn ingest(&mut self, messages: impl IntoIterator<Item = Message>) {
        let mut messages: Vec<Message> = messages
            .into_iter()
            .filter(Message::is_presentable)
            .collect();
        messages.sort_by_key(|m| m.created_at);
        self.messages = messages;
    }

    /// Add a just-sent message at the end without re-sorting
    pub fn append(&mut self, message: Message) {
        if !message.is_presentable() {
            tracing::debug!(message_id = %message.id, "Skipping append of message without text");
            return;
        }
        self.messages.push(message);
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
