use std::collections::VecDeque;

use crate::core::message::Message;

/// Maximum number of messages kept in a session.
pub const MAX_LOG_MESSAGES: usize = 50;

/// Ordered, bounded transcript of a session.
///
/// Appending past the bound evicts the oldest entries first.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_MESSAGES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + ExactSizeIterator {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// The most recent `limit` user/assistant messages, oldest first.
    pub fn recent_conversation(&self, limit: usize) -> Vec<Message> {
        let mut recent: Vec<Message> = self
            .messages
            .iter()
            .rev()
            .filter(|m| m.is_conversational())
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_never_exceeds_capacity_and_evicts_oldest_first() {
        let mut log = ConversationLog::new();
        for i in 0..120 {
            log.push(Message::user(format!("message {i}")));
            assert!(log.len() <= MAX_LOG_MESSAGES);
        }

        assert_eq!(log.len(), MAX_LOG_MESSAGES);
        assert_eq!(log.iter().next().unwrap().content, "message 70");
        assert_eq!(log.last().unwrap().content, "message 119");
    }

    #[test]
    fn recent_conversation_skips_app_messages() {
        let mut log = ConversationLog::new();
        log.push(Message::user("one"));
        log.push(Message::system("switched model"));
        log.push(Message::assistant("two"));
        log.push(Message::error("failed"));
        log.push(Message::user("three"));

        let recent: Vec<String> = log
            .recent_conversation(2)
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(recent, vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = ConversationLog::with_capacity(3);
        log.push(Message::user("a"));
        log.push(Message::assistant("b"));
        log.clear();
        assert!(log.is_empty());
    }
}
