//! UI-agnostic conversation types
//!
//! This module contains the message log and the small records that describe
//! the session's transient state. Nothing here depends on a UI framework.

use serde::{Deserialize, Serialize};

/// Prefix put in front of every assistant message that reports a failed query.
pub const ERROR_PREFIX: &str = "⚠️ Error: ";

/// Shown when the backend answered but left `response` empty.
pub const EMPTY_REPLY: &str = "No response received";

/// Used for a failed query when the backend gave no `detail`.
pub const CONNECT_FAILURE: &str = "Unable to connect to the server.";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Assistant,
}

/// A single entry in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
        }
    }

    /// Assistant message carrying a query failure.
    pub fn failure(detail: Option<&str>) -> Self {
        Self::assistant(format!("{}{}", ERROR_PREFIX, detail.unwrap_or(CONNECT_FAILURE)))
    }

    pub fn is_error(&self) -> bool {
        self.sender == Sender::Assistant && self.text.starts_with(ERROR_PREFIX)
    }
}

/// Append-only message history.
///
/// Positions are stable for the lifetime of the log: entries are never
/// removed, reordered or edited, so an index handed out once keeps pointing
/// at the same message.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

/// Banner-level message, distinct from conversation content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }
}

/// In-flight markers for the two request kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFlags {
    pub uploading: bool,
    pub loading: bool,
}

impl RequestFlags {
    pub fn busy(&self) -> bool {
        self.uploading || self.loading
    }
}

/// Raises a flag for as long as it is alive and lowers it when dropped,
/// whichever way the owning scope is left.
pub(crate) struct InFlight<'a> {
    flag: &'a mut bool,
}

impl<'a> InFlight<'a> {
    pub(crate) fn hold(flag: &'a mut bool) -> Self {
        *flag = true;
        Self { flag }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

/// Keeps `loading` raised while a query is out. If dropped before
/// [`PendingReply::settle`], the query is answered with a failure message so
/// every user message still gets exactly one reply.
pub(crate) struct PendingReply<'a> {
    log: &'a mut ConversationLog,
    loading: &'a mut bool,
    answered: bool,
}

impl<'a> PendingReply<'a> {
    pub(crate) fn hold(log: &'a mut ConversationLog, loading: &'a mut bool) -> Self {
        *loading = true;
        Self {
            log,
            loading,
            answered: false,
        }
    }

    /// The caller will record the reply itself.
    pub(crate) fn settle(mut self) {
        self.answered = true;
    }
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if !self.answered {
            self.log.push(ChatMessage::failure(None));
        }
        *self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_indices_are_positions() {
        let mut log = ConversationLog::new();
        assert_eq!(log.push(ChatMessage::user("a")), 0);
        assert_eq!(log.push(ChatMessage::assistant("b")), 1);
        assert_eq!(log.get(1).map(|m| m.text.as_str()), Some("b"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_failure_message_uses_detail_or_fallback() {
        let with_detail = ChatMessage::failure(Some("index not found"));
        assert_eq!(with_detail.text, "⚠️ Error: index not found");
        assert!(with_detail.is_error());

        let without = ChatMessage::failure(None);
        assert_eq!(without.text, "⚠️ Error: Unable to connect to the server.");
    }

    #[test]
    fn test_in_flight_guard_lowers_flag_on_drop() {
        let mut flag = false;
        {
            let _guard = InFlight::hold(&mut flag);
        }
        assert!(!flag);
    }

    #[test]
    fn test_in_flight_guard_lowers_flag_on_panic() {
        let mut flag = false;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = InFlight::hold(&mut flag);
            panic!("request blew up");
        }));
        assert!(result.is_err());
        assert!(!flag);
    }

    #[test]
    fn test_abandoned_reply_is_answered_with_failure() {
        let mut log = ConversationLog::new();
        let mut loading = false;
        log.push(ChatMessage::user("hello"));
        {
            let _pending = PendingReply::hold(&mut log, &mut loading);
        }
        assert!(!loading);
        assert_eq!(log.len(), 2);
        assert_eq!(log.last(), Some(&ChatMessage::failure(None)));
    }

    #[test]
    fn test_settled_reply_adds_nothing() {
        let mut log = ConversationLog::new();
        let mut loading = false;
        PendingReply::hold(&mut log, &mut loading).settle();
        assert!(!loading);
        assert!(log.is_empty());
    }
}
