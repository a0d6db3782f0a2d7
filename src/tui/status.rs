//! Transient status messages
//!
//! One message at a time, shown in the status line for a few seconds. Every
//! surfaced failure (guard denial, disabled refusal, handler error, finished
//! operation) lands here rather than interrupting the loop.

use std::time::{Duration, Instant};

const MESSAGE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub kind: MessageKind,
    pub expires: Instant,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
            expires: Instant::now() + MESSAGE_TTL,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires
    }
}

#[derive(Default)]
pub struct StatusSink {
    current: Option<StatusMessage>,
}

impl StatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current message; a newer message always wins.
    pub fn set(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.current = Some(StatusMessage::new(text, kind));
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }

    /// Drop the message once its time is up. Called each loop tick.
    pub fn clear_expired(&mut self) {
        if self.current.as_ref().is_some_and(|m| m.is_expired()) {
            self.current = None;
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_message_replaces_older() {
        let mut sink = StatusSink::new();
        sink.set("staged file.rs", MessageKind::Success);
        sink.set("fetch failed", MessageKind::Error);

        let current = sink.current().unwrap();
        assert_eq!(current.text, "fetch failed");
        assert_eq!(current.kind, MessageKind::Error);
    }

    #[test]
    fn test_clear_expired_keeps_fresh_messages() {
        let mut sink = StatusSink::new();
        sink.set("working", MessageKind::Info);
        sink.clear_expired();
        assert!(sink.current().is_some());
    }

    #[test]
    fn test_expired_message_is_dropped() {
        let mut sink = StatusSink::new();
        sink.set("old news", MessageKind::Info);
        if let Some(msg) = sink.current.as_mut() {
            msg.expires = Instant::now() - Duration::from_secs(1);
        }
        sink.clear_expired();
        assert!(sink.current().is_none());
    }
}
