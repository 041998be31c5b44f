use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender address stamped on every message unless overridden.
pub const DEFAULT_SENDER: &str = "noreply@corp.com";

/// Reply-to address stamped on every message unless overridden.
pub const DEFAULT_REPLY_TO: &str = "/dev/null";

/// Notification envelope handed to a transport.
///
/// A `Message` bundles the addressing fields with the composed content. The
/// id is generated at construction and never changes; every delivery attempt
/// gets its own `Message` with its own id, so a downstream system cannot
/// deduplicate retried attempts by id.
///
/// Subject and body start empty and are written exactly once by a
/// [`FillContent`](crate::content::FillContent) strategy before the first
/// delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique per-instance identifier.
    pub id: Uuid,
    /// Originating address.
    pub sender: String,
    /// Address replies should be directed to.
    pub reply_to: String,
    /// Recipient address.
    pub to: String,
    /// Subject line, filled by a content strategy.
    pub subject: String,
    /// Body text, filled by a content strategy.
    pub body: String,
}

impl Message {
    /// Create an empty message addressed to `to`, with a fresh id and the
    /// default sender and reply-to addresses.
    pub fn new(to: impl Into<String>) -> Self {
        Self::addressed(DEFAULT_SENDER, DEFAULT_REPLY_TO, to)
    }

    /// Create an empty message with explicit addressing.
    pub fn addressed(
        sender: impl Into<String>,
        reply_to: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            reply_to: reply_to.into(),
            to: to.into(),
            subject: String::new(),
            body: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_messages_have_distinct_ids() {
        let a = Message::new("a@b.com");
        let b = Message::new("a@b.com");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn default_addressing() {
        let msg = Message::new("a@b.com");
        assert_eq!(msg.sender, DEFAULT_SENDER);
        assert_eq!(msg.reply_to, DEFAULT_REPLY_TO);
        assert_eq!(msg.to, "a@b.com");
        assert!(msg.subject.is_empty());
        assert!(msg.body.is_empty());
    }
}
