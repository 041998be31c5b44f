//! Content strategies for composing notification messages.
//!
//! A strategy writes the subject and body into a [`Message`] and nothing
//! else. Strategies are stateless and deterministic: composing the same kind
//! twice yields the same content.

use crate::Message;

/// A rule producing subject and body text for a message.
///
/// Implemented by [`ContentKind`] for the built-in registry, and by any
/// `Fn(&mut Message)` closure for ad-hoc content.
pub trait FillContent {
    /// Write subject and body into the message.
    fn fill(&self, message: &mut Message);
}

impl<F> FillContent for F
where
    F: Fn(&mut Message),
{
    fn fill(&self, message: &mut Message) {
        self(message)
    }
}

/// The fixed set of named content strategies.
///
/// There is no dynamic registration; callers pick a kind per send call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Order confirmation.
    OrderReceived,
    /// Shipping notice.
    OrderShipped,
}

impl FillContent for ContentKind {
    fn fill(&self, message: &mut Message) {
        match self {
            ContentKind::OrderReceived => {
                message.subject = "Order Received".into();
                message.body = "Thank you for your order".into();
            }
            ContentKind::OrderShipped => {
                message.subject = "Order Shipped".into();
                message.body =
                    "Just sent you your order. ! Hope it gets to you (this time :p)".into();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_content() {
        let mut msg = Message::new("a@b.com");
        ContentKind::OrderReceived.fill(&mut msg);
        assert_eq!(msg.subject, "Order Received");
        assert_eq!(msg.body, "Thank you for your order");
    }

    #[test]
    fn shipped_content() {
        let mut msg = Message::new("a@b.com");
        ContentKind::OrderShipped.fill(&mut msg);
        assert_eq!(msg.subject, "Order Shipped");
    }

    #[test]
    fn closures_are_strategies() {
        let mut msg = Message::new("a@b.com");
        let custom = |m: &mut Message| {
            m.subject = "Hello".into();
            m.body = "World".into();
        };
        custom.fill(&mut msg);
        assert_eq!(msg.subject, "Hello");
        assert_eq!(msg.body, "World");
    }
}
