//! Retrying send loop for notification messages.
//!
//! This module implements the notification sender:
//!
//! - Builds a fresh [`Message`] per attempt
//! - Applies the caller-chosen content strategy
//! - Attempts delivery through a [`transport::Transport`]
//! - Retries a bounded number of times, back to back
//! - Exposes lifecycle hooks for observability and customization
//!
//! A send call ends as soon as one attempt succeeds, or with a typed
//! exhaustion error once the attempt budget is spent.

use tower::Service;

use crate::content::FillContent;
use crate::{Message, transport};

/// Attempts per send call unless overridden.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Notification sender with bounded retries.
///
/// The `Courier` owns a transport and drives the per-call retry loop. Each
/// attempt constructs a new message with a fresh id, so retried attempts are
/// not deduplicatable downstream; callers needing idempotency must carry
/// their own key in the content.
///
/// Generic parameters:
/// - `HK`: hook implementation for lifecycle events
/// - `T`: transport service type
pub struct Courier<HK, T> {
    transport: transport::Transport<T>,
    hook: HK,
    config: CourierConfig,
}

/// Addressing and retry settings for a [`Courier`].
#[derive(Debug, Clone)]
pub struct CourierConfig {
    /// Sender address stamped on every message.
    pub sender: String,
    /// Reply-to address stamped on every message.
    pub reply_to: String,
    /// Attempt budget per send call. Always at least 1.
    pub max_attempts: u32,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            sender: crate::message::DEFAULT_SENDER.to_owned(),
            reply_to: crate::message::DEFAULT_REPLY_TO.to_owned(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl<T> Courier<DefaultCourierHook, T>
where
    T: Service<Message>,
{
    /// Create a courier with the default hook and configuration.
    pub fn new(transport: transport::Transport<T>) -> Self {
        Self {
            transport,
            hook: DefaultCourierHook,
            config: CourierConfig::default(),
        }
    }
}

impl<HK, T> Courier<HK, T>
where
    HK: CourierHook,
    T: Service<Message> + Clone + Send + 'static,
    <T as Service<Message>>::Error: Into<tower::BoxError>,
    <T as Service<Message>>::Future: Send + 'static,
{
    /// Replace the hook while keeping all other generics unchanged.
    pub fn with_hook<HK2: CourierHook>(self, hook: HK2) -> Courier<HK2, T> {
        Courier {
            transport: self.transport,
            hook,
            config: self.config,
        }
    }

    /// Override the attempt budget. Clamped to at least one attempt.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the sender and reply-to addresses.
    pub fn with_addresses(
        mut self,
        sender: impl Into<String>,
        reply_to: impl Into<String>,
    ) -> Self {
        self.config.sender = sender.into();
        self.config.reply_to = reply_to.into();
        self
    }

    /// Send a notification to `recipient` with the given content strategy.
    ///
    /// For each attempt a new message is built with a fresh id, filled by
    /// `content`, and handed to the transport. The first successful attempt
    /// ends the call; there is no delay between attempts. When the budget is
    /// exhausted the last transport error is returned inside
    /// [`SendErrorKind::Exhausted`].
    #[tracing::instrument(skip(self, content))]
    pub async fn send<C>(&mut self, recipient: &str, content: C) -> Result<Receipt, SendError>
    where
        C: FillContent,
    {
        if recipient.is_empty() {
            return Err(SendError::invalid_recipient());
        }

        let mut attempt = 0;
        let last = loop {
            attempt += 1;

            let mut message =
                Message::addressed(&self.config.sender, &self.config.reply_to, recipient);
            content.fill(&mut message);

            self.hook.on_attempt(&message, attempt);

            match self.transport.deliver(message.clone()).await {
                Ok(()) => {
                    self.hook.on_delivered(&message, attempt);
                    return Ok(Receipt {
                        message_id: message.id,
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    self.hook.on_attempt_failed(&err, attempt);
                    if attempt >= self.config.max_attempts {
                        break err;
                    }
                }
            }
        };

        self.hook.on_exhausted(recipient, attempt);
        Err(SendError::exhausted(attempt, last))
    }
}

/// Proof of a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Id of the message the transport accepted.
    pub message_id: uuid::Uuid,
    /// Attempts it took, including the successful one.
    pub attempts: u32,
}

/// Error returned when a send call fails.
#[derive(Debug)]
pub struct SendError {
    context: tracing_error::SpanTrace,
    kind: SendErrorKind,
}

/// Classification of send failures.
#[derive(Debug)]
pub enum SendErrorKind {
    /// The recipient address was empty.
    InvalidRecipient,
    /// Every attempt failed; the last transport error is attached.
    Exhausted {
        /// Attempts made before giving up.
        attempts: u32,
        /// Error from the final attempt.
        last: transport::TransportError,
    },
}

impl SendError {
    fn invalid_recipient() -> Self {
        Self {
            context: tracing_error::SpanTrace::capture(),
            kind: SendErrorKind::InvalidRecipient,
        }
    }

    fn exhausted(attempts: u32, last: transport::TransportError) -> Self {
        Self {
            context: tracing_error::SpanTrace::capture(),
            kind: SendErrorKind::Exhausted { attempts, last },
        }
    }

    /// The error kind.
    pub fn kind(&self) -> &SendErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SendErrorKind::InvalidRecipient => writeln!(f, "Recipient address is empty"),
            SendErrorKind::Exhausted { attempts, last } => {
                writeln!(f, "Delivery failed after {attempts} attempts: {last}")
            }
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            SendErrorKind::InvalidRecipient => None,
            SendErrorKind::Exhausted { last, .. } => Some(last),
        }
    }
}

/// Hook trait for observing send lifecycle events.
///
/// Hooks are invoked synchronously and should avoid heavy or blocking work.
/// Typical use cases are logging and metrics.
pub trait CourierHook: Send + Sync {
    fn on_attempt(&self, message: &Message, attempt: u32);
    fn on_attempt_failed(&self, error: &dyn std::error::Error, attempt: u32);
    fn on_delivered(&self, message: &Message, attempts: u32);
    fn on_exhausted(&self, recipient: &str, attempts: u32);
}

/// Default hook implementation.
///
/// Logs lifecycle events using `tracing`.
pub struct DefaultCourierHook;

impl CourierHook for DefaultCourierHook {
    fn on_attempt(&self, message: &Message, attempt: u32) {
        tracing::debug!(message_id = %message.id, to = %message.to, attempt, "Attempting delivery");
    }

    fn on_attempt_failed(&self, error: &dyn std::error::Error, attempt: u32) {
        tracing::warn!(%error, attempt, "Delivery attempt failed");
    }

    fn on_delivered(&self, message: &Message, attempts: u32) {
        tracing::info!(message_id = %message.id, attempts, "Message delivered");
    }

    fn on_exhausted(&self, recipient: &str, attempts: u32) {
        tracing::error!(recipient, attempts, "Giving up after exhausting attempts");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::content::ContentKind;
    use crate::message::{DEFAULT_REPLY_TO, DEFAULT_SENDER};
    use crate::transport::{DeliveryService, Scripted, Transport};

    fn courier(
        backend: &Scripted<Message>,
    ) -> Courier<DefaultCourierHook, DeliveryService<Scripted<Message>>> {
        Courier::new(Transport::new(backend.clone()))
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let backend = Scripted::always_succeed();
        let receipt = courier(&backend)
            .send("a@b.com", ContentKind::OrderReceived)
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 1);
        assert_eq!(backend.attempts().await, 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let backend = Scripted::fail_times(2);
        let receipt = courier(&backend)
            .send("a@b.com", ContentKind::OrderReceived)
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 3);
        assert_eq!(backend.attempts().await, 3);
    }

    #[tokio::test]
    async fn stops_right_after_success() {
        let backend = Scripted::fail_times(1);
        let receipt = courier(&backend)
            .send("a@b.com", ContentKind::OrderReceived)
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 2);
        assert_eq!(backend.attempts().await, 2);
    }

    #[tokio::test]
    async fn exhausts_after_three_attempts() {
        let backend = Scripted::always_fail();
        let err = courier(&backend)
            .send("a@b.com", ContentKind::OrderReceived)
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind(),
            SendErrorKind::Exhausted { attempts: 3, .. }
        ));
        assert_eq!(backend.attempts().await, 3);
    }

    #[tokio::test]
    async fn every_attempt_carries_fixed_addressing_and_content() {
        let backend = Scripted::always_fail();
        let _ = courier(&backend)
            .send("a@b.com", ContentKind::OrderShipped)
            .await;

        let requests = backend.requests().await;
        assert_eq!(requests.len(), 3);
        for msg in &requests {
            assert_eq!(msg.sender, DEFAULT_SENDER);
            assert_eq!(msg.reply_to, DEFAULT_REPLY_TO);
            assert_eq!(msg.to, "a@b.com");
            assert_eq!(msg.subject, "Order Shipped");
        }
    }

    #[tokio::test]
    async fn each_attempt_gets_a_fresh_id() {
        let backend = Scripted::always_fail();
        let _ = courier(&backend)
            .send("a@b.com", ContentKind::OrderReceived)
            .await;

        let ids: HashSet<_> = backend.requests().await.into_iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn rejects_empty_recipient_without_touching_the_transport() {
        let backend = Scripted::always_succeed();
        let err = courier(&backend)
            .send("", ContentKind::OrderReceived)
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), SendErrorKind::InvalidRecipient));
        assert_eq!(backend.attempts().await, 0);
    }

    #[tokio::test]
    async fn attempt_budget_is_configurable() {
        let backend = Scripted::fail_times(4);
        let receipt = courier(&backend)
            .with_max_attempts(5)
            .send("a@b.com", ContentKind::OrderReceived)
            .await
            .unwrap();

        assert_eq!(receipt.attempts, 5);
    }

    #[tokio::test]
    async fn closures_work_as_content() {
        let backend = Scripted::always_succeed();
        courier(&backend)
            .send("a@b.com", |m: &mut Message| {
                m.subject = "Ad hoc".into();
                m.body = "Body".into();
            })
            .await
            .unwrap();

        let requests = backend.requests().await;
        assert_eq!(requests[0].subject, "Ad hoc");
    }

    #[tokio::test]
    async fn hooks_see_every_lifecycle_event() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        #[derive(Default)]
        struct Counting {
            attempts: AtomicU32,
            failures: AtomicU32,
            delivered: AtomicU32,
            exhausted: AtomicU32,
        }

        impl CourierHook for Arc<Counting> {
            fn on_attempt(&self, _message: &Message, _attempt: u32) {
                self.attempts.fetch_add(1, Ordering::SeqCst);
            }
            fn on_attempt_failed(&self, _error: &dyn std::error::Error, _attempt: u32) {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
            fn on_delivered(&self, _message: &Message, _attempts: u32) {
                self.delivered.fetch_add(1, Ordering::SeqCst);
            }
            fn on_exhausted(&self, _recipient: &str, _attempts: u32) {
                self.exhausted.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counts = Arc::new(Counting::default());
        let backend = Scripted::fail_times(2);
        courier(&backend)
            .with_hook(Arc::clone(&counts))
            .send("a@b.com", ContentKind::OrderReceived)
            .await
            .unwrap();

        assert_eq!(counts.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(counts.failures.load(Ordering::SeqCst), 2);
        assert_eq!(counts.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(counts.exhausted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn custom_addresses_are_stamped() {
        let backend = Scripted::always_succeed();
        courier(&backend)
            .with_addresses("orders@corp.com", "support@corp.com")
            .send("a@b.com", ContentKind::OrderReceived)
            .await
            .unwrap();

        let requests = backend.requests().await;
        assert_eq!(requests[0].sender, "orders@corp.com");
        assert_eq!(requests[0].reply_to, "support@corp.com");
    }
}
