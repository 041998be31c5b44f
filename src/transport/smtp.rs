use std::sync::Arc;

use async_trait::async_trait;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor, message::Mailbox};
use tracing_error::SpanTrace;

use crate::Message;
use crate::transport::Deliver;

/// SMTP delivery backend.
///
/// Maps a [`Message`] to an RFC 5322 message and hands it to a
/// `lettre` SMTP transport. One call is one attempt against the relay;
/// retrying on transient relay failures stays with the caller.
///
/// Addressing fields must parse as mailboxes. The crate's default reply-to
/// placeholder is not a valid address, so SMTP deployments configure a real
/// one on the [`Courier`](crate::Courier).
#[derive(Clone)]
pub struct Smtp {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Smtp {
    /// Create a backend over an already configured SMTP transport.
    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    fn compose(message: &Message) -> Result<lettre::Message, SmtpError> {
        let from: Mailbox = message.sender.parse().map_err(SmtpError::address)?;
        let reply_to: Mailbox = message.reply_to.parse().map_err(SmtpError::address)?;
        let to: Mailbox = message.to.parse().map_err(SmtpError::address)?;

        lettre::Message::builder()
            .from(from)
            .reply_to(reply_to)
            .to(to)
            .subject(&message.subject)
            .body(message.body.clone())
            .map_err(SmtpError::compose)
    }
}

#[async_trait]
impl Deliver<Message> for Smtp {
    type Error = SmtpError;

    #[tracing::instrument(skip_all, fields(message_id = %message.id, to = %message.to))]
    async fn deliver(&mut self, message: Message) -> Result<(), Self::Error> {
        let email = Self::compose(&message)?;
        self.transport.send(email).await.map_err(SmtpError::send)?;
        tracing::debug!("Message accepted by relay");
        Ok(())
    }
}

/// Error raised by the SMTP backend.
#[derive(Debug)]
pub struct SmtpError {
    context: SpanTrace,
    kind: SmtpErrorKind,
}

/// SMTP error kinds.
#[derive(Debug)]
pub enum SmtpErrorKind {
    /// An addressing field did not parse as a mailbox.
    Address(lettre::address::AddressError),
    /// The RFC 5322 message could not be built.
    Compose(lettre::error::Error),
    /// The relay rejected the message or the connection failed.
    Send(lettre::transport::smtp::Error),
}

impl SmtpError {
    fn address(err: lettre::address::AddressError) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind: SmtpErrorKind::Address(err),
        }
    }

    fn compose(err: lettre::error::Error) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind: SmtpErrorKind::Compose(err),
        }
    }

    fn send(err: lettre::transport::smtp::Error) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind: SmtpErrorKind::Send(err),
        }
    }

    /// The error kind.
    pub fn kind(&self) -> &SmtpErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for SmtpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SmtpErrorKind::Address(err) => writeln!(f, "Address error: {err}"),
            SmtpErrorKind::Compose(err) => writeln!(f, "Compose error: {err}"),
            SmtpErrorKind::Send(err) => writeln!(f, "Send error: {err}"),
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for SmtpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            SmtpErrorKind::Address(err) => Some(err),
            SmtpErrorKind::Compose(err) => Some(err),
            SmtpErrorKind::Send(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reply_to_is_rejected() {
        // "/dev/null" is a placeholder, not a mailbox.
        let msg = Message::new("a@b.com");
        let err = Smtp::compose(&msg).unwrap_err();
        assert!(matches!(err.kind(), SmtpErrorKind::Address(_)));
    }

    #[test]
    fn composes_with_real_addresses() {
        let mut msg = Message::addressed("noreply@corp.com", "support@corp.com", "a@b.com");
        msg.subject = "Order Received".into();
        msg.body = "Thank you for your order".into();
        assert!(Smtp::compose(&msg).is_ok());
    }
}
