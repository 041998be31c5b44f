//! Transport abstractions and delivery backends.
//!
//! A transport attempts delivery of a notification through some channel
//! (SMTP, an in-memory queue for tests, ...). It is built around Tower's
//! `Service` abstraction so middleware (serialization, tracing, buffering)
//! composes as layers while backends stay channel-agnostic.
//!
//! ## Key components
//!
//! - [`Transport`]: public-facing wrapper implementing `tower::Service`
//! - [`DeliveryService`]: adapter from a [`Deliver`] backend to a Tower service
//! - [`Deliver`]: trait implemented by concrete backends
//! - [`TransportError`]: unified error type carrying tracing context
//!
//! One call to the transport is one delivery attempt; retrying is the
//! caller's concern (see [`Courier`](crate::Courier)).

mod inmemory;
mod scripted;

pub mod layers;

#[cfg(feature = "smtp")]
pub mod smtp;

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower::Service;
use tracing_error::SpanTrace;

pub use inmemory::InMemory;
pub use scripted::{Scripted, ScriptedError};

/// Tower-compatible transport wrapper.
///
/// `Transport` is the entry point for delivery attempts. It wraps an
/// underlying Tower `Service`, normalizes its errors into [`TransportError`],
/// and accepts middleware via [`layer`](Transport::layer).
///
/// Typically constructed from a concrete [`Deliver`] backend.
#[derive(Clone)]
pub struct Transport<S> {
    service: S,
}

impl<D> Transport<DeliveryService<D>> {
    /// Create a transport from a concrete delivery backend.
    pub fn new(backend: D) -> Self {
        Self {
            service: DeliveryService::new(backend),
        }
    }
}

impl<S> Transport<S> {
    /// Apply a Tower layer to the transport.
    pub fn layer<L>(self, layer: L) -> Transport<L::Service>
    where
        L: tower::Layer<S>,
    {
        Transport {
            service: layer.layer(self.service),
        }
    }

    /// Attempt delivery of one request through the transport.
    ///
    /// Convenience for callers that do not need the `tower::Service` API.
    /// An `Err` means this attempt failed; whether to retry is up to the
    /// caller.
    pub async fn deliver<R>(&mut self, request: R) -> Result<(), TransportError>
    where
        R: Send + 'static,
        S: Service<R> + Clone + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<tower::BoxError>,
    {
        let mut service = self.service.clone();
        service
            .call(request)
            .await
            .map_err(|e| TransportError::backend(e.into()))?;
        Ok(())
    }
}

/// `tower::Service` implementation delegating to the inner service and
/// mapping all errors into [`TransportError`].
impl<R, S> Service<R> for Transport<S>
where
    S: Service<R> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<tower::BoxError>,
    R: Send + 'static,
{
    type Response = ();
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service
            .poll_ready(cx)
            .map_err(|e| TransportError::backend(e.into()))
    }

    fn call(&mut self, req: R) -> Self::Future {
        let mut service = self.service.clone();

        Box::pin(async move {
            service
                .call(req)
                .await
                .map_err(|e| TransportError::backend(e.into()))?;
            Ok(())
        })
    }
}

/// Error returned by a delivery attempt.
///
/// Carries the underlying error kind plus a tracing span backtrace captured
/// where the error was raised.
#[derive(Debug)]
pub struct TransportError {
    context: SpanTrace,
    kind: TransportErrorKind,
}

/// Transport error kinds.
#[derive(Debug)]
pub enum TransportErrorKind {
    /// The delivery backend failed.
    Backend(tower::BoxError),
    /// A layer failed to encode or decode the request.
    Codec(tower::BoxError),
}

impl TransportError {
    /// Create a backend-related transport error.
    pub fn backend(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind: TransportErrorKind::Backend(err),
        }
    }

    /// Create an encoding-related transport error.
    pub fn codec(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self {
            context: SpanTrace::capture(),
            kind: TransportErrorKind::Codec(err),
        }
    }

    /// The error kind.
    pub fn kind(&self) -> &TransportErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TransportErrorKind::Backend(err) => writeln!(f, "Backend error: {err}"),
            TransportErrorKind::Codec(err) => writeln!(f, "Codec error: {err}"),
        }?;
        self.context.fmt(f)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            TransportErrorKind::Backend(err) => Some(err.as_ref()),
            TransportErrorKind::Codec(err) => Some(err.as_ref()),
        }
    }
}

/// Tower service adapter for a [`Deliver`] backend.
#[derive(Clone)]
pub struct DeliveryService<D> {
    backend: D,
}

impl<D> DeliveryService<D> {
    /// Wrap a backend so it can be used as a Tower service.
    pub fn new(backend: D) -> Self {
        Self { backend }
    }
}

impl<R, D> Service<R> for DeliveryService<D>
where
    R: Send + 'static,
    D: Deliver<R> + Clone + Send + 'static,
{
    type Response = ();
    type Error = tower::BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: R) -> Self::Future {
        let mut backend = self.backend.clone();
        Box::pin(async move {
            backend.deliver(req).await.map_err(Into::into)?;
            Ok(())
        })
    }
}

/// Trait implemented by concrete delivery backends.
///
/// One call is one attempt against the underlying channel. Implementations
/// must not retry internally; bounded retrying lives in the caller.
#[async_trait::async_trait]
pub trait Deliver<R> {
    /// Backend-specific error type.
    type Error: Into<tower::BoxError>;

    /// Attempt delivery of one request.
    async fn deliver(&mut self, request: R) -> Result<(), Self::Error>;
}

/// Wrapper type for raw byte payloads produced by encoding layers.
#[derive(Debug, Clone)]
pub struct RawPayload(pub(crate) Vec<u8>);

impl From<Vec<u8>> for RawPayload {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl RawPayload {
    /// View the payload as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
