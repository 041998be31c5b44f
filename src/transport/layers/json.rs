use std::{future::Future, pin::Pin};

use tower::{Layer, Service};

use crate::transport::RawPayload;

/// Tower `Service` wrapper that serializes requests to JSON.
///
/// Converts any request implementing `serde::Serialize` into a [`RawPayload`]
/// of JSON bytes before passing it to the inner service. Useful when the
/// backend carries opaque bytes (a queue, a log) rather than structured
/// notifications.
#[derive(Clone)]
pub struct JsonService<T> {
    inner: T,
}

impl<T, R> Service<R> for JsonService<T>
where
    R: serde::Serialize + Send + 'static,
    T: Service<RawPayload> + Clone + Send + 'static,
    T::Error: Into<tower::BoxError>,
    T::Future: Send + 'static,
{
    type Response = T::Response;
    type Error = tower::BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let bytes = serde_json::to_vec(&req).map_err(Box::new)?;
            inner.call(RawPayload::from(bytes)).await.map_err(Into::into)
        })
    }
}

/// Tower `Layer` that applies [`JsonService`] to a service stack.
pub struct JsonLayer;

impl<S> Layer<S> for JsonLayer {
    type Service = JsonService<S>;

    fn layer(&self, service: S) -> Self::Service {
        JsonService { inner: service }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemory;
    use crate::{Message, Transport};

    #[tokio::test]
    async fn serializes_messages_for_byte_backends() {
        let backend: InMemory<RawPayload> = InMemory::default();
        let mut transport = Transport::new(backend.clone()).layer(JsonLayer);

        let msg = Message::new("a@b.com");
        transport.deliver(msg.clone()).await.unwrap();

        let delivered = backend.delivered().await;
        assert_eq!(delivered.len(), 1);

        let decoded: Message = serde_json::from_slice(delivered[0].as_bytes()).unwrap();
        assert_eq!(decoded, msg);
    }
}
