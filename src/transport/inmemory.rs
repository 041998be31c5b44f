use std::sync::Arc;

use tokio::sync::Mutex;

use crate::transport::Deliver;

/// In-memory delivery backend for testing or local pipelines.
///
/// Every request is appended to a shared queue and reported as delivered.
/// Useful for:
/// - Unit and integration testing
/// - Exercising composition without a real channel
/// - Debugging what would have been sent
pub struct InMemory<R> {
    delivered: Arc<Mutex<Vec<R>>>,
}

impl<R> InMemory<R> {
    /// Return everything that has been "delivered" and clear the queue.
    ///
    /// Consumes the backend; primarily intended for assertions in tests.
    pub async fn delivered(self) -> Vec<R> {
        let mut queue = self.delivered.lock_owned().await;
        std::mem::take(&mut *queue)
    }
}

impl<R> Clone for InMemory<R> {
    fn clone(&self) -> Self {
        Self {
            delivered: Arc::clone(&self.delivered),
        }
    }
}

impl<R> Default for InMemory<R> {
    fn default() -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait::async_trait]
impl<R> Deliver<R> for InMemory<R>
where
    R: std::fmt::Debug + Send,
{
    type Error = std::io::Error;

    /// "Deliver" by appending the request to the in-memory queue.
    #[tracing::instrument(skip_all)]
    async fn deliver(&mut self, request: R) -> Result<(), Self::Error> {
        tracing::info!(?request, "Delivered to in-memory queue");
        let mut queue = self.delivered.lock().await;
        queue.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, Transport};

    #[tokio::test]
    async fn records_delivered_requests() {
        let backend: InMemory<Message> = InMemory::default();
        let mut transport = Transport::new(backend.clone());

        let msg = Message::new("a@b.com");
        transport.deliver(msg.clone()).await.unwrap();

        assert_eq!(backend.delivered().await, vec![msg]);
    }
}
