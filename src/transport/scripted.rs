use std::sync::Arc;

use tokio::sync::Mutex;

use crate::transport::Deliver;

/// Deterministic delivery backend with a programmed outcome per attempt.
///
/// Stands in for a flaky real channel in tests: program it to fail a number
/// of leading attempts and succeed afterwards, or to fail every attempt.
/// Every request is recorded regardless of outcome, so tests can assert on
/// what each attempt carried and how many attempts were made.
pub struct Scripted<R> {
    state: Arc<Mutex<State<R>>>,
}

struct State<R> {
    remaining_failures: Option<u32>,
    attempts: u32,
    requests: Vec<R>,
}

impl<R> Scripted<R> {
    /// Fail the first `n` attempts, then succeed.
    pub fn fail_times(n: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                remaining_failures: Some(n),
                attempts: 0,
                requests: Vec::new(),
            })),
        }
    }

    /// Succeed on every attempt.
    pub fn always_succeed() -> Self {
        Self::fail_times(0)
    }

    /// Fail on every attempt.
    pub fn always_fail() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                remaining_failures: None,
                attempts: 0,
                requests: Vec::new(),
            })),
        }
    }

    /// Number of delivery attempts observed so far.
    pub async fn attempts(&self) -> u32 {
        self.state.lock().await.attempts
    }

    /// Return every request attempted so far and clear the record.
    pub async fn requests(&self) -> Vec<R> {
        let mut state = self.state.lock().await;
        std::mem::take(&mut state.requests)
    }
}

impl<R> Clone for Scripted<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait::async_trait]
impl<R> Deliver<R> for Scripted<R>
where
    R: std::fmt::Debug + Send,
{
    type Error = ScriptedError;

    #[tracing::instrument(skip_all)]
    async fn deliver(&mut self, request: R) -> Result<(), Self::Error> {
        let mut state = self.state.lock().await;
        state.attempts += 1;
        state.requests.push(request);

        match &mut state.remaining_failures {
            None => Err(ScriptedError),
            Some(0) => Ok(()),
            Some(n) => {
                *n -= 1;
                Err(ScriptedError)
            }
        }
    }
}

/// Error reported for a scripted failed attempt.
#[derive(Debug)]
pub struct ScriptedError;

impl std::fmt::Display for ScriptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scripted delivery failure")
    }
}

impl std::error::Error for ScriptedError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fails_then_succeeds() {
        let mut backend: Scripted<u32> = Scripted::fail_times(2);

        assert!(backend.deliver(1).await.is_err());
        assert!(backend.deliver(2).await.is_err());
        assert!(backend.deliver(3).await.is_ok());
        assert!(backend.deliver(4).await.is_ok());

        assert_eq!(backend.attempts().await, 4);
        assert_eq!(backend.requests().await, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn always_fails() {
        let mut backend: Scripted<u32> = Scripted::always_fail();

        for i in 0..5 {
            assert!(backend.deliver(i).await.is_err());
        }
        assert_eq!(backend.attempts().await, 5);
    }
}
