//! Single-slot handle for the most recent request of one kind.

use crate::error::ClientError;
use std::future::Future;
use tokio::task::JoinHandle;

/// Holds at most one in-flight request. Issuing a new one aborts the old one,
/// so a stale response can never be applied after a newer request was made.
///
/// Dropping the slot aborts whatever it holds.
pub struct LatestRequest<T> {
    handle: Option<JoinHandle<Result<T, ClientError>>>,
    issued: u64,
}

impl<T> Default for LatestRequest<T> {
    fn default() -> Self {
        Self {
            handle: None,
            issued: 0,
        }
    }
}

impl<T: Send + 'static> LatestRequest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the current request, then spawn `request` in its place.
    pub fn issue<F>(&mut self, request: F)
    where
        F: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        if self.cancel() {
            tracing::debug!(issued = self.issued, "Superseded in-flight request");
        }
        self.handle = Some(tokio::spawn(request));
        self.issued += 1;
    }

    /// Abort the current request. Returns whether one was still running.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                running
            }
            None => false,
        }
    }

    /// True while a request has been issued and not yet awaited.
    pub fn is_issued(&self) -> bool {
        self.handle.is_some()
    }

    /// Number of requests issued over the slot's lifetime.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Await the current request and empty the slot.
    pub async fn wait(&mut self) -> Result<T, ClientError> {
        let handle = self.handle.take().ok_or(ClientError::Cancelled)?;
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ClientError::Cancelled),
        }
    }
}

impl<T> Drop for LatestRequest<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn issue_replaces_and_aborts_previous() {
        let completed = Arc::new(AtomicUsize::new(0));
        let mut slot = LatestRequest::new();

        let c = completed.clone();
        slot.issue(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            c.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        });
        let c = completed.clone();
        slot.issue(async move {
            c.fetch_add(10, Ordering::SeqCst);
            Ok(2)
        });

        assert_eq!(slot.wait().await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 10);
        assert_eq!(slot.issued(), 2);
    }

    #[tokio::test]
    async fn wait_on_empty_slot_is_cancelled() {
        let mut slot: LatestRequest<u32> = LatestRequest::new();
        assert!(matches!(slot.wait().await, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_empties_the_slot() {
        let mut slot = LatestRequest::new();
        slot.issue(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        assert!(slot.is_issued());
        assert!(slot.cancel());
        assert!(!slot.is_issued());
        assert!(matches!(slot.wait().await, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn request_errors_pass_through() {
        let mut slot: LatestRequest<u32> = LatestRequest::new();
        slot.issue(async { Err(ClientError::QueryTimeout) });
        assert!(matches!(slot.wait().await, Err(ClientError::QueryTimeout)));
    }
}
