//! Single-flight coordination of access-token refreshes
//!
//! The first caller that needs a new token becomes the leader and runs the
//! refresh. Callers arriving while it is in flight are queued and receive the
//! leader's outcome in arrival order once it settles. The lock is never held
//! across an await point.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    pending: Vec<oneshot::Sender<Option<String>>>,
}

#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    started: AtomicUsize,
}

enum Participant {
    Leader,
    Waiter(oneshot::Receiver<Option<String>>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // State stays consistent across a panic in a holder: every critical
        // section is a single push or swap.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `refresh` unless one is already in flight, in which case wait for
    /// that one. Returns the new token, or `None` if the refresh failed.
    pub async fn refresh_or_join<F, Fut>(&self, refresh: F) -> Option<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<String>>,
    {
        let participant = {
            let mut state = self.lock();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.pending.push(tx);
                log::debug!("Refresh in flight, queued request ({} waiting)", state.pending.len());
                Participant::Waiter(rx)
            } else {
                state.in_flight = true;
                Participant::Leader
            }
        };

        match participant {
            // A dropped leader releases waiters with None, so a closed
            // channel means the same thing
            Participant::Waiter(rx) => rx.await.unwrap_or(None),
            Participant::Leader => {
                self.started.fetch_add(1, Ordering::SeqCst);
                let mut flight = InFlight {
                    coordinator: self,
                    settled: false,
                };
                let token = refresh().await;
                flight.settle(token.clone());
                token
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight
    }

    /// Requests currently queued behind the in-flight refresh
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of refreshes started since creation
    pub fn refresh_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn release(&self, token: Option<String>) -> usize {
        let pending = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.pending)
        };
        let released = pending.len();
        for waiter in pending {
            // The waiter may have been dropped; nothing to do then
            let _ = waiter.send(token.clone());
        }
        released
    }
}

/// Clears the in-flight flag when the leader finishes or is dropped
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, token: Option<String>) {
        self.settled = true;
        let succeeded = token.is_some();
        let released = self.coordinator.release(token);
        log::debug!(
            "Refresh settled (success={}), released {} queued requests",
            succeeded,
            released
        );
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            log::warn!("Refresh abandoned before completion, failing queued requests");
            self.coordinator.release(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .refresh_or_join(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Some("tok2".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_deref(), Some("tok2"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.refresh_count(), 1);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_failure_is_shared_with_waiters() {
        let coordinator = RefreshCoordinator::new();
        let leader = coordinator.refresh_or_join(|| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            None
        });
        let waiter = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            coordinator
                .refresh_or_join(|| async { Some("should-not-run".to_string()) })
                .await
        };
        let (a, b) = tokio::join!(leader, waiter);
        assert_eq!(a, None);
        assert_eq!(b, None);
        assert_eq!(coordinator.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_queued_waiters_receive_leader_token() {
        let coordinator = Arc::new(RefreshCoordinator::new());

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .refresh_or_join(|| async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Some("tok".to_string())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        let mut waiters = Vec::new();
        for i in 0..3 {
            let queued = coordinator.clone();
            waiters.push(tokio::spawn(async move {
                queued.refresh_or_join(|| async { None }).await
            }));
            // Ensure each waiter is queued before the next one arrives
            while coordinator.pending_len() < i + 1 {
                tokio::task::yield_now().await;
            }
        }

        assert_eq!(leader.await.unwrap().as_deref(), Some("tok"));
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap().as_deref(), Some("tok"));
        }
        assert_eq!(coordinator.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_waiters() {
        let coordinator = Arc::new(RefreshCoordinator::new());

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .refresh_or_join(|| async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Some("never".to_string())
                    })
                    .await
            })
        };
        while !coordinator.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh_or_join(|| async { None }).await })
        };
        while coordinator.pending_len() == 0 {
            tokio::task::yield_now().await;
        }

        leader.abort();
        assert_eq!(waiter.await.unwrap(), None);
        assert!(!coordinator.is_refreshing());
    }
}
