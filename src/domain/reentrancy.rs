//! Ordering lock and re-entry detection shared by every guarded entry point.
//!
//! Top-level state-changing calls are totally ordered through one fair async
//! mutex: an unrelated caller that arrives while a batch is running waits its
//! turn. Guarded calls additionally mark the running task, so a collaborator
//! that calls back into a guarded entry point from inside the call is refused
//! with [`FactoryError::ReentrantCall`] instead of queueing behind the lock
//! its own caller holds.
//!
//! Re-entry is tracked per task. A collaborator that hands its callback to a
//! different task and waits for it will deadlock.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::error::FactoryError;

static NEXT_GUARD_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    /// Guards whose guarded scope the current task is inside.
    static ENTERED: Vec<u64>;
}

/// Ordering lock plus re-entry detector.
///
/// Cloning yields another handle to the same lock.
#[derive(Debug, Clone)]
pub struct ReentrancyGuard {
    order: Arc<Mutex<()>>,
    id: u64,
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ReentrancyGuard {
    /// Creates an unlocked guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Arc::new(Mutex::new(())),
            id: NEXT_GUARD_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns `true` if the current task is inside a guarded call of this
    /// guard.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        ENTERED
            .try_with(|held| held.contains(&self.id))
            .unwrap_or(false)
    }

    /// Runs `call` as a guarded operation: after every earlier operation
    /// finished, with the current task marked as inside the guard.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::ReentrantCall`] without running `call` if the
    /// current task is already inside a guarded call; otherwise whatever
    /// `call` returns.
    pub async fn guarded<T, F>(&self, call: F) -> Result<T, FactoryError>
    where
        F: Future<Output = Result<T, FactoryError>>,
    {
        if self.is_entered() {
            return Err(FactoryError::ReentrantCall);
        }
        let _turn = self.order.lock().await;
        let mut held = ENTERED.try_with(Clone::clone).unwrap_or_default();
        held.push(self.id);
        ENTERED.scope(held, call).await
    }

    /// Runs `call` in order with every other operation.
    ///
    /// Unguarded mutations are never refused. Called from inside a guarded
    /// call they run immediately, since the lock is already held by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns whatever `call` returns.
    pub async fn ordered<T, F>(&self, call: F) -> Result<T, FactoryError>
    where
        F: Future<Output = Result<T, FactoryError>>,
    {
        if self.is_entered() {
            return call.await;
        }
        let _turn = self.order.lock().await;
        call.await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn nested_guarded_call_is_refused() {
        let guard = ReentrancyGuard::new();
        assert!(!guard.is_entered());
        let inner = guard
            .guarded(async {
                assert!(guard.is_entered());
                Ok(guard.guarded(async { Ok(()) }).await)
            })
            .await;
        assert!(matches!(inner, Ok(Err(FactoryError::ReentrantCall))));
        assert!(!guard.is_entered());
        assert!(guard.guarded(async { Ok(()) }).await.is_ok());
    }

    #[tokio::test]
    async fn ordered_call_inside_guarded_runs_immediately() {
        let guard = ReentrancyGuard::new();
        let result = guard
            .guarded(async { guard.ordered(async { Ok(7) }).await })
            .await;
        assert_eq!(result.ok(), Some(7));
    }

    #[tokio::test]
    async fn independent_caller_waits_its_turn() {
        let guard = ReentrancyGuard::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let (entered_tx, entered_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = tokio::spawn({
            let guard = guard.clone();
            let log = Arc::clone(&log);
            async move {
                guard
                    .guarded(async {
                        let _ = entered_tx.send(());
                        let _ = release_rx.await;
                        log.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push("first");
                        Ok(())
                    })
                    .await
            }
        });
        let Ok(()) = entered_rx.await else {
            panic!("first call never started");
        };

        let second = tokio::spawn({
            let guard = guard.clone();
            let log = Arc::clone(&log);
            async move {
                guard
                    .guarded(async {
                        log.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push("second");
                        Ok(())
                    })
                    .await
            }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!second.is_finished());

        let _ = release_tx.send(());
        assert!(matches!(first.await, Ok(Ok(()))));
        assert!(matches!(second.await, Ok(Ok(()))));
        let log = log.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
        assert_eq!(log, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn separate_guards_do_not_interfere() {
        let a = ReentrancyGuard::new();
        let b = ReentrancyGuard::new();
        let result = a.guarded(async { b.guarded(async { Ok(()) }).await }).await;
        assert!(result.is_ok());
    }
}
