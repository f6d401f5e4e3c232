//! Bot lifecycle: one cancellation scope owning every task a bot spawns.
//!
//! The event channel session, its event deliveries and post-send
//! notifications run as children of this scope. Cancelling the scope stops
//! all of them; a fatal error recorded with [`Lifecycle::fail`] cancels the
//! scope too and is reported by [`Lifecycle::join`].

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::error::BotError;

pub(crate) struct Lifecycle {
    token: CancellationToken,
    tasks: TaskTracker,
    failure: Mutex<Option<Arc<BotError>>>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: TaskTracker::new(),
            failure: Mutex::new(None),
        }
    }

    /// Token cancelled when the bot terminates.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawns a task tied to this scope.
    ///
    /// The task is awaited by [`join`](Self::join) but not aborted on
    /// cancellation; long-running tasks must watch [`token`](Self::token).
    pub(crate) fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(task)
    }

    /// Records a fatal error and cancels the scope. The first error wins.
    pub(crate) fn fail(&self, err: BotError) {
        {
            let mut failure = self.failure.lock();
            if failure.is_none() {
                error!(error = %err, "Bot terminated by a fatal error");
                *failure = Some(Arc::new(err));
            } else {
                debug!(error = %err, "Ignoring fatal error, bot already failed");
            }
        }
        self.token.cancel();
    }

    /// Cancels the scope. Idempotent.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    pub(crate) fn failure(&self) -> Option<Arc<BotError>> {
        self.failure.lock().clone()
    }

    /// Waits until the scope is cancelled and every spawned task finished.
    pub(crate) async fn join(&self) -> Result<(), Arc<BotError>> {
        self.token.cancelled().await;
        self.tasks.close();
        self.tasks.wait().await;
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_first_failure_wins() {
        let lifecycle = Lifecycle::new();
        lifecycle.fail(BotError::Config("first".into()));
        lifecycle.fail(BotError::Config("second".into()));

        assert!(lifecycle.is_cancelled());
        let err = lifecycle.join().await.unwrap_err();
        assert!(err.to_string().contains("first"));
    }

    #[tokio::test]
    async fn test_join_waits_for_spawned_tasks() {
        let lifecycle = Arc::new(Lifecycle::new());
        let finished = Arc::new(AtomicBool::new(false));

        let token = lifecycle.token().clone();
        let flag = finished.clone();
        lifecycle.spawn(async move {
            token.cancelled().await;
            tokio::task::yield_now().await;
            flag.store(true, Ordering::SeqCst);
        });

        lifecycle.cancel();
        lifecycle.cancel();
        assert!(lifecycle.join().await.is_ok());
        assert!(finished.load(Ordering::SeqCst));
    }
}
