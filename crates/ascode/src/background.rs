//! Bounded runner for detached tasks.
//!
//! Tasks are gated by a semaphore and tracked for graceful shutdown. Each
//! task body runs in its own tokio task so a panic is caught at the join
//! boundary and logged instead of reaching the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

pub const DEFAULT_MAX_TASKS: usize = 32;

#[derive(Clone)]
pub struct BackgroundRunner {
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl BackgroundRunner {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Run `task` in the background. Failures never propagate.
    pub fn spawn<F>(&self, name: String, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        self.tracker.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                tracing::warn!(task = %name, "Background runner closed, task dropped");
                return;
            };
            match tokio::spawn(task).await {
                Ok(()) => tracing::debug!(task = %name, "Background task finished"),
                Err(e) if e.is_panic() => {
                    tracing::error!(task = %name, error = %e, "Background task panicked");
                }
                Err(e) => tracing::warn!(task = %name, error = %e, "Background task cancelled"),
            }
        });
    }

    /// Tasks spawned and not yet finished.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every task spawned so far, then accept new ones again.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting work and wait up to `timeout` for running tasks.
    /// Returns `false` when tasks were still running at the deadline.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        self.semaphore.close();
        tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok()
    }
}

impl Default for BackgroundRunner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TASKS)
    }
}
