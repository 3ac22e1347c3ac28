//! Fire-and-forget background work with an awaitable drain.
//!
//! The engine detaches work from the request/response cycle in exactly two
//! places: the image strategy's background refresh and bulk precache.
//! Detached tasks have no caller to report to; their failures are logged
//! inside the task itself. `drain()` exists so tests (and shutdown paths)
//! can deterministically await every in-flight task.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Tracks detached background tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: AtomicUsize,
    notify: Notify,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Submit detached work. Returns immediately; the task runs on the
    /// tokio runtime with no cancellation handle and no result channel.
    pub fn spawn<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = Completion(Arc::clone(self));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Number of tasks currently in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every spawned task has finished.
    pub async fn drain(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking, so a completion between the
            // check and the await cannot be missed.
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Decrements the pending count on drop, so a panicking task cannot
/// leave `drain()` waiting forever.
struct Completion(Arc<TaskQueue>);

impl Drop for Completion {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.notify.notify_waiters();
        }
    }
}
