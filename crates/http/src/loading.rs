//! Outstanding-request counter.

use std::sync::Arc;

use tokio::sync::watch;

/// Counts dispatches in flight; observers subscribe to changes.
#[derive(Debug, Clone)]
pub struct LoadingTracker {
    count: Arc<watch::Sender<usize>>,
}

impl Default for LoadingTracker {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { count: Arc::new(tx) }
    }
}

impl LoadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one dispatch until the returned guard is dropped.
    pub fn begin(&self) -> LoadingGuard {
        self.count.send_modify(|c| *c += 1);
        LoadingGuard {
            count: self.count.clone(),
        }
    }

    pub fn outstanding(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.outstanding() > 0
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }
}

/// Decrements the counter exactly once, on drop.
///
/// Drop runs on success, error and cancellation alike.
#[derive(Debug)]
#[must_use = "the request stops being counted when the guard is dropped"]
pub struct LoadingGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.count.send_modify(|c| *c = c.saturating_sub(1));
    }
}
