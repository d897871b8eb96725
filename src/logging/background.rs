//! Tracked background work
//!
//! Fire-and-forget jobs (the retention sweep after initialization) run as
//! tokio tasks registered here, so a panic is reported instead of lost and
//! tests can wait for the work to finish.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

/// Registry of spawned background tasks
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current runtime and keep its handle
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.retain(|(_, h)| !h.is_finished());
        handles.push((name, handle));
    }

    /// Number of tasks that have not finished yet
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(_, h)| !h.is_finished())
            .count()
    }

    /// Wait until every task spawned so far, and any they spawn, has finished
    pub async fn wait_idle(&self) {
        loop {
            let drained: Vec<_> = {
                let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
                handles.drain(..).collect()
            };
            if drained.is_empty() {
                return;
            }
            for (name, handle) in drained {
                if let Err(e) = handle.await {
                    tracing::warn!(task = name, error = %e, "Background task failed");
                }
            }
        }
    }
}
