//! Best-effort write-back of assignment changes.
//!
//! The local ledger is the session's source of truth. Writes are queued on a
//! background channel, attempted once each, and never waited on or rolled back;
//! the remote store catches up eventually or not at all.

use super::store::{SaveRequest, TaskStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinHandle, JoinSet};

/// Where the board sends ownership changes. Must not block.
pub trait AssignmentSink {
    /// An empty `driver_name` clears the assignment.
    fn save(&self, task_id: &str, driver_name: &str);
}

impl<T: AssignmentSink + ?Sized> AssignmentSink for Arc<T> {
    fn save(&self, task_id: &str, driver_name: &str) {
        (**self).save(task_id, driver_name)
    }
}

pub struct Relay {
    sender: Mutex<Option<UnboundedSender<SaveRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    issued: AtomicUsize,
}

impl Relay {
    /// Starts the dispatcher. Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn TaskStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(dispatch(rx, store));
        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            issued: AtomicUsize::new(0),
        }
    }

    /// Number of write-backs handed to the dispatcher so far.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::Relaxed)
    }

    /// Stops accepting writes and gives in-flight ones up to `grace` to finish.
    /// Anything still pending afterwards is abandoned.
    pub async fn settle(&self, grace: Duration) {
        drop(self.sender.lock().unwrap_or_else(|e| e.into_inner()).take());
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut worker) = worker {
            if tokio::time::timeout(grace, &mut worker).await.is_err() {
                log::warn!("[RELAY] Abandoning write-backs still in flight after {:?}", grace);
                worker.abort();
            }
        }
    }

    /// Leaves the view: drops queued and in-flight writes without waiting.
    pub fn close(&self) {
        drop(self.sender.lock().unwrap_or_else(|e| e.into_inner()).take());
        if let Some(worker) = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take() {
            worker.abort();
        }
    }
}

impl AssignmentSink for Relay {
    fn save(&self, task_id: &str, driver_name: &str) {
        let request = SaveRequest {
            id: task_id.to_string(),
            assigned_driver: driver_name.to_string(),
        };
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref().map(|tx| tx.send(request)) {
            Some(Ok(())) => {
                self.issued.fetch_add(1, Ordering::Relaxed);
            }
            _ => log::warn!("[RELAY] Relay closed, dropping write-back for {}", task_id),
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.close();
    }
}

/// One spawned task per request; no ordering between them.
async fn dispatch(mut rx: UnboundedReceiver<SaveRequest>, store: Arc<dyn TaskStore>) {
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(request) => {
                    let store = Arc::clone(&store);
                    in_flight.spawn(async move { write_back(store.as_ref(), request).await });
                }
                None => break,
            },
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }
    while in_flight.join_next().await.is_some() {}
}

async fn write_back(store: &dyn TaskStore, request: SaveRequest) {
    match store.save_assignment(&request).await {
        Ok(()) => log::debug!(
            "[RELAY] Saved {} -> \"{}\"",
            request.id,
            request.assigned_driver
        ),
        Err(e) => log::warn!(
            "[RELAY] Write-back for {} failed, local state kept: {}",
            request.id,
            e
        ),
    }
}
