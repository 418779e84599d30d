use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio_cron_scheduler::JobScheduler;

use crate::{dom::NodeId, infrastructure::heartbeat::Heartbeats};

/// State scoped to one page: the dedup ledger, the processed counter and the
/// diagnostic heartbeats. The ledger only grows.
pub struct SessionContext {
    submitted: Mutex<HashSet<NodeId>>,
    processed: Arc<AtomicU64>,
    heartbeats: Heartbeats,
}

impl SessionContext {
    pub fn new(scheduler: JobScheduler, heartbeat_interval: Duration) -> Self {
        let processed = Arc::new(AtomicU64::new(0));
        Self {
            submitted: Mutex::new(HashSet::new()),
            heartbeats: Heartbeats::new(scheduler, heartbeat_interval, processed.clone()),
            processed,
        }
    }

    /// Records `anchor` in the ledger. Returns false when it was already
    /// there; check and insert happen under one lock.
    pub fn mark_submitted(&self, anchor: NodeId) -> bool {
        if !self.submitted.lock().insert(anchor) {
            return false;
        }
        self.processed.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn heartbeat(&self, label: &str) -> bool {
        self.heartbeats.start(label)
    }
}
