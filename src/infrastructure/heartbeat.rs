use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use parking_lot::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Diagnostic timers keyed by label. Each label gets at most one repeating
/// job, which lives until the scheduler shuts down.
pub struct Heartbeats {
    scheduler: JobScheduler,
    interval: Duration,
    processed: Arc<AtomicU64>,
    started: Mutex<HashSet<String>>,
}

impl Heartbeats {
    pub fn new(scheduler: JobScheduler, interval: Duration, processed: Arc<AtomicU64>) -> Self {
        Self {
            scheduler,
            interval,
            processed,
            started: Mutex::new(HashSet::new()),
        }
    }

    /// Registers the heartbeat for `label`. Returns false when one is
    /// already running.
    pub fn start(&self, label: &str) -> bool {
        if !self.started.lock().insert(label.to_string()) {
            return false;
        }

        let job_label = label.to_string();
        let processed = self.processed.clone();
        let job = Job::new_repeated_async(self.interval, move |_id, _scheduler| {
            let label = job_label.clone();
            let processed = processed.clone();
            Box::pin(async move {
                tracing::info!(
                    target: "heartbeat",
                    label = %label,
                    ts = Utc::now().timestamp_millis(),
                    processed_count = processed.load(Ordering::Relaxed),
                    "heartbeat"
                );
            })
        });
        let job = match job {
            Ok(job) => job,
            Err(err) => {
                tracing::error!(target: "heartbeat", label, error = %err, "failed to build heartbeat job");
                return false;
            }
        };

        let scheduler = self.scheduler.clone();
        let label = label.to_string();
        tokio::spawn(async move {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(target: "heartbeat", label = %label, error = %err, "failed to register heartbeat");
            }
        });
        true
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.started.lock().iter().cloned().collect();
        labels.sort();
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn each_label_starts_once() {
        let scheduler = JobScheduler::new().await.unwrap();
        let heartbeats = Heartbeats::new(
            scheduler,
            Duration::from_secs(10),
            Arc::new(AtomicU64::new(0)),
        );

        assert!(heartbeats.start("scan"));
        assert!(!heartbeats.start("scan"));
        assert!(heartbeats.start("observer"));
        assert_eq!(heartbeats.labels(), vec!["observer".to_string(), "scan".to_string()]);
    }
}
