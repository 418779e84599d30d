use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinHandle, JoinSet},
};

use crate::{
    dom::Document,
    domain::{DisplayMode, Verdict},
    feed::{scanner::PostJob, FeedPlatform},
    guard::{suppressor::suppress, ClassificationEngine, StatsRecorder},
    infrastructure::shutdown::ShutdownListener,
    store::Preferences,
    tasks::queue::PostQueue,
};

/// Drains the post queue and runs each post's pipeline as its own task. A
/// semaphore caps how many pipelines, and so remote calls, run at once.
pub struct PostProcessor {
    queue: Arc<PostQueue<PostJob>>,
    doc: Document,
    feed: Arc<dyn FeedPlatform>,
    engine: Arc<ClassificationEngine>,
    stats: Arc<StatsRecorder>,
    prefs: Preferences,
    limiter: Arc<Semaphore>,
}

impl PostProcessor {
    pub fn new(
        queue: Arc<PostQueue<PostJob>>,
        doc: Document,
        feed: Arc<dyn FeedPlatform>,
        engine: Arc<ClassificationEngine>,
        prefs: Preferences,
        max_in_flight: usize,
    ) -> Self {
        Self {
            queue,
            doc,
            feed,
            engine,
            stats: Arc::new(StatsRecorder::new(prefs.clone())),
            prefs,
            limiter: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    pub fn spawn(self: Arc<Self>, mut shutdown: ShutdownListener) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(err) = self.run_loop(&mut shutdown).await {
                tracing::error!(target: "processor", error = %err, "post processor crashed");
            }
        })
    }

    async fn run_loop(self: &Arc<Self>, shutdown: &mut ShutdownListener) -> Result<()> {
        let mut in_flight = JoinSet::new();

        'outer: loop {
            if shutdown.is_triggered() {
                break;
            }

            let batch = self.queue.drain_ordered();
            if batch.is_empty() {
                tokio::select! {
                    _ = self.queue.notified() => {}
                    Some(res) = in_flight.join_next(), if !in_flight.is_empty() => log_join(res),
                    _ = shutdown.notified() => break,
                }
                continue;
            }

            tracing::debug!(target: "processor", total = batch.len(), "dispatching posts");
            for job in batch {
                let permit = tokio::select! {
                    permit = self.limiter.clone().acquire_owned() => {
                        permit.context("worker limiter closed")?
                    }
                    _ = shutdown.notified() => {
                        tracing::info!(
                            target: "processor",
                            "shutdown requested while dispatching; dropping remaining posts"
                        );
                        break 'outer;
                    }
                };
                let this = self.clone();
                let done = self.queue.completion();
                in_flight.spawn(async move {
                    let _permit = permit;
                    let _done = done;
                    this.handle_job(job).await;
                });
                while let Some(res) = in_flight.try_join_next() {
                    log_join(res);
                }
            }
        }

        while let Some(res) = in_flight.join_next().await {
            log_join(res);
        }
        tracing::info!(target: "processor", "post processor stopped");
        Ok(())
    }

    async fn handle_job(&self, job: PostJob) {
        let verdict = self.engine.classify(&job.record).await;
        if verdict.is_cringe {
            self.apply_verdict(&job, &verdict).await;
        }
    }

    async fn apply_verdict(&self, job: &PostJob, verdict: &Verdict) {
        let mode = match self.prefs.display_mode().await {
            Ok(mode) => mode,
            Err(err) => {
                tracing::warn!(target: "processor", error = %err, "failed to read display mode");
                DisplayMode::default()
            }
        };

        // Read before decorating so the overlay text is not counted.
        let post_text = self.doc.inner_text(job.post);
        let outcome = suppress(
            &self.doc,
            self.feed.as_ref(),
            job.post,
            mode,
            verdict.reason.as_deref(),
        );
        if !outcome.is_new() {
            return;
        }

        tracing::info!(
            target: "processor",
            platform = %job.record.platform,
            actor = %job.record.actor_name,
            reason = verdict.reason.as_deref().unwrap_or("-"),
            mode = %mode,
            "post suppressed"
        );
        if let Err(err) = self.stats.record_suppression(&post_text).await {
            tracing::error!(target: "processor", error = %err, "failed to record stats");
        }
    }
}

fn log_join(res: Result<(), JoinError>) {
    if let Err(err) = res {
        if err.is_panic() {
            tracing::error!(target: "processor", "post pipeline panicked");
        }
    }
}
