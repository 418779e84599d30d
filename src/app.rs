use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use tokio::{
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_cron_scheduler::JobScheduler;

use crate::{
    ai::RemoteClassifier,
    config::{AppConfig, PreferenceSeed},
    db::{self, preferences::SqlitePreferenceStore},
    dom::Document,
    domain::Platform,
    feed::{
        self,
        replay::{self, PageReplay},
        scanner::{FeedScanner, PostJob},
    },
    guard::{ClassificationEngine, SessionContext},
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    store::Preferences,
    tasks::{processor::PostProcessor, queue::PostQueue},
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_POLL: Duration = Duration::from_millis(100);

pub struct FeedGuardApp {
    config: Arc<AppConfig>,
    doc: Document,
    platform: Option<Platform>,
    prefs: Preferences,
    store: Arc<SqlitePreferenceStore>,
    classifier: Arc<RemoteClassifier>,
    scheduler: JobScheduler,
    shutdown: Shutdown,
}

impl FeedGuardApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pool = db::init_pool(&paths.db_path).await?;
        let store = Arc::new(SqlitePreferenceStore::new(pool));
        let prefs = Preferences::new(store.clone());
        apply_seed(&prefs, &config.seed).await?;

        let http_client = Client::builder()
            .user_agent(format!("cringe-guard-rust/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let classifier = Arc::new(RemoteClassifier::new(
            http_client,
            config.classifier.clone(),
        ));

        let doc = replay::load_page(&config.page.html_path).await?;
        let platform = Platform::from_page_url(&config.page.url);
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            config,
            doc,
            platform,
            prefs,
            store,
            classifier,
            scheduler,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let FeedGuardApp {
            config,
            doc,
            platform,
            prefs,
            store,
            classifier,
            mut scheduler,
            shutdown,
        } = self;

        tracing::info!(url = %config.page.url, "cringe guard starting");

        let Some(platform) = platform else {
            tracing::warn!(url = %config.page.url, "page is not a supported feed; nothing to do");
            return finish(&config, &doc, &prefs, &store, 0).await;
        };
        let api_key = prefs.api_key_if_enabled().await.unwrap_or_else(|err| {
            tracing::warn!(target: "store", error = %err, "failed to read credential");
            None
        });
        if api_key.is_none() {
            return finish(&config, &doc, &prefs, &store, 0).await;
        }

        let session = Arc::new(SessionContext::new(
            scheduler.clone(),
            config.pipeline.heartbeat_interval,
        ));
        session.heartbeat("init");
        scheduler.start().await?;

        let feed = feed::for_platform(platform);
        let queue = Arc::new(PostQueue::<PostJob>::new());
        let engine = Arc::new(ClassificationEngine::new(prefs.clone(), classifier));
        let processor = Arc::new(PostProcessor::new(
            queue.clone(),
            doc.clone(),
            feed.clone(),
            engine,
            prefs.clone(),
            config.pipeline.max_in_flight,
        ));
        let processor_handle = processor.spawn(shutdown.subscribe());

        let scanner = Arc::new(FeedScanner::new(
            doc.clone(),
            feed,
            session.clone(),
            queue.clone(),
        ));
        let queued = scanner.scan_existing();
        tracing::info!(%platform, queued, "initial feed scan complete");
        let observer_handle = scanner.spawn_observer(shutdown.subscribe())?;

        let mut replay = PageReplay::new(doc.clone(), config.page.scroll_interval);
        if let Some(dir) = &config.page.scroll_dir {
            replay = replay.load_dir(dir).await?;
            if replay.is_empty() {
                tracing::warn!(target: "replay", dir = %dir.display(), "no scroll fragments to replay");
            }
        }
        let mut replay_handle = tokio::spawn(replay.run(shutdown.subscribe()));
        let mut replay_done = false;

        let mut shutdown_listener = shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_listener.notified() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
                res = &mut replay_handle, if !replay_done => {
                    replay_done = true;
                    if let Err(err) = res {
                        tracing::error!(target: "replay", error = %err, "scroll replay task failed");
                    }
                }
                _ = sleep(IDLE_POLL) => {}
            }

            // Under the single-threaded runtime nothing runs between these
            // reads, so all three together mean no work is left anywhere.
            if config.page.exit_when_idle
                && replay_done
                && doc.pending_mutation_batches() == 0
                && queue.is_idle()
            {
                tracing::info!(snapshot = ?queue.snapshot(), "feed drained; stopping");
                break;
            }
        }

        shutdown.trigger();

        join_within("processor", processor_handle).await;
        join_within("scanner", observer_handle).await;
        if !replay_done {
            join_within("replay", replay_handle).await;
        }

        match timeout(SHUTDOWN_TIMEOUT, scheduler.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(target: "heartbeat", ?err, "scheduler shutdown failed");
            }
            Err(_) => {
                tracing::warn!(
                    target: "heartbeat",
                    "scheduler did not stop within {:?}",
                    SHUTDOWN_TIMEOUT
                );
            }
        }

        finish(&config, &doc, &prefs, &store, session.processed_count()).await
    }
}

/// Writes the processed page, reports totals and releases the store.
async fn finish(
    config: &AppConfig,
    doc: &Document,
    prefs: &Preferences,
    store: &SqlitePreferenceStore,
    processed: u64,
) -> Result<()> {
    let written = match &config.page.output_path {
        Some(path) => {
            replay::write_page(doc, path).await?;
            tracing::info!(path = %path.display(), "processed page written");
            true
        }
        None => false,
    };

    match prefs.stats().await {
        Ok(stats) => tracing::info!(
            target: "stats",
            processed,
            cringe_count = stats.cringe_count,
            minutes_saved = stats.time_saved_in_minutes,
            written,
            "session finished"
        ),
        Err(err) => tracing::warn!(target: "stats", error = %err, "failed to read stats"),
    }

    if timeout(SHUTDOWN_TIMEOUT, store.close()).await.is_err() {
        tracing::warn!(
            target: "store",
            "preference store did not close within {:?}",
            SHUTDOWN_TIMEOUT
        );
    }
    Ok(())
}

async fn join_within<T>(name: &'static str, mut handle: JoinHandle<T>) {
    let wait = sleep(SHUTDOWN_TIMEOUT);
    tokio::pin!(wait);
    tokio::select! {
        res = &mut handle => {
            if let Err(err) = res {
                if err.is_panic() {
                    tracing::error!(task = name, "task panicked");
                }
            }
        }
        _ = &mut wait => {
            tracing::warn!(
                task = name,
                "task did not stop within {:?}; aborting",
                SHUTDOWN_TIMEOUT
            );
            handle.abort();
        }
    }
}

/// Writes configured settings into the store before anything reads them.
/// A seeded credential switches the guard on unless told otherwise.
async fn apply_seed(prefs: &Preferences, seed: &PreferenceSeed) -> Result<()> {
    let mut seeded_key = false;
    if let Some(api_key) = &seed.api_key {
        seeded_key = prefs.save_api_key(api_key).await?;
    }
    match seed.enabled {
        Some(enabled) => prefs.set_enabled(enabled).await?,
        None if seeded_key => prefs.set_enabled(true).await?,
        None => {}
    }

    if !seed.muted_words.is_empty() {
        prefs.clear_muted_words().await?;
        for word in &seed.muted_words {
            if !prefs.add_muted_word(word).await? {
                tracing::warn!(target: "store", word = %word, "muted word not seeded");
            }
        }
    }
    if let Some(mode) = seed.display_mode {
        prefs.set_display_mode(mode).await?;
    }
    if let Some(prompt) = &seed.custom_prompt {
        if !prefs.save_custom_prompt(prompt).await? {
            tracing::warn!(
                target: "store",
                "custom prompt ignored; it needs at least five words"
            );
        }
    }
    Ok(())
}
