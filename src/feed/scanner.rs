use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::{
    dom::{Document, NodeId},
    domain::PostRecord,
    guard::SessionContext,
    infrastructure::shutdown::ShutdownListener,
    tasks::queue::PostQueue,
};

use super::FeedPlatform;

/// A discovered post and the fields read from it at discovery time.
#[derive(Debug, Clone)]
pub struct PostJob {
    pub post: NodeId,
    pub record: PostRecord,
}

pub struct FeedScanner {
    doc: Document,
    feed: Arc<dyn FeedPlatform>,
    session: Arc<SessionContext>,
    queue: Arc<PostQueue<PostJob>>,
}

impl FeedScanner {
    pub fn new(
        doc: Document,
        feed: Arc<dyn FeedPlatform>,
        session: Arc<SessionContext>,
        queue: Arc<PostQueue<PostJob>>,
    ) -> Self {
        Self {
            doc,
            feed,
            session,
            queue,
        }
    }

    /// One pass over the posts already on the page. Returns how many were
    /// queued.
    pub fn scan_existing(&self) -> usize {
        self.session.heartbeat("scan");
        let posts = self
            .doc
            .query_selector_all(self.doc.root(), self.feed.post_selector());
        if posts.is_empty() {
            tracing::warn!(
                target: "scanner",
                platform = %self.feed.platform(),
                "no posts found on initial scan"
            );
            return 0;
        }
        tracing::info!(target: "scanner", found = posts.len(), "initial scan");
        posts.into_iter().filter(|post| self.submit(*post)).count()
    }

    /// Feeds one post root into the pipeline. Posts without a body anchor and
    /// anchors already in the ledger are dropped.
    pub fn submit(&self, post: NodeId) -> bool {
        self.session.heartbeat("process");
        let Some(anchor) = self.feed.locate_anchor(&self.doc, post) else {
            return false;
        };
        if !self.session.mark_submitted(anchor) {
            tracing::trace!(target: "scanner", ?anchor, "post already submitted");
            return false;
        }

        let record = self.feed.extract_record(&self.doc, post, anchor);
        tracing::debug!(
            target: "scanner",
            processed = self.session.processed_count(),
            actor = %record.actor_name,
            "post queued"
        );
        self.queue.push(PostJob { post, record });
        true
    }

    /// Watches the body for inserted nodes and submits every post found
    /// beneath them. The subscription is live before this returns.
    pub fn spawn_observer(
        self: Arc<Self>,
        mut shutdown: ShutdownListener,
    ) -> Result<JoinHandle<()>> {
        let body = self.doc.body().context("page has no <body> to observe")?;
        self.session.heartbeat("observer");
        let mut subscription = self.doc.observe(body);

        Ok(tokio::spawn(async move {
            loop {
                let batch = tokio::select! {
                    batch = subscription.next_batch() => batch,
                    _ = shutdown.notified() => break,
                };
                let Some(batch) = batch else { break };

                let mut queued = 0usize;
                for node in batch.added {
                    if !self.doc.is_element(node) {
                        continue;
                    }
                    for post in self
                        .doc
                        .query_selector_all(node, self.feed.post_selector())
                    {
                        if self.submit(post) {
                            queued += 1;
                        }
                    }
                }
                if queued > 0 {
                    tracing::debug!(target: "scanner", queued, "posts queued from mutation batch");
                }
            }
            tracing::info!(target: "scanner", "feed observer stopped");
        }))
    }
}
