use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::domain::types::QueueSnapshot;

/// FIFO hand-off between the scanner and the processor. `outstanding` counts
/// items pushed but not yet completed, whether still queued or in flight.
#[derive(Debug)]
pub struct PostQueue<T> {
    items: Mutex<VecDeque<T>>,
    notify: Notify,
    outstanding: AtomicUsize,
}

impl<T> Default for PostQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PostQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            outstanding: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, value: T) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.items.lock().push_back(value);
        self.notify.notify_one();
    }

    pub fn drain_ordered(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }

    /// Marks one drained item as finished.
    pub fn complete(&self) {
        let _ = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Completes one item when the returned guard drops, so a pipeline that
    /// panics or is aborted still releases its slot.
    pub fn completion(self: &Arc<Self>) -> Completion<T> {
        Completion {
            queue: Arc::clone(self),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) == 0
    }

    /// Resolves after the next push, or immediately if a push happened while
    /// nobody was waiting.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queued: self.items.lock().len(),
            outstanding: self.outstanding.load(Ordering::SeqCst),
        }
    }
}

pub struct Completion<T> {
    queue: Arc<PostQueue<T>>,
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        self.queue.complete();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn drains_in_push_order_and_tracks_outstanding() {
        let queue = PostQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.snapshot().queued, 3);

        assert_eq!(queue.drain_ordered(), vec![1, 2, 3]);
        let snapshot = queue.snapshot();
        assert_eq!(snapshot.queued, 0);
        assert_eq!(snapshot.outstanding, 3);
        assert!(!queue.is_idle());

        for _ in 0..3 {
            queue.complete();
        }
        assert!(queue.is_idle());
        queue.complete();
        assert_eq!(queue.snapshot().outstanding, 0);
    }

    #[tokio::test]
    async fn push_before_wait_is_not_lost() {
        let queue = PostQueue::new();
        queue.push("post");
        tokio::time::timeout(Duration::from_millis(100), queue.notified())
            .await
            .expect("stored permit wakes the waiter");
    }

    #[tokio::test]
    async fn panicking_pipeline_still_completes() {
        let queue = Arc::new(PostQueue::new());
        queue.push("post");
        queue.drain_ordered();

        let done = queue.completion();
        let outcome = tokio::spawn(async move {
            let _done = done;
            panic!("pipeline failed");
        })
        .await;
        assert!(outcome.unwrap_err().is_panic());
        assert!(queue.is_idle());
    }

    #[tokio::test]
    async fn aborted_pipeline_still_completes() {
        let queue = Arc::new(PostQueue::new());
        queue.push("post");
        queue.drain_ordered();

        let done = queue.completion();
        let task = tokio::spawn(async move {
            let _done = done;
            std::future::pending::<()>().await;
        });
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(queue.is_idle());
    }
}
