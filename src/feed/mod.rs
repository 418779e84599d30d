pub mod extract;
mod linkedin;
pub mod replay;
pub mod scanner;
mod twitter;

use std::sync::Arc;

use crate::{
    dom::{Document, NodeId, Selector},
    domain::{Platform, PostRecord},
};

pub use linkedin::LinkedInFeed;
pub use twitter::TwitterFeed;

/// Markup knowledge for one feed type: where posts are, how to read them and
/// which containers to decorate.
pub trait FeedPlatform: Send + Sync {
    fn platform(&self) -> Platform;

    fn post_selector(&self) -> &Selector;

    /// The element carrying the post body. Posts without one are skipped, and
    /// its identity is what the dedup ledger remembers.
    fn locate_anchor(&self, doc: &Document, post: NodeId) -> Option<NodeId>;

    fn extract_record(&self, doc: &Document, post: NodeId, anchor: NodeId) -> PostRecord;

    /// Element whose children get wrapped when a post is blurred.
    fn content_container(&self, doc: &Document, post: NodeId) -> NodeId;

    /// Feed list entry hidden when a post is removed.
    fn outer_container(&self, doc: &Document, content: NodeId) -> NodeId;

    fn accent_color(&self) -> &'static str;
}

pub fn for_platform(platform: Platform) -> Arc<dyn FeedPlatform> {
    match platform {
        Platform::LinkedIn => Arc::new(LinkedInFeed::new()),
        Platform::Twitter => Arc::new(TwitterFeed::new()),
    }
}
