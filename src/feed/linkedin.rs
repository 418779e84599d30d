use once_cell::sync::Lazy;

use crate::{
    dom::{Document, NodeId, Selector},
    domain::{Platform, PostRecord},
};

use super::{
    extract::{first_match, selector, FieldChain, SelectorText, SiblingBlock},
    FeedPlatform,
};

// Generated class names churn constantly; only data attributes are used.
static POST: Lazy<Selector> = Lazy::new(|| selector(r#"div[data-view-name="feed-full-update"]"#));
static COMMENTARY: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        selector(r#"[data-view-name="feed-commentary"]"#),
        selector(r#"[data-testid="expandable-text-box"]"#),
    ]
});
static LIST_ITEM: Lazy<Selector> = Lazy::new(|| selector(r#"div[role="listitem"]"#));

const NAME_ANCHOR: &str = r#"a[data-view-name="feed-header-text"]"#;

pub struct LinkedInFeed {
    name: FieldChain,
    description: FieldChain,
    sub_description: FieldChain,
}

impl LinkedInFeed {
    pub fn new() -> Self {
        Self {
            name: FieldChain::new("Unknown").then(SelectorText(selector(NAME_ANCHOR))),
            description: FieldChain::new("").then(header_line(1)),
            sub_description: FieldChain::new("").then(header_line(2)),
        }
    }
}

impl Default for LinkedInFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Header layout is `div > [p(name), p(headline), p(timestamp)]`.
fn header_line(index: usize) -> SiblingBlock {
    SiblingBlock {
        anchor: selector(NAME_ANCHOR),
        container: selector("div"),
        block: selector("p"),
        index,
    }
}

impl FeedPlatform for LinkedInFeed {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn post_selector(&self) -> &Selector {
        &POST
    }

    fn locate_anchor(&self, doc: &Document, post: NodeId) -> Option<NodeId> {
        let found = first_match(doc, post, COMMENTARY.as_slice());
        if found.is_none() {
            tracing::warn!(target: "extract", ?post, "LinkedIn post has no commentary element");
        }
        found
    }

    fn extract_record(&self, doc: &Document, post: NodeId, anchor: NodeId) -> PostRecord {
        PostRecord {
            actor_name: self.name.resolve(doc, post),
            actor_description: self.description.resolve(doc, post),
            actor_sub_description: self.sub_description.resolve(doc, post),
            post_content: doc.inner_text(anchor).trim().to_string(),
            platform: Platform::LinkedIn,
        }
    }

    fn content_container(&self, doc: &Document, post: NodeId) -> NodeId {
        doc.closest(post, &POST).unwrap_or(post)
    }

    fn outer_container(&self, doc: &Document, content: NodeId) -> NodeId {
        doc.closest(content, &LIST_ITEM).unwrap_or(content)
    }

    fn accent_color(&self) -> &'static str {
        "#0a66c2"
    }
}
