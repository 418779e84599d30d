use once_cell::sync::Lazy;

use crate::{
    dom::{Document, NodeId, Selector},
    domain::{Platform, PostRecord},
};

use super::{
    extract::{first_match, selector, FieldChain, LabelPresence, SelectorText},
    FeedPlatform,
};

static POST: Lazy<Selector> =
    Lazy::new(|| selector(r#"article[data-testid="tweet"], article[role="article"]"#));
static TWEET_TEXT: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        selector(r#"[data-testid="tweetText"]"#),
        selector("div[lang]"),
    ]
});
static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article"));
static CELL: Lazy<Selector> = Lazy::new(|| selector(r#"div[data-testid="cellInnerDiv"]"#));

pub struct TwitterFeed {
    name: FieldChain,
    description: FieldChain,
}

impl TwitterFeed {
    pub fn new() -> Self {
        Self {
            name: FieldChain::new("Unknown")
                .then(SelectorText(selector(r#"div[data-testid="User-Names"] span"#))),
            // Ads carry a bare "Promoted" label somewhere in the tweet.
            description: FieldChain::new("").then(LabelPresence {
                selector: selector("span"),
                label: "promoted",
                value: "Promoted",
            }),
        }
    }
}

impl Default for TwitterFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedPlatform for TwitterFeed {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn post_selector(&self) -> &Selector {
        &POST
    }

    fn locate_anchor(&self, doc: &Document, post: NodeId) -> Option<NodeId> {
        first_match(doc, post, TWEET_TEXT.as_slice())
    }

    fn extract_record(&self, doc: &Document, post: NodeId, anchor: NodeId) -> PostRecord {
        PostRecord {
            actor_name: self.name.resolve(doc, post),
            actor_description: self.description.resolve(doc, post),
            actor_sub_description: String::new(),
            post_content: doc.inner_text(anchor).trim().to_string(),
            platform: Platform::Twitter,
        }
    }

    fn content_container(&self, doc: &Document, post: NodeId) -> NodeId {
        doc.closest(post, &ARTICLE).unwrap_or(post)
    }

    fn outer_container(&self, doc: &Document, content: NodeId) -> NodeId {
        doc.closest(content, &CELL).unwrap_or(content)
    }

    fn accent_color(&self) -> &'static str {
        "#1d9bf0"
    }
}
