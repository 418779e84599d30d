//! Field extraction as ordered fallback chains. Each locator tries one way of
//! finding a value inside a post; the chain returns the first hit or its
//! sentinel default.

use crate::dom::{Document, NodeId, Selector};

pub trait FieldLocator: Send + Sync {
    fn locate(&self, doc: &Document, scope: NodeId) -> Option<String>;
}

/// Trimmed text of the first element matching the selector.
pub struct SelectorText(pub Selector);

impl FieldLocator for SelectorText {
    fn locate(&self, doc: &Document, scope: NodeId) -> Option<String> {
        let node = doc.query_selector(scope, &self.0)?;
        non_empty(doc.inner_text(node))
    }
}

/// The `index`-th block (by `block` selector) inside the nearest `container`
/// around the element found by `anchor`. Used for header lines that sit next
/// to a stable anchor but carry no marker of their own.
pub struct SiblingBlock {
    pub anchor: Selector,
    pub container: Selector,
    pub block: Selector,
    pub index: usize,
}

impl FieldLocator for SiblingBlock {
    fn locate(&self, doc: &Document, scope: NodeId) -> Option<String> {
        let anchor = doc.query_selector(scope, &self.anchor)?;
        let container = doc.closest(anchor, &self.container)?;
        let block = doc
            .query_selector_all(container, &self.block)
            .into_iter()
            .nth(self.index)?;
        non_empty(doc.inner_text(block))
    }
}

/// Yields `value` when any matching element reads exactly `label`, ignoring
/// case and surrounding whitespace.
pub struct LabelPresence {
    pub selector: Selector,
    pub label: &'static str,
    pub value: &'static str,
}

impl FieldLocator for LabelPresence {
    fn locate(&self, doc: &Document, scope: NodeId) -> Option<String> {
        doc.query_selector_all(scope, &self.selector)
            .into_iter()
            .any(|node| doc.inner_text(node).trim().eq_ignore_ascii_case(self.label))
            .then(|| self.value.to_string())
    }
}

pub struct FieldChain {
    locators: Vec<Box<dyn FieldLocator>>,
    fallback: &'static str,
}

impl FieldChain {
    pub fn new(fallback: &'static str) -> Self {
        Self {
            locators: Vec::new(),
            fallback,
        }
    }

    pub fn then(mut self, locator: impl FieldLocator + 'static) -> Self {
        self.locators.push(Box::new(locator));
        self
    }

    pub fn resolve(&self, doc: &Document, scope: NodeId) -> String {
        self.locators
            .iter()
            .find_map(|locator| locator.locate(doc, scope))
            .unwrap_or_else(|| self.fallback.to_string())
    }
}

/// First node found by trying each selector in priority order.
pub fn first_match(doc: &Document, scope: NodeId, candidates: &[Selector]) -> Option<NodeId> {
    candidates
        .iter()
        .find_map(|selector| doc.query_selector(scope, selector))
}

pub(crate) fn selector(source: &str) -> Selector {
    Selector::parse(source).unwrap_or_else(|err| panic!("invalid built-in selector {source:?}: {err}"))
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = r#"<html><body><div id="post">
        <header><div><a data-role="name">  Ada  </a><p>Ada</p><p>Engineer</p></div></header>
        <span class="x">Sponsored</span>
        <p data-role="second">fallback body</p>
        <p data-role="empty">   </p>
    </div></body></html>"#;

    #[test]
    fn chain_takes_first_hit_then_fallback() {
        let doc = Document::parse_html(POST);
        let post = doc.body().unwrap();

        let chain = FieldChain::new("Unknown")
            .then(SelectorText(selector(r#"[data-role="missing"]"#)))
            .then(SelectorText(selector(r#"[data-role="empty"]"#)))
            .then(SelectorText(selector(r#"[data-role="second"]"#)));
        assert_eq!(chain.resolve(&doc, post), "fallback body");

        let nothing = FieldChain::new("Unknown").then(SelectorText(selector("table")));
        assert_eq!(nothing.resolve(&doc, post), "Unknown");
    }

    #[test]
    fn sibling_blocks_are_counted_from_the_anchor_container() {
        let doc = Document::parse_html(POST);
        let post = doc.body().unwrap();
        let locator = SiblingBlock {
            anchor: selector(r#"a[data-role="name"]"#),
            container: selector("div"),
            block: selector("p"),
            index: 1,
        };
        assert_eq!(locator.locate(&doc, post).as_deref(), Some("Engineer"));

        let past_end = SiblingBlock { index: 5, ..locator };
        assert_eq!(past_end.locate(&doc, post), None);
    }

    #[test]
    fn label_presence_matches_whole_text_only() {
        let doc = Document::parse_html(POST);
        let post = doc.body().unwrap();
        let sponsored = LabelPresence {
            selector: selector("span"),
            label: "sponsored",
            value: "Sponsored",
        };
        assert_eq!(sponsored.locate(&doc, post).as_deref(), Some("Sponsored"));

        let partial = LabelPresence {
            selector: selector("span"),
            label: "sponsor",
            value: "Sponsored",
        };
        assert_eq!(partial.locate(&doc, post), None);
    }

    #[test]
    fn first_match_respects_priority_not_document_order() {
        let doc = Document::parse_html(POST);
        let post = doc.body().unwrap();
        let found = first_match(
            &doc,
            post,
            &[selector(r#"[data-role="second"]"#), selector("p")],
        )
        .unwrap();
        assert_eq!(doc.attr(found, "data-role").as_deref(), Some("second"));
    }
}
