use scraper::{ElementRef, Html};

use super::{Document, NodeId};

impl Document {
    pub fn parse_html(html: &str) -> Self {
        Document::from_html(Html::parse_document(html))
    }

    /// Parses `fragment` and appends its top-level nodes to `parent` as a
    /// single mutation batch.
    pub fn append_html(&self, parent: NodeId, fragment: &str) -> Vec<NodeId> {
        let parsed = Html::parse_fragment(fragment);
        let created: Vec<NodeId> = {
            let mut html = self.inner.html.lock();
            let merged = html.tree.extend_tree(parsed.tree).id();
            // The fragment parser wraps its nodes in an <html> element.
            html.tree
                .get(merged)
                .and_then(|root| root.children().find(|child| child.value().is_element()))
                .map(|wrapper| wrapper.children().map(|child| child.id()).collect())
                .unwrap_or_default()
        };
        self.append_children(parent, &created)
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let html = self.inner.html.lock();
        match html.tree.get(node) {
            Some(node) if node.id() == html.tree.root().id() => html.html(),
            Some(node) => ElementRef::wrap(node)
                .map(|element| element.inner_html())
                .unwrap_or_default(),
            None => String::new(),
        }
    }

    pub fn to_html(&self) -> String {
        self.inner.html.lock().html()
    }
}
