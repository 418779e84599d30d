//! In-process page model: a [`scraper::Html`] tree shared behind a cloneable
//! [`Document`] handle. A [`NodeId`] is the identity of a node for as long as
//! the document lives; detached nodes keep their slot.

mod html;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use html5ever::{tendril::StrTendril, Attribute, LocalName, Namespace, QualName};
use parking_lot::Mutex;
use scraper::{
    node::{Element, Text},
    ElementRef, Html, Node,
};
use tokio::sync::mpsc;

pub use ego_tree::NodeId;
pub use scraper::Selector;

pub type ClickListener = Arc<dyn Fn(&Document) + Send + Sync>;

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "li", "main", "nav", "ol", "p", "section", "ul",
];

#[derive(Debug, Clone, PartialEq)]
struct StyleDecl {
    property: String,
    value: String,
    important: bool,
}

fn parse_style(raw: &str) -> Vec<StyleDecl> {
    raw.split(';')
        .filter_map(|chunk| {
            let (property, value) = chunk.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let mut value = value.trim();
            let mut important = false;
            if let Some(idx) = value.to_ascii_lowercase().rfind("!important") {
                important = true;
                value = value[..idx].trim_end();
            }
            (!property.is_empty()).then(|| StyleDecl {
                property,
                value: value.to_string(),
                important,
            })
        })
        .collect()
}

fn render_style(decls: &[StyleDecl]) -> String {
    decls
        .iter()
        .map(|decl| {
            if decl.important {
                format!("{}: {} !important;", decl.property, decl.value)
            } else {
                format!("{}: {};", decl.property, decl.value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rebuilds `element` with `name` set to `value`, or dropped when `value` is
/// `None`. Rebuilding keeps scraper's cached id and class lookups in sync.
fn rebuild_element(element: &Element, name: &str, value: Option<&str>) -> Element {
    let mut attrs: Vec<Attribute> = element
        .attrs
        .iter()
        .filter(|(qual, _)| &*qual.local != name)
        .map(|(qual, existing)| Attribute {
            name: qual.clone(),
            value: StrTendril::from_slice(existing),
        })
        .collect();
    if let Some(value) = value {
        attrs.push(Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
            value: StrTendril::from_slice(value),
        });
    }
    Element::new(element.name.clone(), attrs)
}

fn element_of(html: &Html, id: NodeId) -> Option<&Element> {
    html.tree.get(id)?.value().as_element()
}

fn is_inclusive_ancestor(html: &Html, ancestor: NodeId, node: NodeId) -> bool {
    let Some(node) = html.tree.get(node) else {
        return false;
    };
    node.id() == ancestor || node.ancestors().any(|a| a.id() == ancestor)
}

/// Appends text in rendering order. Whitespace inside a text run collapses to
/// single spaces; block elements and `<br>` contribute line breaks.
fn collect_text(html: &Html, id: NodeId, out: &mut String) {
    let Some(node) = html.tree.get(id) else {
        return;
    };
    match node.value() {
        Node::Text(text) => {
            for ch in text.chars() {
                out.push(if ch.is_whitespace() { ' ' } else { ch });
            }
        }
        Node::Element(element) if element.name() == "br" => out.push('\n'),
        Node::Element(element) => {
            let block = BLOCK_TAGS.contains(&element.name());
            if block {
                out.push('\n');
            }
            for child in node.children() {
                collect_text(html, child.id(), out);
            }
            if block {
                out.push('\n');
            }
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                collect_text(html, child.id(), out);
            }
        }
        _ => {}
    }
}

fn tidy_lines(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One delivery to a mutation subscriber: the nodes inserted by a single
/// mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch {
    pub added: Vec<NodeId>,
}

struct Observer {
    root: NodeId,
    sender: mpsc::UnboundedSender<MutationBatch>,
}

struct DocumentInner {
    html: Mutex<Html>,
    observers: Mutex<Vec<Observer>>,
    listeners: Mutex<HashMap<NodeId, Vec<ClickListener>>>,
    pending_batches: AtomicUsize,
}

#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::from_html(Html::new_document())
    }

    fn from_html(html: Html) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                html: Mutex::new(html),
                observers: Mutex::new(Vec::new()),
                listeners: Mutex::new(HashMap::new()),
                pending_batches: AtomicUsize::new(0),
            }),
        }
    }

    pub fn root(&self) -> NodeId {
        self.inner.html.lock().tree.root().id()
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.inner.html.lock();
        let body = html
            .tree
            .root()
            .descendants()
            .find(|node| node.value().as_element().is_some_and(|el| el.name() == "body"))?;
        Some(body.id())
    }

    pub fn create_element(&self, tag: &str) -> NodeId {
        let name = QualName::new(
            None,
            Namespace::from(HTML_NS),
            LocalName::from(tag.to_ascii_lowercase()),
        );
        self.inner
            .html
            .lock()
            .tree
            .orphan(Node::Element(Element::new(name, Vec::new())))
            .id()
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> bool {
        !self.append_children(parent, &[child]).is_empty()
    }

    /// Appends every node in order and reports them to observers as one batch.
    /// Nodes that would become their own ancestor are skipped.
    pub fn append_children(&self, parent: NodeId, children: &[NodeId]) -> Vec<NodeId> {
        let (added, recipients) = {
            let mut html = self.inner.html.lock();
            let mut added = Vec::with_capacity(children.len());
            for child in children.iter().copied() {
                if html.tree.get(child).is_none() || is_inclusive_ancestor(&html, child, parent) {
                    continue;
                }
                let Some(mut target) = html.tree.get_mut(parent) else {
                    break;
                };
                target.append_id(child);
                added.push(child);
            }
            let mut observers = self.inner.observers.lock();
            observers.retain(|observer| !observer.sender.is_closed());
            let recipients: Vec<_> = observers
                .iter()
                .filter(|observer| is_inclusive_ancestor(&html, observer.root, parent))
                .map(|observer| observer.sender.clone())
                .collect();
            (added, recipients)
        };
        if !added.is_empty() {
            for sender in recipients {
                self.inner.pending_batches.fetch_add(1, Ordering::SeqCst);
                let batch = MutationBatch {
                    added: added.clone(),
                };
                if sender.send(batch).is_err() {
                    self.inner.pending_batches.fetch_sub(1, Ordering::SeqCst);
                }
            }
        }
        added
    }

    pub fn remove(&self, node: NodeId) {
        if let Some(mut node) = self.inner.html.lock().tree.get_mut(node) {
            node.detach();
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let html = self.inner.html.lock();
        html.tree.get(node)?.parent().map(|parent| parent.id())
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let html = self.inner.html.lock();
        html.tree
            .get(node)
            .map(|n| n.children().map(|child| child.id()).collect())
            .unwrap_or_default()
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        element_of(&self.inner.html.lock(), node).is_some()
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        let html = self.inner.html.lock();
        let root = html.tree.root().id();
        is_inclusive_ancestor(&html, root, node)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        let html = self.inner.html.lock();
        element_of(&html, node)?
            .attr(&name.to_ascii_lowercase())
            .map(str::to_string)
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        self.update_attr(node, &name.to_ascii_lowercase(), Some(value));
    }

    fn update_attr(&self, node: NodeId, name: &str, value: Option<&str>) {
        let mut html = self.inner.html.lock();
        let Some(mut target) = html.tree.get_mut(node) else {
            return;
        };
        if let Node::Element(element) = target.value() {
            *element = rebuild_element(element, name, value);
        }
    }

    fn style_decls(&self, node: NodeId) -> Vec<StyleDecl> {
        self.attr(node, "style")
            .map(|raw| parse_style(&raw))
            .unwrap_or_default()
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.style_decls(node)
            .into_iter()
            .find(|decl| decl.property.eq_ignore_ascii_case(property))
            .map(|decl| decl.value)
    }

    pub fn style_is_important(&self, node: NodeId, property: &str) -> bool {
        self.style_decls(node)
            .iter()
            .any(|decl| decl.important && decl.property.eq_ignore_ascii_case(property))
    }

    pub fn set_style(&self, node: NodeId, property: &str, value: &str) {
        self.write_style(node, property, value, false);
    }

    pub fn set_style_important(&self, node: NodeId, property: &str, value: &str) {
        self.write_style(node, property, value, true);
    }

    fn write_style(&self, node: NodeId, property: &str, value: &str, important: bool) {
        if !self.is_element(node) {
            return;
        }
        let mut decls = self.style_decls(node);
        let decl = StyleDecl {
            property: property.to_ascii_lowercase(),
            value: value.to_string(),
            important,
        };
        match decls.iter_mut().find(|d| d.property == decl.property) {
            Some(slot) => *slot = decl,
            None => decls.push(decl),
        }
        self.update_attr(node, "style", Some(&render_style(&decls)));
    }

    /// Replaces all children of `node` with a single text node.
    pub fn set_text(&self, node: NodeId, text: &str) {
        let mut html = self.inner.html.lock();
        let Some(existing) = html
            .tree
            .get(node)
            .map(|n| n.children().map(|child| child.id()).collect::<Vec<_>>())
        else {
            return;
        };
        for child in existing {
            if let Some(mut child) = html.tree.get_mut(child) {
                child.detach();
            }
        }
        let text_node = html
            .tree
            .orphan(Node::Text(Text {
                text: text.to_string().into(),
            }))
            .id();
        if let Some(mut target) = html.tree.get_mut(node) {
            target.append_id(text_node);
        }
    }

    /// Rendered text of the subtree: one line per block, whitespace collapsed
    /// within each line.
    pub fn inner_text(&self, node: NodeId) -> String {
        let mut raw = String::new();
        collect_text(&self.inner.html.lock(), node, &mut raw);
        tidy_lines(&raw)
    }

    /// Descendants of `scope` (excluding `scope`) matching the selector, in
    /// document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let html = self.inner.html.lock();
        let Some(scope) = html.tree.get(scope) else {
            return Vec::new();
        };
        scope
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|element| selector.matches(element))
            .map(|element| element.id())
            .collect()
    }

    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        let html = self.inner.html.lock();
        let found = html
            .tree
            .get(scope)?
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|element| selector.matches(element))?;
        Some(found.id())
    }

    /// Nearest inclusive ancestor matching the selector.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let html = self.inner.html.lock();
        let node = html.tree.get(node)?;
        let found = std::iter::once(node)
            .chain(node.ancestors())
            .filter_map(ElementRef::wrap)
            .find(|element| selector.matches(element))?;
        Some(found.id())
    }

    /// Subscribes to insertions anywhere under `root`.
    pub fn observe(&self, root: NodeId) -> MutationSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.observers.lock().push(Observer { root, sender });
        MutationSubscription {
            receiver,
            document: self.clone(),
        }
    }

    /// Batches sent to subscribers that have not been picked up yet.
    pub fn pending_mutation_batches(&self) -> usize {
        self.inner.pending_batches.load(Ordering::SeqCst)
    }

    pub fn add_click_listener(&self, node: NodeId, listener: ClickListener) {
        self.inner
            .listeners
            .lock()
            .entry(node)
            .or_default()
            .push(listener);
    }

    /// Dispatches a click to the listeners registered on `node`. Returns
    /// whether any listener ran.
    pub fn click(&self, node: NodeId) -> bool {
        let listeners = self
            .inner
            .listeners
            .lock()
            .get(&node)
            .cloned()
            .unwrap_or_default();
        for listener in &listeners {
            listener(self);
        }
        !listeners.is_empty()
    }
}

pub struct MutationSubscription {
    receiver: mpsc::UnboundedReceiver<MutationBatch>,
    document: Document,
}

impl MutationSubscription {
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        let batch = self.receiver.recv().await;
        if batch.is_some() {
            self.document
                .inner
                .pending_batches
                .fetch_sub(1, Ordering::SeqCst);
        }
        batch
    }
}

impl Drop for MutationSubscription {
    fn drop(&mut self) {
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {
            self.document
                .inner
                .pending_batches
                .fetch_sub(1, Ordering::SeqCst);
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    const PAGE: &str = r#"<html><body>
        <div id="feed">
            <article data-testid="tweet"><div lang="en">first <b>post</b></div></article>
            <article role="article"><p>second</p><p>post</p></article>
        </div>
    </body></html>"#;

    fn sel(source: &str) -> Selector {
        Selector::parse(source).unwrap()
    }

    #[test]
    fn queries_follow_document_order() {
        let doc = Document::parse_html(PAGE);
        let articles = doc.query_selector_all(doc.root(), &sel("article"));
        assert_eq!(articles.len(), 2);
        assert_eq!(
            doc.attr(articles[0], "data-testid").as_deref(),
            Some("tweet")
        );

        let bold = doc.query_selector(doc.root(), &sel("article div[lang] b")).unwrap();
        assert_eq!(doc.closest(bold, &sel("article")), Some(articles[0]));
        assert_eq!(doc.closest(articles[0], &sel("article")), Some(articles[0]));
        assert_eq!(doc.closest(bold, &sel("section")), None);
        assert!(doc.query_selector(articles[0], &sel("article")).is_none());
    }

    #[test]
    fn inner_text_breaks_around_blocks() {
        let doc = Document::parse_html(PAGE);
        let articles = doc.query_selector_all(doc.root(), &sel("article"));
        assert_eq!(doc.inner_text(articles[0]).trim(), "first post");
        assert_eq!(doc.inner_text(articles[1]).trim(), "second\npost");
    }

    #[test]
    fn inner_text_collapses_wrapped_whitespace() {
        let doc = Document::parse_html(
            "<html><body><p>Join my\n        crypto    course<br>today</p></body></html>",
        );
        let p = doc.query_selector(doc.root(), &sel("p")).unwrap();
        assert_eq!(doc.inner_text(p), "Join my crypto course\ntoday");
    }

    #[test]
    fn selectors_with_substring_lists_and_child_combinators() {
        let doc = Document::parse_html(
            r#"<html><body>
                <div class="font-card"><a href="/font/alpha">a</a></div>
                <article class="font"><div><p>nested</p></div></article>
                <div><p>direct</p></div>
            </body></html>"#,
        );
        let links = doc.query_selector_all(doc.root(), &sel("a[href*='/font/']"));
        assert_eq!(links.len(), 1);
        let cards = doc.query_selector_all(doc.root(), &sel("div.font-card, article.font"));
        assert_eq!(cards.len(), 2);
        let direct = doc.query_selector_all(doc.root(), &sel("div > p"));
        let texts: Vec<String> = direct.iter().map(|p| doc.inner_text(*p)).collect();
        assert_eq!(texts, vec!["nested", "direct"]);
    }

    #[test]
    fn set_attr_refreshes_class_matching() {
        let doc = Document::parse_html(r#"<html><body><div class="a"></div></body></html>"#);
        let div = doc.query_selector(doc.root(), &sel("div.a")).unwrap();
        doc.set_attr(div, "class", "b");
        assert!(doc.query_selector(doc.root(), &sel("div.a")).is_none());
        assert_eq!(doc.query_selector(doc.root(), &sel("div.b")), Some(div));
    }

    #[test]
    fn style_declarations_round_trip() {
        let doc = Document::parse_html(
            r#"<html><body><div style="color: red; display: none !important"></div></body></html>"#,
        );
        let div = doc.query_selector(doc.root(), &sel("div")).unwrap();
        assert_eq!(doc.style(div, "color").as_deref(), Some("red"));
        assert!(doc.style_is_important(div, "display"));
        assert!(!doc.style_is_important(div, "color"));

        doc.set_style(div, "opacity", "0.6");
        assert_eq!(
            doc.attr(div, "style").as_deref(),
            Some("color: red; display: none !important; opacity: 0.6;")
        );
    }

    #[test]
    fn append_moves_nodes_and_refuses_cycles() {
        let doc = Document::parse_html(PAGE);
        let feed = doc.query_selector(doc.root(), &sel("div")).unwrap();
        let wrapper = doc.create_element("div");
        for child in doc.children(feed) {
            doc.append_child(wrapper, child);
        }
        assert!(doc.children(feed).is_empty());
        assert!(!doc.is_connected(wrapper));

        doc.append_child(feed, wrapper);
        assert!(doc.is_connected(wrapper));
        assert!(!doc.append_child(wrapper, feed));
        assert_eq!(doc.query_selector_all(feed, &sel("article")).len(), 2);
    }

    #[tokio::test]
    async fn observers_receive_insertions_under_their_root() {
        let doc = Document::parse_html(PAGE);
        let body = doc.body().unwrap();
        let mut subscription = doc.observe(body);

        let detached = doc.create_element("section");
        let inner = doc.create_element("p");
        doc.append_child(detached, inner);
        assert_eq!(doc.pending_mutation_batches(), 0);

        let added = doc.append_html(body, "<div><article></article></div><span>x</span>");
        assert_eq!(added.len(), 2);
        assert_eq!(doc.pending_mutation_batches(), 1);

        let batch = subscription.next_batch().await.unwrap();
        assert_eq!(batch.added, added);
        assert_eq!(doc.pending_mutation_batches(), 0);

        doc.append_child(body, detached);
        drop(subscription);
        assert_eq!(doc.pending_mutation_batches(), 0);
    }

    #[test]
    fn click_runs_registered_listeners() {
        let doc = Document::new();
        let button = doc.create_element("button");
        assert!(!doc.click(button));

        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        doc.add_click_listener(
            button,
            Arc::new(move |_doc: &Document| flag.store(true, Ordering::SeqCst)),
        );
        assert!(doc.click(button));
        assert!(fired.load(Ordering::SeqCst));
    }
}
