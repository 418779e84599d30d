use std::sync::Arc;

use crate::{
    dom::{Document, NodeId},
    domain::DisplayMode,
    feed::FeedPlatform,
};

/// Set on a content container once it has been decorated.
pub const GUARDED_ATTR: &str = "data-cringe-guarded";
pub const REVEAL_LABEL: &str = "Click to View";

const BLUR: &str = "blur(12px)";
const OBSCURED_OPACITY: &str = "0.6";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObscuredPost {
    pub container: NodeId,
    pub wrapper: NodeId,
    pub control: NodeId,
    pub reason_label: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    AlreadyGuarded,
    Removed { outer: NodeId },
    Obscured(ObscuredPost),
}

impl Suppression {
    pub fn is_new(&self) -> bool {
        !matches!(self, Suppression::AlreadyGuarded)
    }
}

/// Hides or blurs a flagged post. A container that already carries
/// [`GUARDED_ATTR`] is left untouched.
pub fn suppress(
    doc: &Document,
    feed: &dyn FeedPlatform,
    post: NodeId,
    mode: DisplayMode,
    reason: Option<&str>,
) -> Suppression {
    let container = feed.content_container(doc, post);
    if doc.attr(container, GUARDED_ATTR).as_deref() == Some("true") {
        return Suppression::AlreadyGuarded;
    }
    doc.set_attr(container, GUARDED_ATTR, "true");

    match mode {
        DisplayMode::Remove => {
            let outer = feed.outer_container(doc, container);
            doc.set_style_important(outer, "display", "none");
            tracing::info!(target: "suppressor", platform = %feed.platform(), "post removed");
            Suppression::Removed { outer }
        }
        DisplayMode::Blur => {
            let obscured = obscure(doc, container, feed.accent_color(), reason);
            tracing::info!(target: "suppressor", platform = %feed.platform(), "post blurred");
            Suppression::Obscured(obscured)
        }
    }
}

fn obscure(doc: &Document, container: NodeId, accent: &str, reason: Option<&str>) -> ObscuredPost {
    let wrapper = doc.create_element("div");
    doc.append_children(wrapper, &doc.children(container));
    for (property, value) in [
        ("filter", BLUR),
        ("-webkit-filter", BLUR),
        ("transition", "filter 0.3s ease, opacity 0.3s ease"),
        ("opacity", OBSCURED_OPACITY),
        ("width", "100%"),
        ("height", "auto"),
        ("pointer-events", "none"),
    ] {
        doc.set_style(wrapper, property, value);
    }

    // Reference box for the centred overlay; block display escapes flex/grid
    // placement of the feed.
    for (property, value) in [
        ("position", "relative"),
        ("display", "block"),
        ("min-height", "150px"),
        ("overflow", "hidden"),
    ] {
        doc.set_style(container, property, value);
    }

    let control = doc.create_element("button");
    doc.set_text(control, REVEAL_LABEL);
    for (property, value) in [
        ("position", "absolute"),
        ("top", "50%"),
        ("left", "50%"),
        ("transform", "translate(-50%, -50%)"),
        ("z-index", "100"),
        ("background-color", accent),
        ("color", "white"),
        ("border", "none"),
        ("padding", "10px 20px"),
        ("font-size", "16px"),
        ("font-weight", "600"),
        ("border-radius", "24px"),
        ("cursor", "pointer"),
        ("box-shadow", "0 4px 12px rgba(0,0,0,0.25)"),
    ] {
        doc.set_style(control, property, value);
    }

    let reason_label = reason.map(|reason| {
        let label = doc.create_element("div");
        doc.set_text(label, &format!("Reason: {reason}"));
        for (property, value) in [
            ("position", "absolute"),
            ("top", "calc(50% - 60px)"),
            ("left", "50%"),
            ("transform", "translate(-50%, -50%)"),
            ("z-index", "99"),
            ("background-color", "rgba(10, 102, 194, 0.9)"),
            ("color", "white"),
            ("padding", "8px 12px"),
            ("border-radius", "12px"),
            ("font-size", "13px"),
            ("font-weight", "600"),
        ] {
            doc.set_style(label, property, value);
        }
        doc.append_child(container, label);
        label
    });

    doc.append_child(container, wrapper);
    doc.append_child(container, control);

    let obscured = ObscuredPost {
        container,
        wrapper,
        control,
        reason_label,
    };
    doc.add_click_listener(control, Arc::new(move |doc: &Document| reveal(doc, &obscured)));
    obscured
}

/// Undoes the blur after the user asks to see the post. Content nodes never
/// left the document, so only styles and overlay elements change.
pub fn reveal(doc: &Document, obscured: &ObscuredPost) {
    doc.set_style(obscured.wrapper, "filter", "none");
    doc.set_style(obscured.wrapper, "-webkit-filter", "none");
    doc.set_style(obscured.wrapper, "opacity", "1");
    doc.set_style(obscured.wrapper, "pointer-events", "auto");
    doc.remove(obscured.control);
    if let Some(label) = obscured.reason_label {
        doc.remove(label);
    }
    tracing::debug!(target: "suppressor", container = ?obscured.container, "post revealed");
}
