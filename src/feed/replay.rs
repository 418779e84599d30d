use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::{fs, time::sleep};

use crate::{dom::Document, infrastructure::shutdown::ShutdownListener};

pub async fn load_page(path: &Path) -> Result<Document> {
    let html = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read page snapshot {}", path.display()))?;
    Ok(Document::parse_html(&html))
}

pub async fn write_page(doc: &Document, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, doc.to_html())
        .await
        .with_context(|| format!("failed to write processed page {}", path.display()))
}

/// Stands in for infinite scroll: appends HTML fragments to `<body>` one at a
/// time, in file name order.
pub struct PageReplay {
    doc: Document,
    fragments: Vec<(PathBuf, String)>,
    interval: Duration,
}

impl PageReplay {
    pub fn new(doc: Document, interval: Duration) -> Self {
        Self {
            doc,
            fragments: Vec::new(),
            interval,
        }
    }

    /// Reads every `*.html` file in `dir`.
    pub async fn load_dir(mut self, dir: &Path) -> Result<Self> {
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("failed to list scroll fragments in {}", dir.display()))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let html = fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read fragment {}", path.display()))?;
            self.fragments.push((path, html));
        }
        tracing::info!(
            target: "replay",
            dir = %dir.display(),
            fragments = self.fragments.len(),
            "scroll fragments loaded"
        );
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Appends the fragments, waiting `interval` before each. Returns how
    /// many were appended before finishing or shutdown.
    pub async fn run(self, mut shutdown: ShutdownListener) -> usize {
        let mut appended = 0;
        for (path, html) in self.fragments {
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = shutdown.notified() => break,
            }
            let Some(body) = self.doc.body() else {
                tracing::warn!(target: "replay", "page has no <body>; stopping replay");
                break;
            };
            let added = self.doc.append_html(body, &html);
            appended += 1;
            tracing::debug!(
                target: "replay",
                fragment = %path.display(),
                nodes = added.len(),
                "fragment appended"
            );
        }
        tracing::info!(target: "replay", appended, "scroll replay finished");
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dom::Selector, infrastructure::shutdown::Shutdown};

    #[tokio::test]
    async fn appends_fragments_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("02.html"), "<p>second</p>").unwrap();
        std::fs::write(dir.path().join("01.html"), "<p>first</p>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let doc = Document::parse_html("<html><body></body></html>");
        let replay = PageReplay::new(doc.clone(), Duration::from_millis(1))
            .load_dir(dir.path())
            .await
            .unwrap();
        assert_eq!(replay.len(), 2);

        let (shutdown, _) = Shutdown::new();
        assert_eq!(replay.run(shutdown.subscribe()).await, 2);

        let paragraphs: Vec<String> = doc
            .query_selector_all(doc.root(), &Selector::parse("p").unwrap())
            .into_iter()
            .map(|p| doc.inner_text(p).trim().to_string())
            .collect();
        assert_eq!(paragraphs, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn shutdown_stops_replay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("01.html"), "<p>late</p>").unwrap();

        let doc = Document::parse_html("<html><body></body></html>");
        let replay = PageReplay::new(doc.clone(), Duration::from_secs(60))
            .load_dir(dir.path())
            .await
            .unwrap();
        let (shutdown, _) = Shutdown::new();
        shutdown.trigger();
        assert_eq!(replay.run(shutdown.subscribe()).await, 0);
    }

    #[tokio::test]
    async fn page_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("feed.html");
        std::fs::write(&input, "<html><body><p>hi</p></body></html>").unwrap();

        let doc = load_page(&input).await.unwrap();
        let output = dir.path().join("out/processed.html");
        write_page(&doc, &output).await.unwrap();
        let written = std::fs::read_to_string(output).unwrap();
        assert!(written.contains("<p>hi</p>"));
    }
}
