use std::sync::Arc;

use crate::{
    ai::{inference::compose_system_prompt, RemoteClassifier},
    domain::{PostRecord, Verdict},
    store::Preferences,
};

use super::matcher::contains_muted_words;

pub const PROMOTED_REASON: &str = "Promoted content";
pub const MUTED_WORDS_REASON: &str = "Contains muted words";

/// Decides whether a post should be suppressed: promoted marker first, then
/// muted words, then the remote model. Never fails; every error path ends in
/// a clean verdict.
pub struct ClassificationEngine {
    prefs: Preferences,
    classifier: Arc<RemoteClassifier>,
}

impl ClassificationEngine {
    pub fn new(prefs: Preferences, classifier: Arc<RemoteClassifier>) -> Self {
        Self { prefs, classifier }
    }

    pub async fn classify(&self, post: &PostRecord) -> Verdict {
        if is_promoted(post) {
            return Verdict::cringe(PROMOTED_REASON);
        }

        let muted_words = match self.prefs.muted_words().await {
            Ok(words) => words,
            Err(err) => {
                tracing::warn!(target: "engine", error = %err, "failed to read muted words");
                Default::default()
            }
        };
        let fields = [
            &post.actor_name,
            &post.actor_description,
            &post.actor_sub_description,
            &post.post_content,
        ];
        if fields
            .iter()
            .any(|field| contains_muted_words(field, muted_words.as_slice()))
        {
            return Verdict::cringe(MUTED_WORDS_REASON);
        }

        match self.classify_remotely(post).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::error!(
                    target: "engine",
                    error = %err,
                    platform = %post.platform,
                    "remote classification failed; leaving post visible"
                );
                Verdict::clean()
            }
        }
    }

    async fn classify_remotely(&self, post: &PostRecord) -> anyhow::Result<Verdict> {
        let Some(api_key) = self.prefs.api_key_if_enabled().await? else {
            return Ok(Verdict::clean());
        };
        let filters = self.prefs.filters().await?;
        let custom = self.prefs.custom_prompt().await?;
        let system_prompt = compose_system_prompt(post.platform, &filters, custom.as_ref());

        let verdict = self
            .classifier
            .classify(&api_key, system_prompt, post.platform, &post.post_content)
            .await?;
        tracing::debug!(
            target: "engine",
            cringe = verdict.is_cringe,
            reason = verdict.reason.as_deref(),
            "remote verdict"
        );
        Ok(verdict)
    }
}

fn is_promoted(post: &PostRecord) -> bool {
    [&post.actor_description, &post.actor_sub_description]
        .iter()
        .any(|field| field.to_lowercase().contains("promoted"))
}
