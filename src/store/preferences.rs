use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};

use crate::domain::{
    CustomPrompt, DisplayMode, FilterCategory, FilterConfig, MutedWords, StatsCounters,
};

use super::{keys, PreferenceMap, PreferenceStore};

/// Typed reads and writes over a [`PreferenceStore`]. Nothing is cached:
/// every call goes back to the store so setting changes apply to the next
/// post.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    async fn get_one(&self, key: &str) -> Result<Option<Value>> {
        let keys = [key];
        let mut values = self.store.get(&keys).await?;
        Ok(values.remove(key))
    }

    async fn set_one(&self, key: &str, value: Value) -> Result<()> {
        let mut values = PreferenceMap::new();
        values.insert(key.to_string(), value);
        self.store.set(values).await
    }

    /// The classifier credential, but only while the guard is switched on.
    pub async fn api_key_if_enabled(&self) -> Result<Option<String>> {
        let values = self.store.get(&[keys::API_KEY, keys::IS_ENABLED]).await?;
        let enabled = values
            .get(keys::IS_ENABLED)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let api_key = values
            .get(keys::API_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|key| !key.is_empty());
        match api_key {
            Some(key) if enabled => Ok(Some(key.to_string())),
            _ => {
                tracing::warn!(
                    target: "store",
                    enabled,
                    has_key = api_key.is_some(),
                    "classifier API key not found or guard is disabled"
                );
                Ok(None)
            }
        }
    }

    pub async fn muted_words(&self) -> Result<MutedWords> {
        let words = self
            .get_one(keys::MUTED_WORDS)
            .await?
            .and_then(|value| value.as_array().cloned())
            .unwrap_or_default();
        Ok(MutedWords::from_stored(
            words.iter().filter_map(Value::as_str),
        ))
    }

    pub async fn custom_prompt(&self) -> Result<Option<CustomPrompt>> {
        Ok(self
            .get_one(keys::CUSTOM_PROMPT)
            .await?
            .as_ref()
            .and_then(Value::as_str)
            .and_then(CustomPrompt::parse))
    }

    pub async fn filters(&self) -> Result<FilterConfig> {
        let keys: Vec<&str> = FilterCategory::ALL
            .iter()
            .map(FilterCategory::storage_key)
            .collect();
        let values = self.store.get(&keys).await?;
        let mut filters = FilterConfig::default();
        for category in FilterCategory::ALL {
            if let Some(enabled) = values.get(category.storage_key()).and_then(Value::as_bool) {
                filters.set(category, enabled);
            }
        }
        Ok(filters)
    }

    pub async fn display_mode(&self) -> Result<DisplayMode> {
        Ok(self
            .get_one(keys::FILTER_MODE)
            .await?
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub async fn stats(&self) -> Result<StatsCounters> {
        let values = self
            .store
            .get(&[keys::CRINGE_COUNT, keys::TIME_SAVED_IN_MINUTES])
            .await?;
        Ok(StatsCounters {
            cringe_count: values
                .get(keys::CRINGE_COUNT)
                .and_then(number_as_f64)
                .map(|count| count.max(0.0) as u64)
                .unwrap_or(0),
            time_saved_in_minutes: values
                .get(keys::TIME_SAVED_IN_MINUTES)
                .and_then(number_as_f64)
                .unwrap_or(0.0),
        })
    }

    pub async fn save_stats(&self, stats: StatsCounters) -> Result<()> {
        let mut values = PreferenceMap::new();
        values.insert(keys::CRINGE_COUNT.to_string(), json!(stats.cringe_count));
        values.insert(
            keys::TIME_SAVED_IN_MINUTES.to_string(),
            json!(stats.time_saved_in_minutes),
        );
        self.store.set(values).await
    }

    pub async fn save_api_key(&self, raw: &str) -> Result<bool> {
        let key = raw.trim();
        if key.is_empty() {
            return Ok(false);
        }
        self.set_one(keys::API_KEY, json!(key)).await?;
        Ok(true)
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.set_one(keys::IS_ENABLED, json!(enabled)).await
    }

    pub async fn add_muted_word(&self, raw: &str) -> Result<bool> {
        let mut words = self.muted_words().await?;
        if let Err(err) = words.try_add(raw) {
            tracing::debug!(target: "store", error = %err, "muted word rejected");
            return Ok(false);
        }
        self.save_muted_words(&words).await?;
        Ok(true)
    }

    pub async fn remove_muted_word(&self, index: usize) -> Result<Option<String>> {
        let mut words = self.muted_words().await?;
        let removed = words.remove(index);
        if removed.is_some() {
            self.save_muted_words(&words).await?;
        }
        Ok(removed)
    }

    pub async fn clear_muted_words(&self) -> Result<()> {
        self.save_muted_words(&MutedWords::default()).await
    }

    async fn save_muted_words(&self, words: &MutedWords) -> Result<()> {
        self.set_one(keys::MUTED_WORDS, json!(words.as_slice())).await
    }

    /// Stores the prompt only when it is long enough to be used.
    pub async fn save_custom_prompt(&self, raw: &str) -> Result<bool> {
        match CustomPrompt::parse(raw) {
            Some(prompt) => {
                self.set_one(keys::CUSTOM_PROMPT, json!(prompt.as_str()))
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn save_filters(&self, filters: FilterConfig) -> Result<()> {
        let values = FilterCategory::ALL
            .into_iter()
            .map(|category| {
                (
                    category.storage_key().to_string(),
                    json!(filters.is_enabled(category)),
                )
            })
            .collect();
        self.store.set(values).await
    }

    pub async fn set_display_mode(&self, mode: DisplayMode) -> Result<()> {
        self.set_one(keys::FILTER_MODE, json!(mode.as_str())).await
    }
}

fn number_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPreferenceStore;

    fn prefs_with(values: PreferenceMap) -> Preferences {
        Preferences::new(Arc::new(MemoryPreferenceStore::with_values(values)))
    }

    #[tokio::test]
    async fn unset_preferences_fall_back_to_defaults() {
        let prefs = prefs_with(PreferenceMap::new());
        assert_eq!(prefs.api_key_if_enabled().await.unwrap(), None);
        assert!(prefs.muted_words().await.unwrap().is_empty());
        assert_eq!(prefs.custom_prompt().await.unwrap(), None);
        assert_eq!(prefs.filters().await.unwrap(), FilterConfig::default());
        assert_eq!(prefs.display_mode().await.unwrap(), DisplayMode::Blur);
        assert_eq!(prefs.stats().await.unwrap(), StatsCounters::default());
    }

    #[tokio::test]
    async fn api_key_requires_enabled_flag() {
        let prefs = prefs_with(PreferenceMap::new());
        assert!(prefs.save_api_key("  xai-123  ").await.unwrap());
        assert!(!prefs.save_api_key("   ").await.unwrap());
        assert_eq!(prefs.api_key_if_enabled().await.unwrap(), None);

        prefs.set_enabled(true).await.unwrap();
        assert_eq!(
            prefs.api_key_if_enabled().await.unwrap().as_deref(),
            Some("xai-123")
        );
    }

    #[tokio::test]
    async fn filters_read_individual_toggles() {
        let mut values = PreferenceMap::new();
        values.insert("filterHarassment".into(), json!(false));
        values.insert("filterLowEffort".into(), json!("yes"));
        let prefs = prefs_with(values);

        let filters = prefs.filters().await.unwrap();
        assert!(!filters.harassment);
        assert!(filters.low_effort);
        assert!(filters.misleading);

        prefs.save_filters(FilterConfig::none()).await.unwrap();
        assert!(prefs.filters().await.unwrap().active().is_empty());
    }

    #[tokio::test]
    async fn muted_word_edits_are_persisted() {
        let prefs = prefs_with(PreferenceMap::new());
        assert!(prefs.add_muted_word("Crypto").await.unwrap());
        assert!(!prefs.add_muted_word("crypto").await.unwrap());
        assert!(prefs.add_muted_word("grindset").await.unwrap());
        assert_eq!(
            prefs.muted_words().await.unwrap().as_slice(),
            ["crypto".to_string(), "grindset".to_string()]
        );

        assert_eq!(
            prefs.remove_muted_word(0).await.unwrap().as_deref(),
            Some("crypto")
        );
        prefs.clear_muted_words().await.unwrap();
        assert!(prefs.muted_words().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_custom_prompts_are_not_saved() {
        let prefs = prefs_with(PreferenceMap::new());
        assert!(!prefs.save_custom_prompt("too short").await.unwrap());
        assert_eq!(prefs.custom_prompt().await.unwrap(), None);

        assert!(prefs
            .save_custom_prompt("Flag every post about quarterly earnings")
            .await
            .unwrap());
        assert_eq!(
            prefs.custom_prompt().await.unwrap().unwrap().as_str(),
            "Flag every post about quarterly earnings"
        );
    }

    #[tokio::test]
    async fn stats_accept_stringly_numbers() {
        let mut values = PreferenceMap::new();
        values.insert("cringeCount".into(), json!(3));
        values.insert("timeSavedInMinutes".into(), json!("1.5"));
        let prefs = prefs_with(values);
        assert_eq!(
            prefs.stats().await.unwrap(),
            StatsCounters {
                cringe_count: 3,
                time_saved_in_minutes: 1.5,
            }
        );
    }
}
