use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_MUTED_WORDS: usize = 20;
pub const MIN_CUSTOM_PROMPT_WORDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Verdict {
    pub is_cringe: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn cringe(reason: impl Into<String>) -> Self {
        Self {
            is_cringe: true,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterCategory {
    Misleading,
    Harassment,
    Superficiality,
    LowEffort,
    IntrusiveAds,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 5] = [
        FilterCategory::Misleading,
        FilterCategory::Harassment,
        FilterCategory::Superficiality,
        FilterCategory::LowEffort,
        FilterCategory::IntrusiveAds,
    ];

    pub fn storage_key(&self) -> &'static str {
        match self {
            FilterCategory::Misleading => "filterMisleading",
            FilterCategory::Harassment => "filterHarassment",
            FilterCategory::Superficiality => "filterSuperficiality",
            FilterCategory::LowEffort => "filterLowEffort",
            FilterCategory::IntrusiveAds => "filterIntrusiveAds",
        }
    }

    /// Criterion sentence sent to the model when the category is active.
    pub fn clause(&self) -> &'static str {
        match self {
            FilterCategory::Misleading => {
                "Contains misleading or out-of-context information, including scams, phishing, hoaxes, or deliberate misinformation"
            }
            FilterCategory::Harassment => {
                "Contains trolling, cyberbullying, harassment, or personal attacks"
            }
            FilterCategory::Superficiality => {
                "Promotes an obviously inauthentic, overly-curated, or misleading version of the author"
            }
            FilterCategory::LowEffort => {
                "Uses low-effort engagement like 'Tag 3 people' or 'like if you agree' with no substance or tech-related discussion"
            }
            FilterCategory::IntrusiveAds => {
                "Brand promotional content or ads that are intrusive, disruptive, or irrelevant to the professional feed"
            }
        }
    }
}

/// Per-category toggles. Unset toggles count as enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub misleading: bool,
    pub harassment: bool,
    pub superficiality: bool,
    pub low_effort: bool,
    pub intrusive_ads: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            misleading: true,
            harassment: true,
            superficiality: true,
            low_effort: true,
            intrusive_ads: true,
        }
    }
}

impl FilterConfig {
    pub fn none() -> Self {
        Self {
            misleading: false,
            harassment: false,
            superficiality: false,
            low_effort: false,
            intrusive_ads: false,
        }
    }

    pub fn is_enabled(&self, category: FilterCategory) -> bool {
        match category {
            FilterCategory::Misleading => self.misleading,
            FilterCategory::Harassment => self.harassment,
            FilterCategory::Superficiality => self.superficiality,
            FilterCategory::LowEffort => self.low_effort,
            FilterCategory::IntrusiveAds => self.intrusive_ads,
        }
    }

    pub fn set(&mut self, category: FilterCategory, enabled: bool) {
        let slot = match category {
            FilterCategory::Misleading => &mut self.misleading,
            FilterCategory::Harassment => &mut self.harassment,
            FilterCategory::Superficiality => &mut self.superficiality,
            FilterCategory::LowEffort => &mut self.low_effort,
            FilterCategory::IntrusiveAds => &mut self.intrusive_ads,
        };
        *slot = enabled;
    }

    pub fn active(&self) -> Vec<FilterCategory> {
        FilterCategory::ALL
            .into_iter()
            .filter(|category| self.is_enabled(*category))
            .collect()
    }
}

/// User-written system instruction. Only prompts with at least
/// [`MIN_CUSTOM_PROMPT_WORDS`] words are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomPrompt(String);

impl CustomPrompt {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.split_whitespace().count() >= MIN_CUSTOM_PROMPT_WORDS {
            Some(Self(trimmed.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutedWordError {
    #[error("muted word is empty")]
    Empty,
    #[error("muted word {0:?} is already in the list")]
    Duplicate(String),
    #[error("muted word list is full ({MAX_MUTED_WORDS} entries)")]
    Full,
}

/// Ordered, lowercase, duplicate-free list of at most [`MAX_MUTED_WORDS`] words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutedWords(Vec<String>);

impl MutedWords {
    /// Rebuilds the list from whatever the store holds, dropping entries that
    /// would break the list invariants.
    pub fn from_stored<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for word in words {
            let _ = list.try_add(word.as_ref());
        }
        list
    }

    pub fn try_add(&mut self, raw: &str) -> Result<&str, MutedWordError> {
        let word = raw.trim().to_lowercase();
        if word.is_empty() {
            return Err(MutedWordError::Empty);
        }
        if self.0.contains(&word) {
            return Err(MutedWordError::Duplicate(word));
        }
        if self.0.len() >= MAX_MUTED_WORDS {
            return Err(MutedWordError::Full);
        }
        self.0.push(word);
        Ok(self.0.last().map(String::as_str).unwrap_or_default())
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Blur,
    Remove,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Blur => "blur",
            DisplayMode::Remove => "remove",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "blur" => Ok(DisplayMode::Blur),
            "remove" => Ok(DisplayMode::Remove),
            other => Err(format!("unknown display mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsCounters {
    pub cringe_count: u64,
    pub time_saved_in_minutes: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueSnapshot {
    pub queued: usize,
    pub outstanding: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_prompt_needs_five_words() {
        assert!(CustomPrompt::parse("flag anything about crypto").is_none());
        assert!(CustomPrompt::parse("   ").is_none());
        let prompt = CustomPrompt::parse("  flag anything about crypto please ").unwrap();
        assert_eq!(prompt.as_str(), "flag anything about crypto please");
    }

    #[test]
    fn muted_words_keep_invariants() {
        let mut words = MutedWords::default();
        assert_eq!(words.try_add("  Crypto "), Ok("crypto"));
        assert_eq!(
            words.try_add("CRYPTO"),
            Err(MutedWordError::Duplicate("crypto".into()))
        );
        assert_eq!(words.try_add("   "), Err(MutedWordError::Empty));

        for i in 1..MAX_MUTED_WORDS {
            words.try_add(&format!("word{i}")).unwrap();
        }
        assert_eq!(words.len(), MAX_MUTED_WORDS);
        assert_eq!(words.try_add("overflow"), Err(MutedWordError::Full));

        assert_eq!(words.remove(0).as_deref(), Some("crypto"));
        assert_eq!(words.remove(99), None);
        words.clear();
        assert!(words.is_empty());
    }

    #[test]
    fn stored_muted_words_are_normalized() {
        let words = MutedWords::from_stored(["Hustle", "", "hustle", "grind"]);
        assert_eq!(words.as_slice(), ["hustle".to_string(), "grind".to_string()]);
    }

    #[test]
    fn filter_defaults_are_all_enabled() {
        let filters = FilterConfig::default();
        assert_eq!(filters.active(), FilterCategory::ALL.to_vec());

        let mut filters = FilterConfig::none();
        assert!(filters.active().is_empty());
        filters.set(FilterCategory::LowEffort, true);
        assert_eq!(filters.active(), vec![FilterCategory::LowEffort]);
    }

    #[test]
    fn display_mode_parses_case_insensitively() {
        assert_eq!("Remove".parse::<DisplayMode>(), Ok(DisplayMode::Remove));
        assert_eq!("blur".parse::<DisplayMode>(), Ok(DisplayMode::Blur));
        assert!("fade".parse::<DisplayMode>().is_err());
        assert_eq!(DisplayMode::default(), DisplayMode::Blur);
    }
}
