pub const API_KEY: &str = "groqApiKey";
pub const IS_ENABLED: &str = "isEnabled";
pub const MUTED_WORDS: &str = "mutedWords";
pub const CUSTOM_PROMPT: &str = "customPrompt";
pub const FILTER_MODE: &str = "filterMode";
pub const CRINGE_COUNT: &str = "cringeCount";
pub const TIME_SAVED_IN_MINUTES: &str = "timeSavedInMinutes";
