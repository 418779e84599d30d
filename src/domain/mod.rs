pub mod post;
pub mod types;

pub use post::{Platform, PostRecord};
pub use types::{
    CustomPrompt, DisplayMode, FilterCategory, FilterConfig, MutedWords, QueueSnapshot,
    StatsCounters, Verdict,
};
