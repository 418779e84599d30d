use anyhow::Result;

use crate::{domain::StatsCounters, store::Preferences};

/// Rough reading time a hidden post would have cost, bucketed by word count.
pub fn estimate_time_saved_seconds(post_text: &str) -> u32 {
    match post_text.split_whitespace().count() {
        0..=20 => 5,
        21..=50 => 10,
        _ => 20,
    }
}

/// Read-modify-write of the persisted counters. There is no compare-and-swap,
/// so two suppressions landing between the same read and write count once.
pub struct StatsRecorder {
    prefs: Preferences,
}

impl StatsRecorder {
    pub fn new(prefs: Preferences) -> Self {
        Self { prefs }
    }

    pub async fn record_suppression(&self, post_text: &str) -> Result<StatsCounters> {
        let mut stats = self.prefs.stats().await?;
        stats.cringe_count += 1;
        stats.time_saved_in_minutes += f64::from(estimate_time_saved_seconds(post_text)) / 60.0;
        self.prefs.save_stats(stats).await?;
        tracing::debug!(
            target: "stats",
            cringe_count = stats.cringe_count,
            minutes_saved = stats.time_saved_in_minutes,
            "stats updated"
        );
        Ok(stats)
    }
}
