pub mod engine;
pub mod matcher;
pub mod session;
pub mod stats;
pub mod suppressor;

pub use engine::ClassificationEngine;
pub use session::SessionContext;
pub use stats::StatsRecorder;
