pub mod env;
mod loader;

pub use env::{AppConfig, ClassifierConfig, DirectoryConfig, LoggingConfig, PreferenceSeed};
pub use loader::load_config;
