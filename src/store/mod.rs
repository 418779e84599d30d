//! Host key/value storage and the typed view the pipeline reads through.

pub mod keys;
mod memory;
mod preferences;

use std::collections::HashMap;

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

pub use memory::MemoryPreferenceStore;
pub use preferences::Preferences;

pub type PreferenceMap = HashMap<String, Value>;

/// Asynchronous key/value storage. Missing keys are simply absent from the
/// returned map.
pub trait PreferenceStore: Send + Sync {
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<PreferenceMap>>;

    fn set(&self, values: PreferenceMap) -> BoxFuture<'_, Result<()>>;
}
