use anyhow::Result;
use futures::future::BoxFuture;
use parking_lot::Mutex;

use super::{PreferenceMap, PreferenceStore};

#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<PreferenceMap>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: PreferenceMap) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<PreferenceMap>> {
        Box::pin(async move {
            let values = self.values.lock();
            Ok(keys
                .iter()
                .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect())
        })
    }

    fn set(&self, values: PreferenceMap) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.values.lock().extend(values);
            Ok(())
        })
    }
}
