use anyhow::{Context, Result};
use futures::future::BoxFuture;
use sqlx::{sqlite::SqlitePool, Row};

use crate::store::{PreferenceMap, PreferenceStore};

/// Durable preference storage: one row per key, values kept as JSON text.
#[derive(Clone)]
pub struct SqlitePreferenceStore {
    pool: SqlitePool,
}

impl SqlitePreferenceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn read(&self, keys: &[&str]) -> Result<PreferenceMap> {
        let mut values = PreferenceMap::with_capacity(keys.len());
        for key in keys {
            let row = sqlx::query(r#"SELECT value FROM preferences WHERE key = ?1"#)
                .bind(*key)
                .fetch_optional(&self.pool)
                .await?;
            let Some(row) = row else {
                continue;
            };
            let raw: String = row.try_get("value")?;
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    values.insert(key.to_string(), value);
                }
                Err(err) => {
                    tracing::warn!(
                        target: "store",
                        key = *key,
                        error = %err,
                        "ignoring undecodable preference value"
                    );
                }
            }
        }
        Ok(values)
    }

    async fn write(&self, values: PreferenceMap) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in values {
            let encoded = serde_json::to_string(&value)
                .with_context(|| format!("failed to encode preference {key}"))?;
            sqlx::query(
                r#"INSERT OR REPLACE INTO preferences (key, value, updated_at)
                    VALUES (?1, ?2, CURRENT_TIMESTAMP)"#,
            )
            .bind(&key)
            .bind(encoded)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> BoxFuture<'a, Result<PreferenceMap>> {
        Box::pin(self.read(keys))
    }

    fn set(&self, values: PreferenceMap) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.write(values))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{db::init_pool, domain::DisplayMode, store::Preferences};

    #[tokio::test]
    async fn values_survive_reopening_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("preferences.db");

        let store = SqlitePreferenceStore::new(init_pool(&db_path).await.unwrap());
        let mut values = PreferenceMap::new();
        values.insert("mutedWords".into(), json!(["crypto", "hustle"]));
        values.insert("isEnabled".into(), json!(true));
        store.set(values).await.unwrap();
        store.close().await;

        let reopened = SqlitePreferenceStore::new(init_pool(&db_path).await.unwrap());
        let read = reopened
            .get(&["mutedWords", "isEnabled", "missing"])
            .await
            .unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read["mutedWords"], json!(["crypto", "hustle"]));
        assert_eq!(read["isEnabled"], json!(true));
        reopened.close().await;
    }

    #[tokio::test]
    async fn typed_preferences_work_over_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqlitePreferenceStore::new(
            init_pool(&dir.path().join("prefs.db")).await.unwrap(),
        ));
        let prefs = Preferences::new(store.clone());

        prefs.set_display_mode(DisplayMode::Remove).await.unwrap();
        prefs.set_display_mode(DisplayMode::Remove).await.unwrap();
        assert_eq!(prefs.display_mode().await.unwrap(), DisplayMode::Remove);
        store.close().await;
    }
}
