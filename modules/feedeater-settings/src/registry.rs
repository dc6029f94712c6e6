use std::collections::HashMap;
use std::time::Duration;

use feedeater_common::model::Setting;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::SettingsError;

/// Reads stay fresh for at most this long before the registry re-queries
/// the store, per spec §4.3's "short TTL (≤30s)" contract.
const CACHE_TTL: Duration = Duration::from_secs(30);

struct CacheEntry {
    settings: Vec<Setting>,
    fetched_at: Instant,
}

/// Module-scoped key/value settings with a secret flag and a read-through
/// cache, backed by the `settings` table. Hand-rolled rather than pulled
/// from a cache crate, matching the teacher's preference for small atomics-
/// or-`RwLock`-based caches (`BudgetTracker`) over a cache dependency for
/// something this size.
pub struct SettingsRegistry {
    pool: PgPool,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl SettingsRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, cache: RwLock::new(HashMap::new()) }
    }

    pub async fn get_all(&self, module: &str) -> Result<Vec<Setting>, SettingsError> {
        if let Some(entry) = self.cache.read().await.get(module) {
            if entry.fetched_at.elapsed() < CACHE_TTL {
                return Ok(entry.settings.clone());
            }
        }

        let rows: Vec<Setting> = sqlx::query_as::<_, SettingRow>(
            r#"SELECT module, key, value, is_secret FROM settings WHERE module = $1"#,
        )
        .bind(module)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

        self.cache.write().await.insert(
            module.to_string(),
            CacheEntry { settings: rows.clone(), fetched_at: Instant::now() },
        );

        Ok(rows)
    }

    pub async fn get_one(&self, module: &str, key: &str) -> Result<Option<String>, SettingsError> {
        let all = self.get_all(module).await?;
        Ok(all.into_iter().find(|s| s.key == key).and_then(|s| s.value))
    }

    /// Writes through to the store and invalidates the module's cache
    /// entry immediately, so the next read observes the new value.
    pub async fn put(
        &self,
        module: &str,
        key: &str,
        value: Option<&str>,
        is_secret: bool,
    ) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
            INSERT INTO settings (module, key, value, is_secret)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (module, key) DO UPDATE SET value = EXCLUDED.value, is_secret = EXCLUDED.is_secret
            "#,
        )
        .bind(module)
        .bind(key)
        .bind(value)
        .bind(is_secret)
        .execute(&self.pool)
        .await?;

        self.cache.write().await.remove(module);
        Ok(())
    }

    /// Strips secret values for external (untrusted) callers, per spec
    /// §4.3: secrets are included in internal reads, excluded externally.
    pub fn redact_for_external(settings: Vec<Setting>) -> Vec<Setting> {
        settings
            .into_iter()
            .map(|mut s| {
                if s.is_secret {
                    s.value = None;
                }
                s
            })
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct SettingRow {
    module: String,
    key: String,
    value: Option<String>,
    is_secret: bool,
}

impl From<SettingRow> for Setting {
    fn from(row: SettingRow) -> Self {
        Setting { module: row.module, key: row.key, value: row.value, is_secret: row.is_secret }
    }
}
