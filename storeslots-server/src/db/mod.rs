use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use storeslots::persistence::{
    ConfigKey, ConfigurationDocument, MemoryBackend, PageType, StoredConfiguration, Variant,
};
use storeslots::PersistenceError;

use crate::models::configuration::ConfigurationRow;

#[derive(Debug)]
pub enum StoreError {
    /// No draft to publish.
    NotFound,
    Conflict { expected: i64, actual: Option<i64> },
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<PersistenceError> for StoreError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::Conflict { expected, actual } => {
                StoreError::Conflict { expected, actual }
            }
            PersistenceError::NothingToPublish { .. } => StoreError::NotFound,
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Where page configurations are kept: Postgres when a database is
/// configured, otherwise process memory.
#[derive(Clone)]
pub enum ConfigStore {
    Postgres(PgPool),
    Memory(MemoryBackend),
}

impl ConfigStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./src/db/migrations").run(&pool).await?;
        Ok(ConfigStore::Postgres(pool))
    }

    pub fn memory() -> Self {
        ConfigStore::Memory(MemoryBackend::new())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConfigStore::Postgres(_) => "postgres",
            ConfigStore::Memory(_) => "memory",
        }
    }

    pub async fn fetch(&self, key: &ConfigKey) -> Result<Option<StoredConfiguration>, StoreError> {
        match self {
            ConfigStore::Memory(backend) => Ok(backend.get(key)),
            ConfigStore::Postgres(pool) => {
                let row = sqlx::query_as::<_, ConfigurationRow>(
                    "SELECT document, version, updated_at, updated_by
                     FROM page_configurations
                     WHERE store_id = $1 AND page_type = $2 AND variant = $3 AND NOT discarded",
                )
                .bind(&key.store_id)
                .bind(key.page_type.as_str())
                .bind(key.variant.as_str())
                .fetch_optional(pool)
                .await?;
                Ok(row.map(|r| r.into_stored(key)))
            }
        }
    }

    /// Write the draft. `expected_version`: `None` overwrites, `Some(0)`
    /// only creates, `Some(n)` only replaces version `n`. Versions keep
    /// increasing across a discard.
    pub async fn save_draft(
        &self,
        store_id: &str,
        page_type: PageType,
        document: &ConfigurationDocument,
        expected_version: Option<i64>,
        updated_by: &str,
    ) -> Result<StoredConfiguration, StoreError> {
        let key = ConfigKey::draft(store_id, page_type);
        let pool = match self {
            ConfigStore::Memory(backend) => {
                return Ok(backend.put(&key, document, expected_version, Some(updated_by))?);
            }
            ConfigStore::Postgres(pool) => pool,
        };

        let row = match expected_version {
            None => {
                sqlx::query_as::<_, ConfigurationRow>(
                    "INSERT INTO page_configurations
                         (store_id, page_type, variant, document, version, updated_at, updated_by)
                     VALUES ($1, $2, 'draft', $3, 1, NOW(), $4)
                     ON CONFLICT (store_id, page_type, variant)
                     DO UPDATE SET document = EXCLUDED.document,
                                   version = page_configurations.version + 1,
                                   updated_at = NOW(),
                                   updated_by = EXCLUDED.updated_by,
                                   discarded = FALSE
                     RETURNING document, version, updated_at, updated_by",
                )
                .bind(store_id)
                .bind(page_type.as_str())
                .bind(Json(document))
                .bind(updated_by)
                .fetch_optional(pool)
                .await?
            }
            Some(0) => {
                sqlx::query_as::<_, ConfigurationRow>(
                    "INSERT INTO page_configurations
                         (store_id, page_type, variant, document, version, updated_at, updated_by)
                     VALUES ($1, $2, 'draft', $3, 1, NOW(), $4)
                     ON CONFLICT (store_id, page_type, variant)
                     DO UPDATE SET document = EXCLUDED.document,
                                   version = page_configurations.version + 1,
                                   updated_at = NOW(),
                                   updated_by = EXCLUDED.updated_by,
                                   discarded = FALSE
                     WHERE page_configurations.discarded
                     RETURNING document, version, updated_at, updated_by",
                )
                .bind(store_id)
                .bind(page_type.as_str())
                .bind(Json(document))
                .bind(updated_by)
                .fetch_optional(pool)
                .await?
            }
            Some(expected) => {
                sqlx::query_as::<_, ConfigurationRow>(
                    "UPDATE page_configurations
                     SET document = $3, version = version + 1, updated_at = NOW(), updated_by = $4
                     WHERE store_id = $1 AND page_type = $2 AND variant = 'draft'
                       AND version = $5 AND NOT discarded
                     RETURNING document, version, updated_at, updated_by",
                )
                .bind(store_id)
                .bind(page_type.as_str())
                .bind(Json(document))
                .bind(updated_by)
                .bind(expected)
                .fetch_optional(pool)
                .await?
            }
        };

        match row {
            Some(row) => Ok(row.into_stored(&key)),
            None => {
                let actual = self.fetch(&key).await?.map(|c| c.version);
                Err(StoreError::Conflict {
                    expected: expected_version.unwrap_or_default(),
                    actual,
                })
            }
        }
    }

    /// Copy the draft over the published variant.
    pub async fn publish(
        &self,
        store_id: &str,
        page_type: PageType,
        updated_by: &str,
    ) -> Result<StoredConfiguration, StoreError> {
        match self {
            ConfigStore::Memory(backend) => {
                Ok(backend.promote_draft(store_id, page_type, Some(updated_by))?)
            }
            ConfigStore::Postgres(pool) => {
                let row = sqlx::query_as::<_, ConfigurationRow>(
                    "INSERT INTO page_configurations
                         (store_id, page_type, variant, document, version, updated_at, updated_by)
                     SELECT store_id, page_type, 'published', document, 1, NOW(), $3
                     FROM page_configurations
                     WHERE store_id = $1 AND page_type = $2 AND variant = 'draft' AND NOT discarded
                     ON CONFLICT (store_id, page_type, variant)
                     DO UPDATE SET document = EXCLUDED.document,
                                   version = page_configurations.version + 1,
                                   updated_at = NOW(),
                                   updated_by = EXCLUDED.updated_by,
                                   discarded = FALSE
                     RETURNING document, version, updated_at, updated_by",
                )
                .bind(store_id)
                .bind(page_type.as_str())
                .bind(updated_by)
                .fetch_optional(pool)
                .await?
                .ok_or(StoreError::NotFound)?;
                Ok(row.into_stored(&ConfigKey::published(store_id, page_type)))
            }
        }
    }

    pub async fn discard_draft(&self, store_id: &str, page_type: PageType) -> Result<bool, StoreError> {
        let key = ConfigKey::new(store_id, page_type, Variant::Draft);
        match self {
            ConfigStore::Memory(backend) => Ok(backend.remove(&key)),
            ConfigStore::Postgres(pool) => {
                // The row stays behind so a re-created draft continues its version.
                let result = sqlx::query(
                    "UPDATE page_configurations
                     SET discarded = TRUE, updated_at = NOW()
                     WHERE store_id = $1 AND page_type = $2 AND variant = 'draft' AND NOT discarded",
                )
                .bind(store_id)
                .bind(page_type.as_str())
                .execute(pool)
                .await?;
                Ok(result.rows_affected() > 0)
            }
        }
    }
}
