use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

use crate::persistence::{ConfigurationDocument, PageType};

/// A draft whose save did not reach the configuration service.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDraft {
    pub store_id: String,
    pub page_type: PageType,
    pub document: ConfigurationDocument,
    pub base_version: Option<i64>,
    pub stashed_at: i64,
}

/// Local SQLite cache of unsaved drafts, one per (store, page type).
pub struct DraftCache {
    conn: Mutex<Connection>,
}

impl DraftCache {
    pub fn open(data_dir: PathBuf) -> SqliteResult<Self> {
        std::fs::create_dir_all(&data_dir).ok();
        let db_path = data_dir.join("storeslots-drafts.db");
        log::info!("draft cache: {}", db_path.display());
        Self::with_connection(Connection::open(&db_path)?)
    }

    pub fn in_memory() -> SqliteResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SqliteResult<Self> {
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.run_migrations()?;
        Ok(cache)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run_migrations(&self) -> SqliteResult<()> {
        self.conn().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS pending_drafts (
                store_id TEXT NOT NULL,
                page_type TEXT NOT NULL,
                document TEXT NOT NULL,
                base_version INTEGER,
                stashed_at INTEGER NOT NULL,
                PRIMARY KEY (store_id, page_type)
            );

            CREATE INDEX IF NOT EXISTS idx_stashed_at ON pending_drafts(stashed_at);
            ",
        )
    }

    /// Keep `document` for later, replacing anything stashed for the same page.
    pub fn stash(
        &self,
        store_id: &str,
        page_type: PageType,
        document: &ConfigurationDocument,
        base_version: Option<i64>,
    ) -> SqliteResult<()> {
        let json = serde_json::to_string(document)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.conn().execute(
            "INSERT OR REPLACE INTO pending_drafts
             (store_id, page_type, document, base_version, stashed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                store_id,
                page_type.as_str(),
                json,
                base_version,
                chrono::Utc::now().timestamp_millis(),
            ],
        )?;
        log::info!("draft cache: stashed {}/{}", store_id, page_type);
        Ok(())
    }

    pub fn peek(&self, store_id: &str, page_type: PageType) -> SqliteResult<Option<PendingDraft>> {
        self.conn()
            .query_row(
                "SELECT store_id, page_type, document, base_version, stashed_at
                 FROM pending_drafts WHERE store_id = ?1 AND page_type = ?2",
                params![store_id, page_type.as_str()],
                read_pending,
            )
            .optional()
    }

    /// Remove and return the stashed draft for a page.
    pub fn take(&self, store_id: &str, page_type: PageType) -> SqliteResult<Option<PendingDraft>> {
        let pending = self.peek(store_id, page_type)?;
        if pending.is_some() {
            self.discard(store_id, page_type)?;
        }
        Ok(pending)
    }

    pub fn discard(&self, store_id: &str, page_type: PageType) -> SqliteResult<bool> {
        let rows = self.conn().execute(
            "DELETE FROM pending_drafts WHERE store_id = ?1 AND page_type = ?2",
            params![store_id, page_type.as_str()],
        )?;
        Ok(rows > 0)
    }

    /// All stashed drafts, oldest first.
    pub fn pending(&self) -> SqliteResult<Vec<PendingDraft>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT store_id, page_type, document, base_version, stashed_at
             FROM pending_drafts
             ORDER BY stashed_at ASC",
        )?;
        let drafts = stmt.query_map([], read_pending)?.collect::<SqliteResult<Vec<_>>>()?;
        Ok(drafts)
    }

    /// (store, page type) of every stashed draft.
    pub fn pending_keys(&self) -> SqliteResult<Vec<(String, PageType)>> {
        Ok(self
            .pending()?
            .into_iter()
            .map(|p| (p.store_id, p.page_type))
            .collect())
    }
}

fn read_pending(row: &Row<'_>) -> SqliteResult<PendingDraft> {
    let page_type: String = row.get(1)?;
    let document: String = row.get(2)?;
    Ok(PendingDraft {
        store_id: row.get(0)?,
        page_type: page_type.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
        })?,
        document: serde_json::from_str(&document).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        base_version: row.get(3)?,
        stashed_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Baseline;

    #[test]
    fn stash_peek_take() {
        let cache = DraftCache::in_memory().unwrap();
        let doc = Baseline::BuiltIn.resolve(PageType::Cart).unwrap();

        assert!(cache.peek("s1", PageType::Cart).unwrap().is_none());
        cache.stash("s1", PageType::Cart, &doc, Some(4)).unwrap();

        let pending = cache.peek("s1", PageType::Cart).unwrap().unwrap();
        assert_eq!(pending.document, doc);
        assert_eq!(pending.base_version, Some(4));

        assert!(cache.take("s1", PageType::Cart).unwrap().is_some());
        assert!(cache.take("s1", PageType::Cart).unwrap().is_none());
    }

    #[test]
    fn later_stash_replaces_earlier() {
        let cache = DraftCache::in_memory().unwrap();
        let first = Baseline::BuiltIn.resolve(PageType::Home).unwrap();
        let second = Baseline::BuiltIn.resolve(PageType::Success).unwrap();

        cache.stash("s1", PageType::Home, &first, None).unwrap();
        cache.stash("s1", PageType::Home, &second, Some(2)).unwrap();
        cache.stash("s2", PageType::Home, &first, None).unwrap();

        let all = cache.pending().unwrap();
        assert_eq!(all.len(), 2);
        let keys = cache.pending_keys().unwrap();
        assert!(keys.contains(&("s2".to_string(), PageType::Home)));
        let s1 = all.iter().find(|p| p.store_id == "s1").unwrap();
        assert_eq!(s1.document, second);
        assert!(cache.discard("s2", PageType::Home).unwrap());
        assert!(!cache.discard("s2", PageType::Home).unwrap());
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Baseline::BuiltIn.resolve(PageType::Checkout).unwrap();
        {
            let cache = DraftCache::open(dir.path().to_path_buf()).unwrap();
            cache.stash("s1", PageType::Checkout, &doc, None).unwrap();
        }
        let cache = DraftCache::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(cache.pending().unwrap()[0].document, doc);
    }
}
