//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{sanitize_text, ExtractedPage, InsertOutcome, PageRecord};
use crate::HarvestError;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and bootstraps the schema
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        // Separate connections to the same file may write concurrently
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count_where(&self, query: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(query, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    fn initialize(&mut self) -> StorageResult<()> {
        initialize_schema(&self.conn)?;
        Ok(())
    }

    fn existing_urls(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM pages WHERE url IS NOT NULL")?;

        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(urls)
    }

    fn insert_if_absent(
        &mut self,
        url: &str,
        page: &ExtractedPage,
    ) -> StorageResult<InsertOutcome> {
        // Each statement runs in its own implicit transaction; the UNIQUE
        // constraint decides the winner when two writers race on one url.
        let changed = self.conn.execute(
            "INSERT INTO pages (url, part_no, adaptable_for, orig_part_no) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO NOTHING",
            params![
                url,
                sanitize_text(&page.part_no),
                sanitize_text(&page.adaptable_for),
                sanitize_text(&page.orig_part_no),
            ],
        )?;

        if changed == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted(self.conn.last_insert_rowid()))
        }
    }

    fn load_all_records(&self) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, part_no, adaptable_for, orig_part_no FROM pages ORDER BY id ASC",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(PageRecord {
                    id: row.get(0)?,
                    url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    part_no: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    adaptable_for: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    orig_part_no: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    // ===== Statistics =====

    fn count_records(&self) -> StorageResult<u64> {
        self.count_where("SELECT COUNT(*) FROM pages")
    }

    fn count_with_part_no(&self) -> StorageResult<u64> {
        self.count_where("SELECT COUNT(*) FROM pages WHERE COALESCE(part_no, '') <> ''")
    }

    fn count_with_compatibility(&self) -> StorageResult<u64> {
        self.count_where(
            "SELECT COUNT(*) FROM pages
             WHERE COALESCE(adaptable_for, '') <> '' OR COALESCE(orig_part_no, '') <> ''",
        )
    }
}
