//! Storage module for persisting harvested records
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema bootstrap
//! - Existing-URL preload used to skip already harvested pages
//! - Insert-if-absent writes guarded by a UNIQUE url constraint
//! - Ordered read-back for export and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::sync::{Arc, Mutex, MutexGuard};

/// A store shared between concurrent link tasks
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Locks a shared store, surfacing poisoning as a storage error
pub fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// The three fields extracted from one product page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub part_no: String,
    /// Comma-joined list, parallel to `orig_part_no`
    pub adaptable_for: String,
    pub orig_part_no: String,
}

impl ExtractedPage {
    /// True when no field carries data; such pages are never stored
    pub fn is_empty(&self) -> bool {
        self.part_no.is_empty() && self.adaptable_for.is_empty() && self.orig_part_no.is_empty()
    }
}

/// Represents a page row in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub part_no: String,
    pub adaptable_for: String,
    pub orig_part_no: String,
}

/// Result of an insert-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written with this id
    Inserted(i64),
    /// The URL was already stored; nothing changed
    Duplicate,
}

/// Drops characters that mark undecodable input before text is stored
///
/// Page bodies are decoded lossily, so invalid byte sequences surface as
/// U+FFFD. Those and NUL bytes are removed.
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER && *c != '\0')
        .collect()
}
