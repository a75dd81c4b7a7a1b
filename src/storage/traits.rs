//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use crate::storage::{ExtractedPage, InsertOutcome, PageRecord};
use crate::HarvestError;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for record store implementations
///
/// The store is append-only and keyed by URL. Uniqueness of the key is the
/// store's responsibility, not the caller's.
pub trait Storage {
    /// Ensures the backing table exists; idempotent
    fn initialize(&mut self) -> StorageResult<()>;

    /// Returns every URL currently stored
    fn existing_urls(&self) -> StorageResult<HashSet<String>>;

    /// Inserts a record unless its URL is already present
    ///
    /// A key collision is not an error: it yields [`InsertOutcome::Duplicate`]
    /// and leaves the stored row untouched. Text fields are sanitized first.
    fn insert_if_absent(&mut self, url: &str, page: &ExtractedPage)
        -> StorageResult<InsertOutcome>;

    /// Loads every record in insertion order
    fn load_all_records(&self) -> StorageResult<Vec<PageRecord>>;

    // ===== Statistics =====

    /// Gets total record count
    fn count_records(&self) -> StorageResult<u64>;

    /// Counts records with a non-empty part number
    fn count_with_part_no(&self) -> StorageResult<u64>;

    /// Counts records with a non-empty compatibility list
    fn count_with_compatibility(&self) -> StorageResult<u64>;

    /// Writes every record to `destination` as CSV, replacing any existing file
    ///
    /// Returns the number of data rows written.
    fn export_all(&self, destination: &Path) -> Result<usize, HarvestError> {
        let records = self.load_all_records()?;
        crate::output::write_csv(&records, destination)
    }
}
