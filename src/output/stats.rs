//! Harvest and store statistics
//!
//! This module provides the per-run [`HarvestReport`] and the store-wide
//! statistics shown by `--stats`.

use crate::storage::Storage;
use crate::HarvestError;
use chrono::{DateTime, Utc};

/// Counters describing one harvest run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Sitemap seeds requested
    pub sitemaps_requested: usize,
    /// Sitemap seeds that returned a document
    pub sitemaps_fetched: usize,
    /// Links extracted from all sitemaps, duplicates included
    pub links_found: usize,

    /// Links skipped because the store already held them
    pub skipped_existing: usize,
    /// New rows written
    pub stored: usize,
    /// Inserts that hit an existing url (e.g. listed by two sitemaps)
    pub duplicates: usize,
    /// Pages whose extraction produced no data
    pub empty: usize,
    /// Links that failed to fetch, parse or store
    pub failed: usize,
    /// Links abandoned because of a shutdown request
    pub cancelled: usize,
}

impl HarvestReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            sitemaps_requested: 0,
            sitemaps_fetched: 0,
            links_found: 0,
            skipped_existing: 0,
            stored: 0,
            duplicates: 0,
            empty: 0,
            failed: 0,
            cancelled: 0,
        }
    }

    /// Links that reached the fetch stage
    pub fn links_attempted(&self) -> usize {
        self.links_found.saturating_sub(self.skipped_existing)
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.sitemaps_fetched < self.sitemaps_requested
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints a harvest report to stdout
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Summary ===\n");

    println!("Sitemaps:");
    println!(
        "  Fetched: {} / {}",
        report.sitemaps_fetched, report.sitemaps_requested
    );
    println!("  Links found: {}", report.links_found);
    println!();

    println!("Links:");
    println!("  Skipped (already stored): {}", report.skipped_existing);
    println!("  Attempted: {}", report.links_attempted());
    println!("  Stored: {}", report.stored);
    println!("  Duplicates: {}", report.duplicates);
    println!("  No data: {}", report.empty);
    println!("  Failed: {}", report.failed);
    if report.cancelled > 0 {
        println!("  Cancelled: {}", report.cancelled);
    }
    println!();

    if let Some(seconds) = report.duration_seconds() {
        println!("Duration: {}s", seconds);
    }
}

/// Store-wide statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    pub total_records: u64,
    pub with_part_no: u64,
    pub with_compatibility: u64,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, HarvestError> {
    Ok(StoreStatistics {
        total_records: storage.count_records()?,
        with_part_no: storage.count_with_part_no()?,
        with_compatibility: storage.count_with_compatibility()?,
    })
}

/// Prints store statistics to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");
    println!("  Total records: {}", stats.total_records);
    println!(
        "  With part number: {} ({:.1}%)",
        stats.with_part_no,
        percentage(stats.with_part_no, stats.total_records)
    );
    println!(
        "  With compatibility list: {} ({:.1}%)",
        stats.with_compatibility,
        percentage(stats.with_compatibility, stats.total_records)
    );
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ExtractedPage, SqliteStorage};
    use chrono::Duration;

    #[test]
    fn test_report_derived_counts() {
        let started = Utc::now();
        let mut report = HarvestReport::new(started);
        report.sitemaps_requested = 2;
        report.sitemaps_fetched = 2;
        report.links_found = 10;
        report.skipped_existing = 4;

        assert_eq!(report.links_attempted(), 6);
        assert!(!report.has_failures());
        assert_eq!(report.duration_seconds(), None);

        report.failed = 1;
        report.finished_at = Some(started + Duration::seconds(3));
        assert!(report.has_failures());
        assert_eq!(report.duration_seconds(), Some(3));
    }

    #[test]
    fn test_missing_sitemap_counts_as_failure() {
        let mut report = HarvestReport::new(Utc::now());
        report.sitemaps_requested = 2;
        report.sitemaps_fetched = 1;
        assert!(report.has_failures());
    }

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .insert_if_absent(
                "https://example.com/1",
                &ExtractedPage {
                    part_no: "P1".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(
            stats,
            StoreStatistics {
                total_records: 1,
                with_part_no: 1,
                with_compatibility: 0,
            }
        );
    }

    #[test]
    fn test_percentage_of_empty_store() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }
}
