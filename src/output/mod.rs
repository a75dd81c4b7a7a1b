//! Output module for exports and reports
//!
//! This module handles:
//! - Exporting the record store to CSV
//! - Summarizing a harvest run
//! - Reporting store-wide statistics

mod csv_export;
pub mod stats;

pub use csv_export::{write_csv, CSV_HEADER};
pub use stats::{
    load_statistics, print_report, print_statistics, HarvestReport, StoreStatistics,
};
