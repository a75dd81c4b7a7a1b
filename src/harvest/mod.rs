//! Harvest module for sitemap and page retrieval
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching over one shared client
//! - Fixed-delay retry of transient failures
//! - Phase-by-phase coordination of sitemap, link and store work

mod coordinator;
mod fetcher;
mod retry;

pub use coordinator::{run_harvest, Harvester, LinkOutcome, SharedPageExtractor};
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, Fetcher};
pub use retry::RetryPolicy;

pub use crate::output::HarvestReport;
