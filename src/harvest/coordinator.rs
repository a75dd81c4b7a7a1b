//! Harvest coordinator - main orchestration logic
//!
//! A harvest runs in four phases, each finishing completely before the next
//! one starts:
//! 1. Bootstrap the store and preload every URL it already holds
//! 2. Fetch all sitemap seeds concurrently
//! 3. Extract `<loc>` links from every fetched sitemap, in seed order
//! 4. Fetch, extract and store each link not yet in the store, with at most
//!    `max-concurrent-requests` links in flight
//!
//! Document parsing in phases 3 and 4 runs on the blocking pool.
//!
//! Failures are contained per sitemap and per link; only a store bootstrap
//! failure aborts the run.

use crate::config::Config;
use crate::extract::{Extractor, PageExtractor, SitemapExtractor};
use crate::harvest::Fetcher;
use crate::output::HarvestReport;
use crate::storage::{
    lock_storage, ExtractedPage, InsertOutcome, SharedStorage, SqliteStorage, Storage,
};
use crate::HarvestError;
use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// How often (in completed links) a progress line is logged
const PROGRESS_INTERVAL: usize = 100;

/// What happened to one link in phase 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Stored,
    Duplicate,
    Empty,
    Failed,
    Cancelled,
}

/// Product page extractor shared by all link tasks
pub type SharedPageExtractor = Arc<dyn Extractor<Output = ExtractedPage> + Send + Sync>;

/// Shared state handed to every link task
struct LinkContext {
    fetcher: Fetcher,
    extractor: SharedPageExtractor,
    storage: SharedStorage,
    shutdown: CancellationToken,
}

/// Main harvest coordinator structure
pub struct Harvester {
    config: Arc<Config>,
    storage: SharedStorage,
    fetcher: Fetcher,
    sitemap_extractor: Arc<SitemapExtractor>,
    page_extractor: SharedPageExtractor,
    shutdown: CancellationToken,
}

impl Harvester {
    /// Creates a harvester that stores into the configured database file
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_storage(config, storage)
    }

    /// Creates a harvester around an already opened store
    pub fn with_storage(config: Config, storage: SqliteStorage) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::from_config(&config)?;
        let sitemap_extractor = SitemapExtractor::new();
        let page_extractor = PageExtractor::new(&config.extractor)?;

        Ok(Self {
            config: Arc::new(config),
            storage: Arc::new(Mutex::new(storage)),
            fetcher,
            sitemap_extractor: Arc::new(sitemap_extractor),
            page_extractor: Arc::new(page_extractor),
            shutdown: CancellationToken::new(),
        })
    }

    /// Replaces the product page extractor built from `[extractor]`
    pub fn with_page_extractor<E>(mut self, extractor: E) -> Self
    where
        E: Extractor<Output = ExtractedPage> + Send + Sync + 'static,
    {
        self.page_extractor = Arc::new(extractor);
        self
    }

    /// Token that stops the harvest when cancelled
    ///
    /// In-flight link tasks end as [`LinkOutcome::Cancelled`]; links not yet
    /// started are not fetched.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn storage(&self) -> SharedStorage {
        Arc::clone(&self.storage)
    }

    /// Runs all four harvest phases
    pub async fn run(&self) -> Result<HarvestReport, HarvestError> {
        let start_time = Instant::now();
        let mut report = HarvestReport::new(Utc::now());

        // Phase 1: the only fatal step
        let existing = {
            let mut storage = lock_storage(&self.storage)?;
            storage.initialize()?;
            storage.existing_urls()?
        };
        tracing::info!("Loaded {} existing URLs from the store", existing.len());

        // Phase 2
        report.sitemaps_requested = self.config.harvest.sitemaps.len();
        tracing::info!("Fetching {} sitemaps", report.sitemaps_requested);
        let documents = self.fetch_sitemaps().await;
        report.sitemaps_fetched = documents.len();

        // Phase 3
        tracing::info!("Extracting links from {} sitemaps", documents.len());
        let links = self.extract_sitemap_links(documents).await;
        report.links_found = links.len();
        tracing::info!("Found {} links", links.len());

        // Phase 4
        self.process_links(links, &existing, &mut report).await;

        report.finished_at = Some(Utc::now());
        tracing::info!(
            "Harvest completed: {} stored, {} skipped, {} failed in {:?}",
            report.stored,
            report.skipped_existing,
            report.failed,
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Writes the whole store to the configured export path
    pub fn export(&self) -> Result<usize, HarvestError> {
        let path = Path::new(&self.config.output.export_path);
        let rows = lock_storage(&self.storage)?.export_all(path)?;
        tracing::info!("Exported {} records to {}", rows, path.display());
        Ok(rows)
    }

    /// Fetches every seed; failed seeds are logged and dropped
    ///
    /// Returns `(sitemap url, body)` pairs in seed order.
    async fn fetch_sitemaps(&self) -> Vec<(String, String)> {
        let fetches = self.config.harvest.sitemaps.iter().map(|url| async move {
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => None,
                result = self.fetcher.fetch(url) => Some(result),
            };

            match result {
                Some(Ok(body)) => Some((url.clone(), body)),
                Some(Err(e)) => {
                    tracing::error!("Error fetching sitemap {}: {}", url, e);
                    None
                }
                None => {
                    tracing::debug!("Sitemap fetch cancelled: {}", url);
                    None
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Parses sitemaps off the async runtime and flattens their links in seed order
    async fn extract_sitemap_links(&self, documents: Vec<(String, String)>) -> Vec<String> {
        let tasks = documents.into_iter().map(|(url, body)| {
            let extractor = Arc::clone(&self.sitemap_extractor);
            tokio::task::spawn_blocking(move || {
                let links = extractor.extract_or_default(&body, &url);
                tracing::debug!("Extracted {} links from {}", links.len(), url);
                links
            })
        });

        join_all(tasks)
            .await
            .into_iter()
            .flat_map(|result| match result {
                Ok(links) => links,
                Err(e) => {
                    tracing::error!("Sitemap extraction task failed: {}", e);
                    Vec::new()
                }
            })
            .collect()
    }

    /// Runs every link not already stored through fetch, extract and store
    async fn process_links(
        &self,
        links: Vec<String>,
        existing: &HashSet<String>,
        report: &mut HarvestReport,
    ) {
        let mut pending = Vec::with_capacity(links.len());
        for link in links {
            if existing.contains(&link) {
                tracing::info!("Skipping already processed URL: {}", link);
                report.skipped_existing += 1;
            } else {
                pending.push(link);
            }
        }

        let limit = self.config.harvest.max_concurrent_requests.max(1);
        let total = pending.len();
        tracing::info!(
            "Fetching {} pages with up to {} requests in flight",
            total,
            limit
        );

        let context = Arc::new(LinkContext {
            fetcher: self.fetcher.clone(),
            extractor: Arc::clone(&self.page_extractor),
            storage: Arc::clone(&self.storage),
            shutdown: self.shutdown.clone(),
        });

        let mut outcomes = stream::iter(pending)
            .map(|link| {
                let context = Arc::clone(&context);
                run_isolated(link.clone(), process_link(context, link))
            })
            .buffer_unordered(limit);

        let mut completed = 0;
        while let Some(outcome) = outcomes.next().await {
            record_outcome(report, outcome);
            completed += 1;
            if completed % PROGRESS_INTERVAL == 0 {
                tracing::info!("Progress: {}/{} pages processed", completed, total);
            }
        }
    }
}

fn record_outcome(report: &mut HarvestReport, outcome: LinkOutcome) {
    match outcome {
        LinkOutcome::Stored => report.stored += 1,
        LinkOutcome::Duplicate => report.duplicates += 1,
        LinkOutcome::Empty => report.empty += 1,
        LinkOutcome::Failed => report.failed += 1,
        LinkOutcome::Cancelled => report.cancelled += 1,
    }
}

/// Runs one link task on its own tokio task; a panic counts as a failure
async fn run_isolated<F>(link: String, task: F) -> LinkOutcome
where
    F: Future<Output = LinkOutcome> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Task for {} aborted: {}", link, e);
            LinkOutcome::Failed
        }
    }
}

async fn process_link(context: Arc<LinkContext>, link: String) -> LinkOutcome {
    tokio::select! {
        biased;
        _ = context.shutdown.cancelled() => {
            tracing::debug!("Cancelled: {}", link);
            LinkOutcome::Cancelled
        }
        outcome = harvest_page(&context, &link) => outcome,
    }
}

/// Fetches one page, extracts its record and stores it if it carries data
async fn harvest_page(context: &LinkContext, link: &str) -> LinkOutcome {
    let body = match context.fetcher.fetch(link).await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Error fetching {}: {}", link, e);
            return LinkOutcome::Failed;
        }
    };

    let extractor = Arc::clone(&context.extractor);
    let page = match tokio::task::spawn_blocking(move || extractor.extract(&body)).await {
        Ok(Ok(page)) => page,
        Ok(Err(e)) => {
            tracing::error!("Error parsing {}: {}", link, e);
            return LinkOutcome::Failed;
        }
        Err(e) => {
            tracing::error!("Parser for {} aborted: {}", link, e);
            return LinkOutcome::Failed;
        }
    };

    if page.is_empty() {
        tracing::debug!("No catalogue data on {}", link);
        return LinkOutcome::Empty;
    }

    let inserted =
        lock_storage(&context.storage).and_then(|mut storage| storage.insert_if_absent(link, &page));

    match inserted {
        Ok(InsertOutcome::Inserted(id)) => {
            tracing::debug!("Stored {} as record {}", link, id);
            LinkOutcome::Stored
        }
        Ok(InsertOutcome::Duplicate) => {
            tracing::info!("Skipping duplicate entry: {}", link);
            LinkOutcome::Duplicate
        }
        Err(e) => {
            tracing::error!("Error storing {}: {}", link, e);
            LinkOutcome::Failed
        }
    }
}

/// Runs a complete harvest and exports the store afterwards
///
/// # Example
///
/// ```no_run
/// use catalogue_harvester::config::Config;
/// use catalogue_harvester::harvest::run_harvest;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_harvest(Config::default()).await?;
/// println!("{} new records", report.stored);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config) -> Result<HarvestReport, HarvestError> {
    let harvester = Harvester::new(config)?;
    let report = harvester.run().await?;
    harvester.export()?;
    Ok(report)
}
