//! Structured extraction from fetched documents
//!
//! Two extractors share one interface:
//! - [`SitemapExtractor`] turns a sitemap document into the URLs of its `<loc>` entries
//! - [`PageExtractor`] turns a product page into an [`ExtractedPage`](crate::storage::ExtractedPage)
//!
//! Extraction failures are contained: callers use [`Extractor::extract_or_default`]
//! to log the problem and carry on with an empty result.

mod page;
mod sitemap;

pub use page::{strip_trailing_commas, PageExtractor};
pub use sitemap::SitemapExtractor;

use thiserror::Error;

/// Errors raised while extracting data from a document
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Parses structured content out of document text
pub trait Extractor {
    type Output: Default;

    /// Extracts from `content`, reporting failures to the caller
    fn extract(&self, content: &str) -> Result<Self::Output, ExtractError>;

    /// Extracts from `content`, logging any failure and returning an empty result
    ///
    /// `source` names the document in log lines.
    fn extract_or_default(&self, content: &str, source: &str) -> Self::Output {
        match self.extract(content) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Error extracting from {}: {}", source, e);
                Self::Output::default()
            }
        }
    }
}

/// Compiles a CSS selector, mapping the parser error into an [`ExtractError`]
pub(crate) fn compile_selector(selector: &str) -> Result<scraper::Selector, ExtractError> {
    scraper::Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
