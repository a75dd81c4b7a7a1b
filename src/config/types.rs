use serde::Deserialize;

/// Sitemap seeds the harvester reads when no configuration overrides them
pub const DEFAULT_SITEMAPS: [&str; 2] = [
    "https://www.industriehof.com/sitemap_xml/xml_ordner/en_sitemap_a.xml",
    "https://www.industriehof.com/sitemap_xml/xml_ordner/en_sitemap_b.xml",
];

/// Main configuration structure for the harvester
///
/// Every section is optional; missing sections fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Harvest behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Sitemap documents whose `<loc>` entries are harvested
    pub sitemaps: Vec<String>,

    /// Maximum number of page requests in flight at once
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sitemaps: DEFAULT_SITEMAPS.iter().map(|s| s.to_string()).collect(),
            max_concurrent_requests: 16,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Total time allowed for one request, in seconds
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("catalogue-harvester/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Retry policy for transient fetch failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per fetch, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed pause between attempts (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 1000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the CSV export written after each harvest
    #[serde(rename = "export-path")]
    pub export_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "scraped_data.db".to_string(),
            export_path: "scraped_data.csv".to_string(),
        }
    }
}

/// CSS selectors used to pull records out of product pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Rows of the article table that may carry the part-number label
    #[serde(rename = "article-row-selector")]
    pub article_row_selector: String,

    /// Text of the cell that precedes the part number
    #[serde(rename = "part-no-label")]
    pub part_no_label: String,

    /// Rows of the compatibility table (column 1: adaptable for, column 2: original part no.)
    #[serde(rename = "compatibility-row-selector")]
    pub compatibility_row_selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            article_row_selector: "div#catalog-tab-article tr.rowodd".to_string(),
            part_no_label: "Part-no.".to_string(),
            compatibility_row_selector:
                r#"div#catalog-tab-article table.produkt_passend_table tr[class*="att_val_22"]"#
                    .to_string(),
        }
    }
}
