//! Nyaa-Harvest: a pooled, rate-limit aware listing harvester
//!
//! This crate fetches paginated search listings and detail pages from a single
//! torrent index and turns them into structured records. Requests run through a
//! fixed pool of long-lived workers (HTTP clients or browser tabs), each bound
//! to its own identity, with HTTP 429 responses absorbed by a backoff loop.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod identity;
pub mod model;
pub mod pool;
pub mod search;
pub mod worker;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Harvester used before initialize() was called")]
    NotInitialized,

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Still rate limited after {attempts} attempts: {url}")]
    RateLimitExhausted { url: String, attempts: u32 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Execution context of worker {worker} is closed")]
    ContextClosed { worker: String },

    #[error("Invalid CSS selector {selector}: {message}")]
    Selector { selector: String, message: String },

    #[error("Extraction failed for {url}: {message}")]
    Extract { url: String, message: String },

    #[error("There is no next page for fetching information")]
    NoFurtherPage,

    #[error("Invalid torrent identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Worker pool is closed")]
    PoolClosed,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Timed out after {waited_ms}ms waiting for a free worker")]
    AcquireTimeout { waited_ms: u64 },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true when a continuation was requested past the last page
    pub fn is_no_further_page(&self) -> bool {
        matches!(self, Self::NoFurtherPage)
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid category path: {0}")]
    InvalidCategory(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::DetailOptions;
pub use fetch::{FetchEngine, FetchOutcome};
pub use model::{AggregatedResult, PageMetadata, PageResult, TorrentRecord};
pub use pool::{PoolEvent, Reservation, WorkerPool};
pub use search::{Filter, FilterParams, Harvester, ResultCursor, Scraper, SearchOptions};
pub use worker::{Worker, WorkerStatus};
