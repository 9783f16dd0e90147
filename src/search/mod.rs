//! Searching the index
//!
//! This module contains:
//! - The category taxonomy and search filters
//! - Search options and URL building
//! - The pagination aggregator (`Scraper`) and the `ResultCursor`
//! - `Harvester`, the entry point that owns the pool for its whole lifetime

mod aggregator;
mod cursor;
mod query;
mod taxonomy;

pub use aggregator::{merge_pages, parse_identifier, Scraper};
pub use cursor::ResultCursor;
pub use query::{build_search_url, build_view_url, FilterParams, SearchOptions};
pub use taxonomy::{category_paths, encode_category, Filter, ALL_CATEGORIES, TAXONOMY};

use crate::config::{Config, RuntimeKind};
use crate::extract::DetailOptions;
use crate::fetch::FetchEngine;
use crate::identity::IdentityRegistry;
use crate::model::DetailRecord;
use crate::pool::{PoolSettings, Reservation, WorkerPool};
use crate::worker::{ContextFactory, HttpContextFactory};
use crate::{HarvestError, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

/// Scheduler entry point: initialize once, search many times, shut down
///
/// Every operation except `initialize` fails with `NotInitialized` until the
/// pool has been created.
pub struct Harvester {
    config: Config,
    scraper: OnceCell<Scraper>,
}

impl Harvester {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scraper: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.scraper.initialized()
    }

    /// Creates the worker pool for the configured runtime
    ///
    /// Calling it again after a successful initialization is a no-op.
    pub async fn initialize(&self) -> Result<&Scraper> {
        self.scraper
            .get_or_try_init(|| async {
                let factory = build_factory(&self.config).await?;
                self.build_scraper(factory).await
            })
            .await
    }

    /// Like `initialize`, with caller-supplied execution contexts
    pub async fn initialize_with(&self, factory: Arc<dyn ContextFactory>) -> Result<&Scraper> {
        self.scraper
            .get_or_try_init(|| self.build_scraper(factory))
            .await
    }

    async fn build_scraper(&self, factory: Arc<dyn ContextFactory>) -> Result<Scraper> {
        let base_url = Url::parse(&self.config.site.base_url)?;
        let settings = PoolSettings::new(
            self.config.pool.concurrency as usize,
            self.config.pool.cooldown(),
        )
        .with_acquire_timeout(self.config.retry.acquire_timeout());
        let registry = Arc::new(IdentityRegistry::from_option(
            self.config.identity.default_user_agent.clone(),
        ));

        let pool = WorkerPool::initialize(settings, factory, registry).await?;
        let engine = FetchEngine::from_config(&self.config.retry);

        tracing::info!(
            base_url = %base_url,
            runtime = %pool.kind(),
            workers = pool.size(),
            "harvester initialized"
        );
        Scraper::new(pool, engine, base_url)
    }

    /// The initialized scraper
    pub fn scraper(&self) -> Result<&Scraper> {
        self.scraper.get().ok_or(HarvestError::NotInitialized)
    }

    pub fn pool(&self) -> Result<&WorkerPool> {
        Ok(self.scraper()?.pool())
    }

    /// Reserves a worker directly from the pool
    pub async fn request_worker(&self) -> Result<Reservation> {
        self.pool()?.request_worker().await
    }

    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<ResultCursor> {
        self.scraper()?.search(query, options).await
    }

    /// Loads one detail page; `None` uses the configured field mask
    pub async fn details(&self, identifier: &str, options: Option<DetailOptions>) -> Result<DetailRecord> {
        let options = options.unwrap_or_else(|| self.default_details());
        self.scraper()?.details(identifier, &options).await
    }

    /// Field mask from the `[details]` section
    pub fn default_details(&self) -> DetailOptions {
        DetailOptions::from(&self.config.details)
    }

    /// Cancels pending backoff waits and stops the pool
    pub async fn shutdown(&self) {
        if let Some(scraper) = self.scraper.get() {
            scraper.engine().cancellation().cancel();
            scraper.pool().shutdown().await;
        }
    }
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("base_url", &self.config.site.base_url)
            .field("runtime", &self.config.pool.runtime)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

async fn build_factory(config: &Config) -> Result<Arc<dyn ContextFactory>> {
    match config.pool.runtime {
        RuntimeKind::Http => Ok(Arc::new(HttpContextFactory::new(
            config.retry.request_timeout(),
        ))),
        #[cfg(feature = "browser")]
        RuntimeKind::Browser => Ok(Arc::new(
            crate::worker::BrowserContextFactory::launch(config.pool.show_browser).await?,
        )),
        #[cfg(not(feature = "browser"))]
        RuntimeKind::Browser => Err(crate::ConfigError::Validation(
            "runtime \"browser\" requires building with the `browser` feature".to_string(),
        )
        .into()),
    }
}
