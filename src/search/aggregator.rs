//! Pagination aggregator
//!
//! One aggregation fetches every requested page concurrently, each through its
//! own worker reservation, and reassembles the records in page order. The
//! first failing page aborts the whole aggregation; reservations still in
//! flight are released by their guards.

use super::cursor::ResultCursor;
use super::query::{build_search_url, build_view_url, SearchOptions};
use crate::extract::{view_id, DetailExtractor, DetailOptions, ListExtractor, NyaaExtractor};
use crate::fetch::FetchEngine;
use crate::model::{AggregatedResult, DetailRecord, PageMetadata, PageResult, TorrentRecord};
use crate::pool::WorkerPool;
use crate::{HarvestError, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Runs searches and detail lookups over a worker pool
#[derive(Clone)]
pub struct Scraper {
    pool: WorkerPool,
    engine: FetchEngine,
    base_url: Url,
    lists: Arc<dyn ListExtractor>,
    details: Arc<dyn DetailExtractor>,
}

impl Scraper {
    /// Creates a scraper using the built-in extractor
    pub fn new(pool: WorkerPool, engine: FetchEngine, base_url: Url) -> Result<Self> {
        let extractor = Arc::new(NyaaExtractor::new()?);
        Ok(Self::with_extractors(
            pool,
            engine,
            base_url,
            extractor.clone(),
            extractor,
        ))
    }

    pub fn with_extractors(
        pool: WorkerPool,
        engine: FetchEngine,
        base_url: Url,
        lists: Arc<dyn ListExtractor>,
        details: Arc<dyn DetailExtractor>,
    ) -> Self {
        Self {
            pool,
            engine,
            base_url,
            lists,
            details,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn engine(&self) -> &FetchEngine {
        &self.engine
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Runs a search and wraps the result in a cursor for continuation
    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<ResultCursor> {
        let data = self.search_pages(query, &options, Vec::new()).await?;
        Ok(ResultCursor::new(self.clone(), query, options, data))
    }

    /// Fetches the pages selected by `options` and merges them
    ///
    /// # Arguments
    ///
    /// * `query` - Search text
    /// * `options` - Filter, page selection and detail mask
    /// * `merge_with` - Records placed before the fetched ones (cursor continuation)
    ///
    /// # Returns
    ///
    /// Records of every page in ascending page order, with the metadata of
    /// the highest page fetched.
    pub async fn search_pages(
        &self,
        query: &str,
        options: &SearchOptions,
        merge_with: Vec<TorrentRecord>,
    ) -> Result<AggregatedResult> {
        let started = Instant::now();
        let pages = options.pages();

        // Build every URL up front so an invalid category fails before any reservation
        let urls = pages
            .iter()
            .map(|page| build_search_url(&self.base_url, query, &options.filter, *page))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            query = %query,
            pages = ?pages,
            category = options.filter.category.as_deref().unwrap_or("all"),
            filter = %options.filter.filter,
            "searching"
        );

        let results = try_join_all(urls.iter().map(|url| self.fetch_listing(url))).await?;
        let mut aggregated = merge_pages(results, merge_with);

        if let Some(detail_options) = &options.details {
            self.load_details(&mut aggregated.records, detail_options).await?;
        }

        aggregated.metadata.time_taken_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            query = %query,
            records = aggregated.count,
            current = aggregated.metadata.current,
            has_next = aggregated.metadata.has_next_page,
            time_taken_ms = aggregated.metadata.time_taken_ms,
            "search finished"
        );

        Ok(aggregated)
    }

    async fn fetch_listing(&self, url: &Url) -> Result<PageResult> {
        let reservation = self
            .pool
            .request_worker_with(self.engine.cancellation())
            .await?;
        let outcome = self.engine.fetch(reservation, url).await?;
        self.lists.extract_list(&outcome.content, url)
    }

    /// Loads one torrent's detail page
    ///
    /// `identifier` is a numeric id, a `/view/<id>` path or a full view URL.
    /// Anything else fails with `InvalidIdentifier` before a worker is reserved.
    pub async fn details(&self, identifier: &str, options: &DetailOptions) -> Result<DetailRecord> {
        let id = parse_identifier(identifier)?;
        let url = build_view_url(&self.base_url, id)?;
        self.fetch_detail(&url, options).await
    }

    async fn fetch_detail(&self, url: &Url, options: &DetailOptions) -> Result<DetailRecord> {
        let reservation = self
            .pool
            .request_worker_with(self.engine.cancellation())
            .await?;
        let outcome = self.engine.fetch(reservation, url).await?;
        self.details.extract_detail(&outcome.content, url, options)
    }

    /// Attaches detail records to every record that has none yet
    async fn load_details(&self, records: &mut [TorrentRecord], options: &DetailOptions) -> Result<()> {
        let pending: Vec<(usize, Url)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.details.is_none())
            .map(|(index, record)| -> Result<(usize, Url)> {
                Ok((index, Url::parse(&record.links.page)?))
            })
            .collect::<Result<_>>()?;

        if pending.is_empty() {
            return Ok(());
        }

        tracing::debug!(records = pending.len(), "loading detail pages");
        let loaded = try_join_all(
            pending
                .iter()
                .map(|(_, url)| self.fetch_detail(url, options)),
        )
        .await?;

        for ((index, _), detail) in pending.into_iter().zip(loaded) {
            records[index].details = Some(detail);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Scraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scraper")
            .field("base_url", &self.base_url.as_str())
            .field("pool", &self.pool)
            .finish()
    }
}

/// Concatenates page records in the given order after `merge_with`
///
/// The metadata of the first page with the greatest `current` wins.
pub fn merge_pages(pages: Vec<PageResult>, merge_with: Vec<TorrentRecord>) -> AggregatedResult {
    let mut metadata: Option<PageMetadata> = None;
    let mut records = merge_with;

    for page in pages {
        let replace = metadata
            .as_ref()
            .map(|best| page.metadata.current > best.current)
            .unwrap_or(true);
        if replace {
            metadata = Some(page.metadata);
        }
        records.extend(page.records);
    }

    AggregatedResult::new(
        metadata.unwrap_or_else(|| PageMetadata::single_page(0)),
        records,
    )
}

/// Numeric torrent id from an id, view path or view URL
pub fn parse_identifier(identifier: &str) -> Result<u64> {
    let trimmed = identifier.trim();
    if let Ok(id) = trimmed.parse::<u64>() {
        return Ok(id);
    }
    view_id(trimmed).ok_or_else(|| HarvestError::InvalidIdentifier(identifier.to_string()))
}
