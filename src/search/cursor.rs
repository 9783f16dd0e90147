//! Result cursor: an aggregated result that can be extended page by page

use super::aggregator::Scraper;
use super::query::SearchOptions;
use crate::model::AggregatedResult;
use crate::{HarvestError, Result};

/// Holds one aggregated result plus the search that produced it
#[derive(Debug, Clone)]
pub struct ResultCursor {
    scraper: Scraper,
    query: String,
    options: SearchOptions,
    data: AggregatedResult,
}

impl ResultCursor {
    pub(crate) fn new(
        scraper: Scraper,
        query: &str,
        options: SearchOptions,
        data: AggregatedResult,
    ) -> Self {
        Self {
            scraper,
            query: query.to_string(),
            options,
            data,
        }
    }

    pub fn data(&self) -> &AggregatedResult {
        &self.data
    }

    pub fn into_data(self) -> AggregatedResult {
        self.data
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn has_next_page(&self) -> bool {
        self.data.has_next_page()
    }

    /// Options for `count` pages following the held result
    fn continuation(&self, count: u32) -> SearchOptions {
        SearchOptions {
            filter: self.options.filter.clone(),
            start_page: self.data.metadata.current.saturating_add(1),
            page_count: count.max(1),
            load_only_page: count <= 1,
            details: self.options.details,
            page_list: None,
        }
    }

    /// Fetches `count` further pages and appends their records
    ///
    /// Does nothing when the held result has no next page. On failure the held
    /// result is left untouched.
    pub async fn add_next_page(&mut self, count: u32) -> Result<&mut Self> {
        if !self.has_next_page() {
            tracing::debug!(
                query = %self.query,
                current = self.data.metadata.current,
                "no next page to add"
            );
            return Ok(self);
        }

        let options = self.continuation(count);
        let data = self
            .scraper
            .search_pages(&self.query, &options, self.data.records.clone())
            .await?;
        self.data = data;
        Ok(self)
    }

    /// Fetches `count` further pages without touching the held result
    ///
    /// # Returns
    ///
    /// * `Ok(AggregatedResult)` - Records of the following pages only
    /// * `Err(HarvestError::NoFurtherPage)` - The held result is the last page
    pub async fn get_next_page(&self, count: u32) -> Result<AggregatedResult> {
        if !self.has_next_page() {
            return Err(HarvestError::NoFurtherPage);
        }

        let options = self.continuation(count);
        self.scraper
            .search_pages(&self.query, &options, Vec::new())
            .await
    }
}
