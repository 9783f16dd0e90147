//! Search requests: options and URL building

use super::taxonomy::{encode_category, Filter};
use crate::extract::DetailOptions;
use crate::Result;
use url::Url;

/// Category and trust filter of a search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    /// `group` or `group.sub`; `None` searches every category
    pub category: Option<String>,
    pub filter: Filter,
}

impl FilterParams {
    pub fn new(category: Option<String>, filter: Filter) -> Self {
        Self { category, filter }
    }
}

/// Options of one aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub filter: FilterParams,
    /// First page to fetch, 1-based
    pub start_page: u32,
    /// Number of consecutive pages to fetch from `start_page`
    pub page_count: u32,
    /// Fetch `start_page` only, ignoring `page_count`
    pub load_only_page: bool,
    /// Load each record's detail page with this field mask
    pub details: Option<DetailOptions>,
    /// Explicit page numbers; overrides the range when set
    pub page_list: Option<Vec<u32>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            filter: FilterParams::default(),
            start_page: 1,
            page_count: 1,
            load_only_page: false,
            details: None,
            page_list: None,
        }
    }
}

impl SearchOptions {
    pub fn with_filter(mut self, filter: FilterParams) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_pages(mut self, start_page: u32, page_count: u32) -> Self {
        self.start_page = start_page;
        self.page_count = page_count;
        self
    }

    pub fn only_page(mut self, page: u32) -> Self {
        self.start_page = page;
        self.load_only_page = true;
        self
    }

    pub fn with_details(mut self, details: Option<DetailOptions>) -> Self {
        self.details = details;
        self
    }

    /// Fetches exactly these pages, in ascending order whatever order they are given in
    pub fn with_page_list(mut self, pages: Vec<u32>) -> Self {
        self.page_list = Some(pages);
        self
    }

    /// Page numbers to fetch, ascending and without duplicates
    pub fn pages(&self) -> Vec<u32> {
        if let Some(list) = &self.page_list {
            let mut pages: Vec<u32> = list.iter().copied().filter(|page| *page > 0).collect();
            pages.sort_unstable();
            pages.dedup();
            if !pages.is_empty() {
                return pages;
            }
        }

        let start = self.start_page.max(1);
        if self.load_only_page {
            return vec![start];
        }
        let count = self.page_count.max(1);
        (start..start.saturating_add(count)).collect()
    }
}

/// Builds the listing URL for one page of a search
///
/// Fails when the category path is not part of the taxonomy.
pub fn build_search_url(base: &Url, query: &str, filter: &FilterParams, page: u32) -> Result<Url> {
    let category = encode_category(filter.category.as_deref())?;

    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("f", &filter.filter.code().to_string())
        .append_pair("c", &category)
        .append_pair("q", query)
        .append_pair("p", &page.to_string());
    Ok(url)
}

/// Detail page URL for a numeric id
pub fn build_view_url(base: &Url, id: u64) -> Result<Url> {
    Ok(base.join(&format!("/view/{}", id))?)
}
