//! Field extraction from fetched pages
//!
//! This module contains:
//! - The `ListExtractor` and `DetailExtractor` seams the aggregator calls
//! - `NyaaExtractor`, the scraper-based implementation for the index's markup
//! - Size parsing for file lists

mod detail;
mod listing;
mod size;

pub(crate) use listing::view_id;
pub use size::parse_size_to_bytes;

use crate::config::{DescriptionFormat, DetailsConfig};
use crate::model::{DetailRecord, PageResult};
use crate::{HarvestError, Result};
use scraper::{ElementRef, Selector};
use url::Url;

/// Turns the raw content of a listing page into records and pagination state
pub trait ListExtractor: Send + Sync {
    fn extract_list(&self, content: &str, page_url: &Url) -> Result<PageResult>;
}

/// Reads the fields selected by `options` from a detail page
pub trait DetailExtractor: Send + Sync {
    fn extract_detail(
        &self,
        content: &str,
        page_url: &Url,
        options: &DetailOptions,
    ) -> Result<DetailRecord>;
}

/// Which detail page fields to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailOptions {
    pub description: DescriptionFormat,
    pub submitter: bool,
    pub information: bool,
    pub files: bool,
    pub comments: bool,
}

impl DetailOptions {
    /// Every field, description as markdown
    pub fn all() -> Self {
        Self {
            description: DescriptionFormat::Markdown,
            submitter: true,
            information: true,
            files: true,
            comments: true,
        }
    }

    pub fn none() -> Self {
        Self {
            description: DescriptionFormat::None,
            submitter: false,
            information: false,
            files: false,
            comments: false,
        }
    }

    pub fn with_description(mut self, format: DescriptionFormat) -> Self {
        self.description = format;
        self
    }

    /// True when no field is selected
    pub fn is_empty(&self) -> bool {
        self.description == DescriptionFormat::None
            && !self.submitter
            && !self.information
            && !self.files
            && !self.comments
    }
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl From<&DetailsConfig> for DetailOptions {
    fn from(config: &DetailsConfig) -> Self {
        Self {
            description: config.description,
            submitter: config.submitter,
            information: config.information,
            files: config.files,
            comments: config.comments,
        }
    }
}

/// Extractor for the index's listing and detail markup
#[derive(Debug)]
pub struct NyaaExtractor {
    list: listing::ListSelectors,
    detail: detail::DetailSelectors,
}

impl NyaaExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            list: listing::ListSelectors::new()?,
            detail: detail::DetailSelectors::new()?,
        })
    }
}

impl ListExtractor for NyaaExtractor {
    fn extract_list(&self, content: &str, page_url: &Url) -> Result<PageResult> {
        Ok(listing::extract_list(&self.list, content, page_url))
    }
}

impl DetailExtractor for NyaaExtractor {
    fn extract_detail(
        &self,
        content: &str,
        page_url: &Url,
        options: &DetailOptions,
    ) -> Result<DetailRecord> {
        detail::extract_detail(&self.detail, content, page_url, options)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HarvestError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Trimmed text content of an element
fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Resolves `href` against the page it was found on
fn absolute(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    page_url.join(href).ok().map(|url| url.to_string())
}

/// Value of the `p` query parameter
fn page_number(url: &Url) -> Option<u32> {
    url.query_pairs()
        .find(|(key, _)| key == "p")
        .and_then(|(_, value)| value.parse().ok())
}
