//! Record types produced by extraction and aggregation
//!
//! A `PageResult` is what one listing page yields; an `AggregatedResult` is the
//! ordered merge of several of them with a single reduced `PageMetadata`.

use serde::Serialize;

/// Download links of a torrent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TorrentLinks {
    /// Absolute URL of the detail page
    pub page: String,
    /// Absolute URL of the `.torrent` file
    pub torrent: String,
    /// Magnet URI
    pub magnet: String,
}

/// Swarm statistics at capture time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TorrentStats {
    pub seeders: u64,
    pub leechers: u64,
    pub downloaded: u64,
}

/// One row of a search listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TorrentRecord {
    pub id: u64,
    /// BitTorrent info hash taken from the magnet link
    pub hash: String,
    pub category: String,
    pub name: String,
    pub links: TorrentLinks,
    /// Human readable size as shown on the listing ("1.4 GiB")
    pub size: String,
    /// Upload time, seconds since the epoch
    pub timestamp: i64,
    pub stats: TorrentStats,
    /// Detail page data, present only when detail loading was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<DetailRecord>,
}

/// Pagination state of a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub has_previous_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page_link: Option<String>,
    pub has_next_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_link: Option<String>,
    /// Page number this metadata was read from
    pub current: u32,
    /// Highest page number visible in the pagination bar
    pub total: u32,
    /// Capture time, milliseconds since the epoch
    pub timestamp: i64,
    /// Wall-clock time spent producing the result
    pub time_taken_ms: u64,
}

impl PageMetadata {
    /// Metadata for a page with no pagination bar
    pub fn single_page(current: u32) -> Self {
        Self {
            has_previous_page: false,
            previous_page: None,
            previous_page_link: None,
            has_next_page: false,
            next_page: None,
            next_page_link: None,
            current,
            total: current,
            timestamp: chrono::Utc::now().timestamp_millis(),
            time_taken_ms: 0,
        }
    }
}

/// Records and pagination state extracted from one listing page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub metadata: PageMetadata,
    pub records: Vec<TorrentRecord>,
}

/// Ordered merge of several page results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    pub metadata: PageMetadata,
    pub count: usize,
    pub records: Vec<TorrentRecord>,
}

impl AggregatedResult {
    pub fn new(metadata: PageMetadata, records: Vec<TorrentRecord>) -> Self {
        Self {
            metadata,
            count: records.len(),
            records,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.metadata.has_next_page
    }
}

/// User who uploaded a torrent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submitter {
    pub name: String,
    pub url: String,
}

/// Entry of a torrent's file list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileEntry {
    File {
        name: String,
        readable_size: String,
        size_in_bytes: u64,
    },
    Folder {
        name: String,
        files: Vec<FileEntry>,
    },
}

/// One comment on a detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub avatar_url: String,
    pub user_name: String,
    pub message: String,
    pub publish_date: String,
    pub timestamp: i64,
    pub is_uploader: bool,
}

/// Secondary data read from a torrent's detail page
///
/// Every field is optional: which ones are populated depends on the
/// `DetailOptions` mask used for extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter: Option<Submitter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}
