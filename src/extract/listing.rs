//! Listing page extraction: torrent rows and the pagination bar

use super::{absolute, first, has_class, page_number, selector, text_of};
use crate::model::{PageMetadata, PageResult, TorrentLinks, TorrentRecord, TorrentStats};
use crate::Result;
use scraper::{ElementRef, Html, Selector};
use url::Url;

#[derive(Debug)]
pub(super) struct ListSelectors {
    rows: Selector,
    anchor: Selector,
    title_link: Selector,
    torrent_link: Selector,
    magnet_link: Selector,
    pagination: Selector,
}

impl ListSelectors {
    pub(super) fn new() -> Result<Self> {
        Ok(Self {
            rows: selector(".torrent-list tbody tr")?,
            anchor: selector("a")?,
            title_link: selector("a:not(.comments)")?,
            torrent_link: selector(r#"a[href$=".torrent"]"#)?,
            magnet_link: selector(r#"a[href^="magnet:"]"#)?,
            pagination: selector("ul.pagination li")?,
        })
    }
}

pub(super) fn extract_list(selectors: &ListSelectors, content: &str, page_url: &Url) -> PageResult {
    let document = Html::parse_document(content);

    let records: Vec<TorrentRecord> = document
        .select(&selectors.rows)
        .filter_map(|row| extract_row(selectors, row, page_url))
        .collect();

    let metadata = extract_pagination(selectors, &document, page_url);

    tracing::trace!(
        url = %page_url,
        records = records.len(),
        current = metadata.current,
        "listing extracted"
    );

    PageResult { metadata, records }
}

/// One table row; rows missing any identifying field are skipped
fn extract_row(selectors: &ListSelectors, row: ElementRef<'_>, page_url: &Url) -> Option<TorrentRecord> {
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .collect();

    let cell = |index: usize| cells.get(index).copied();

    let category = cell(0)
        .and_then(|td| first(td, &selectors.anchor))
        .and_then(|a| a.value().attr("title"))
        .map(str::to_string)?;

    let title_link = cell(1).and_then(|td| first(td, &selectors.title_link))?;
    let name = title_link.value().attr("title")?.to_string();
    let page = title_link
        .value()
        .attr("href")
        .and_then(|href| absolute(href, page_url))?;

    let torrent = cell(2)
        .and_then(|td| first(td, &selectors.torrent_link))
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| absolute(href, page_url))?;
    let magnet = cell(2)
        .and_then(|td| first(td, &selectors.magnet_link))
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)?;

    let size = cell(3).map(text_of).unwrap_or_default();
    let timestamp = cell(4)
        .and_then(|td| td.value().attr("data-timestamp"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0);
    let count = |index: usize| {
        cell(index)
            .map(text_of)
            .and_then(|text| text.parse().ok())
            .unwrap_or(0)
    };

    Some(TorrentRecord {
        id: view_id(&page).unwrap_or(0),
        hash: info_hash(&magnet).unwrap_or_default(),
        category,
        name,
        links: TorrentLinks {
            page,
            torrent,
            magnet,
        },
        size,
        timestamp,
        stats: TorrentStats {
            seeders: count(5),
            leechers: count(6),
            downloaded: count(7),
        },
        details: None,
    })
}

fn extract_pagination(selectors: &ListSelectors, document: &Html, page_url: &Url) -> PageMetadata {
    let requested = page_number(page_url).unwrap_or(1);
    let mut items = document.select(&selectors.pagination).peekable();

    // Single page of results: the index renders no pagination bar
    if items.peek().is_none() {
        return PageMetadata::single_page(requested);
    }

    let mut metadata = PageMetadata::single_page(0);
    metadata.has_previous_page = true;
    metadata.has_next_page = true;

    for item in items {
        let link = first(item, &selectors.anchor);
        let href = link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| absolute(href, page_url));

        if has_class(item, "active") {
            // The link text is "<n> (current)"; the number is the first text node
            metadata.current = link
                .and_then(|a| a.text().next())
                .and_then(|text| text.trim().parse().ok())
                .unwrap_or(requested);
        } else if has_class(item, "previous") {
            if has_class(item, "disabled") {
                metadata.has_previous_page = false;
            } else if let Some(href) = href {
                metadata.previous_page = Url::parse(&href).ok().as_ref().and_then(page_number);
                metadata.previous_page_link = Some(href);
            }
        } else if has_class(item, "next") {
            if has_class(item, "disabled") {
                metadata.has_next_page = false;
            } else if let Some(href) = href {
                metadata.next_page = Url::parse(&href).ok().as_ref().and_then(page_number);
                metadata.next_page_link = Some(href);
            }
        } else if let Some(number) = link.map(text_of).and_then(|text| text.parse::<u32>().ok()) {
            metadata.total = metadata.total.max(number);
        }
    }

    if metadata.current == 0 {
        metadata.current = requested;
    }
    metadata.total = metadata.total.max(metadata.current);
    metadata
}

/// Numeric id from a `/view/<id>` link
pub(crate) fn view_id(link: &str) -> Option<u64> {
    let rest = &link[link.find("/view/")? + "/view/".len()..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Info hash from a magnet URI: 40 hex characters or 32 base32 characters
fn info_hash(magnet: &str) -> Option<String> {
    const PREFIX: &str = "urn:btih:";
    let rest = &magnet[magnet.find(PREFIX)? + PREFIX.len()..];
    let hash: String = rest.chars().take_while(char::is_ascii_alphanumeric).collect();

    let valid = match hash.len() {
        40 => hash.chars().all(|c| c.is_ascii_hexdigit()),
        32 => true,
        _ => false,
    };
    valid.then_some(hash)
}
