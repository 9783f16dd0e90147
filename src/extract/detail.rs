//! Detail page extraction
//!
//! Only the fields selected in `DetailOptions` are read. Missing blocks leave
//! their field unset rather than failing the whole page.

use super::{absolute, first, has_class, parse_size_to_bytes, selector, text_of, DetailOptions};
use crate::config::DescriptionFormat;
use crate::model::{Comment, DetailRecord, FileEntry, Submitter};
use crate::{HarvestError, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

#[derive(Debug)]
pub(super) struct DetailSelectors {
    user: Selector,
    information: Selector,
    description: Selector,
    file_list: Selector,
    comment_panel: Selector,
    image: Selector,
    message: Selector,
    comment_time: Selector,
}

impl DetailSelectors {
    pub(super) fn new() -> Result<Self> {
        Ok(Self {
            user: selector(r#"[title="User"]"#)?,
            information: selector(
                "body > div > div:nth-child(1) > div.panel-body > div:nth-child(3) > div:nth-child(2)",
            )?,
            description: selector("#torrent-description")?,
            file_list: selector(".torrent-file-list")?,
            comment_panel: selector(".comment-panel")?,
            image: selector("img")?,
            message: selector("[markdown-text]")?,
            comment_time: selector("[data-timestamp-swap]")?,
        })
    }
}

pub(super) fn extract_detail(
    selectors: &DetailSelectors,
    content: &str,
    page_url: &Url,
    options: &DetailOptions,
) -> Result<DetailRecord> {
    let document = Html::parse_document(content);
    let root = document.root_element();
    let mut record = DetailRecord::default();

    if options.submitter {
        record.submitter = first(root, &selectors.user).and_then(|user| {
            let name = text_of(user);
            let url = user
                .value()
                .attr("href")
                .and_then(|href| absolute(href, page_url))?;
            (!name.is_empty()).then_some(Submitter { name, url })
        });
    }

    if options.information {
        record.information = first(root, &selectors.information)
            .map(text_of)
            .filter(|text| !text.is_empty());
    }

    if options.description != DescriptionFormat::None {
        if let Some(block) = first(root, &selectors.description) {
            record.description = Some(render_description(block, options.description, page_url)?);
        }
    }

    if options.files {
        record.files = first(root, &selectors.file_list).map(parse_file_tree);
    }

    if options.comments {
        let comments: Vec<Comment> = root
            .select(&selectors.comment_panel)
            .filter_map(|panel| extract_comment(selectors, panel, page_url))
            .collect();
        if !comments.is_empty() {
            record.comments = Some(comments);
        }
    }

    Ok(record)
}

/// Renders the description block in the requested format
fn render_description(
    block: ElementRef<'_>,
    format: DescriptionFormat,
    page_url: &Url,
) -> Result<String> {
    match format {
        DescriptionFormat::Html => Ok(block.inner_html().trim().to_string()),
        DescriptionFormat::Text => Ok(text_of(block)),
        DescriptionFormat::Markdown => htmd::convert(&block.inner_html())
            .map(|markdown| markdown.trim().to_string())
            .map_err(|e| HarvestError::Extract {
                url: page_url.to_string(),
                message: format!("markdown conversion failed: {}", e),
            }),
        DescriptionFormat::None => Ok(String::new()),
    }
}

/// Walks the nested `<ul><li>` file list
///
/// Folders are `<li>` elements holding an `a.folder` link and a nested list;
/// files carry their size in a `span.file-size`.
fn parse_file_tree(container: ElementRef<'_>) -> Vec<FileEntry> {
    let mut entries = Vec::new();

    for list in child_elements(container).filter(|e| e.value().name() == "ul") {
        for item in child_elements(list).filter(|e| e.value().name() == "li") {
            let folder = child_elements(item)
                .find(|e| e.value().name() == "a" && has_class(*e, "folder"));

            if let Some(folder) = folder {
                let name = text_of(folder);
                if name.is_empty() {
                    continue;
                }
                entries.push(FileEntry::Folder {
                    name,
                    files: parse_file_tree(item),
                });
                continue;
            }

            let Some(size) = child_elements(item)
                .find(|e| e.value().name() == "span" && has_class(*e, "file-size"))
                .map(text_of)
            else {
                continue;
            };

            let name = text_of(item).replace(&size, "").trim().to_string();
            if name.is_empty() {
                continue;
            }

            let readable_size = size.trim_start_matches('(').trim_end_matches(')').to_string();
            let size_in_bytes = parse_size_to_bytes(&readable_size).unwrap_or_else(|| {
                tracing::debug!(file = %name, size = %readable_size, "unrecognized file size");
                0
            });

            entries.push(FileEntry::File {
                name,
                readable_size,
                size_in_bytes,
            });
        }
    }

    entries
}

fn extract_comment(selectors: &DetailSelectors, panel: ElementRef<'_>, page_url: &Url) -> Option<Comment> {
    let avatar_url = first(panel, &selectors.image)
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| absolute(src, page_url))?;

    let user = first(panel, &selectors.user)?;
    let user_name = text_of(user);
    let is_uploader = user
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| text_of(parent).contains("uploader"))
        .unwrap_or(false);

    let message = first(panel, &selectors.message).map(text_of)?;

    let time = first(panel, &selectors.comment_time)?;
    let timestamp: i64 = time.value().attr("data-timestamp")?.trim().parse().ok()?;
    let publish_date = time
        .value()
        .attr("title")
        .map(|title| title.trim().to_string())
        .unwrap_or_else(|| text_of(time).replace("UTC", "").trim().to_string());

    if user_name.is_empty() || message.is_empty() || publish_date.is_empty() {
        return None;
    }

    Some(Comment {
        avatar_url,
        user_name,
        message,
        publish_date,
        timestamp,
        is_uploader,
    })
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}
