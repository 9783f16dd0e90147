//! Shared fixtures: index markup builders, harvester setup and a gated
//! execution context for scheduling tests

use async_trait::async_trait;
use nyaa_harvest::config::RuntimeKind;
use nyaa_harvest::worker::{ContextFactory, ExecutionContext, Navigation};
use nyaa_harvest::{Config, HarvestError, Harvester, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;
use wiremock::MockServer;

const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

/// One listing row linking to `/view/<id>`
pub fn row(id: u64) -> String {
    format!(
        r#"<tr class="default">
            <td><a href="/?c=1_2" title="Anime - English-translated"><img src="/c/1_2.png"></a></td>
            <td colspan="2"><a href="/view/{id}" title="Release {id}">Release {id}</a></td>
            <td class="text-center">
                <a href="/download/{id}.torrent"><i class="fa fa-fw fa-download"></i></a>
                <a href="magnet:?xt=urn:btih:{HASH}&amp;dn=r{id}"><i class="fa fa-fw fa-magnet"></i></a>
            </td>
            <td class="text-center">700 MiB</td>
            <td class="text-center" data-timestamp="1700000000">2023-11-14 22:13</td>
            <td class="text-center">10</td>
            <td class="text-center">2</td>
            <td class="text-center">300</td>
        </tr>"#
    )
}

/// Pagination bar for page `current` of `total`; empty for a single page
fn pagination(current: u32, total: u32) -> String {
    if total <= 1 {
        return String::new();
    }

    let mut items = Vec::new();
    if current > 1 {
        items.push(format!(
            r#"<li class="previous"><a rel="prev" href="/?q=demo&amp;p={}">&laquo;</a></li>"#,
            current - 1
        ));
    } else {
        items.push(r#"<li class="previous disabled"><span>&laquo;</span></li>"#.to_string());
    }
    for page in 1..=total {
        if page == current {
            items.push(format!(
                r##"<li class="active"><a href="#">{page} <span class="sr-only">(current)</span></a></li>"##
            ));
        } else {
            items.push(format!(r#"<li><a href="/?q=demo&amp;p={page}">{page}</a></li>"#));
        }
    }
    if current < total {
        items.push(format!(
            r#"<li class="next"><a rel="next" href="/?q=demo&amp;p={}">&raquo;</a></li>"#,
            current + 1
        ));
    } else {
        items.push(r#"<li class="next disabled"><span>&raquo;</span></li>"#.to_string());
    }

    format!(r#"<ul class="pagination">{}</ul>"#, items.join("\n"))
}

/// A complete listing page with one row per id
pub fn listing_page(ids: &[u64], current: u32, total: u32) -> String {
    let rows: Vec<String> = ids.iter().map(|id| row(*id)).collect();
    format!(
        r#"<html><body><div class="table-responsive">
            <table class="table torrent-list"><thead><tr><th>Category</th></tr></thead>
            <tbody>{}</tbody></table></div>
            <div class="center">{}</div></body></html>"#,
        rows.join("\n"),
        pagination(current, total)
    )
}

/// A detail page carrying only a submitter
pub fn detail_page(submitter: &str) -> String {
    format!(
        r#"<html><body><div class="container"><div class="panel panel-default">
            <div class="panel-body">
              <div class="row"><div class="col-md-1">Submitter:</div>
                <div class="col-md-5"><a href="/user/{submitter}" title="User">{submitter}</a></div></div>
            </div></div></div></body></html>"#
    )
}

/// Configuration pointing at `server` with short timings
pub fn test_config(server: &MockServer, concurrency: u32) -> Config {
    let mut config = Config::default();
    config.site.base_url = format!("{}/", server.uri());
    config.pool.concurrency = concurrency;
    config.pool.cooldown_ms = 5;
    config.retry.max_backoff_ms = 40;
    config.retry.request_timeout_ms = 5_000;
    config
}

/// An initialized HTTP harvester against `server`
pub async fn harvester_for(server: &MockServer, concurrency: u32) -> Harvester {
    let harvester = Harvester::new(test_config(server, concurrency));
    harvester
        .initialize()
        .await
        .expect("Failed to initialize harvester");
    harvester
}

/// Polls `condition` until it holds, failing the test after two seconds
pub async fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..2_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("Timed out waiting until {}", description);
}

/// Contexts whose navigations block until the test opens the gate
///
/// Every navigation consumes one permit and answers with an empty,
/// single-page listing for the requested page.
pub struct GatedFactory {
    gate: Arc<Semaphore>,
}

impl GatedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Arc::new(Semaphore::new(0)),
        })
    }

    /// Lets `navigations` further navigations complete
    pub fn open(&self, navigations: usize) {
        self.gate.add_permits(navigations);
    }
}

#[async_trait]
impl ContextFactory for GatedFactory {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Http
    }

    async fn create(&self, _worker_id: &str, _identity: &str) -> Result<Box<dyn ExecutionContext>> {
        Ok(Box::new(GatedContext {
            gate: self.gate.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct GatedContext {
    gate: Arc<Semaphore>,
    closed: AtomicBool,
}

#[async_trait]
impl ExecutionContext for GatedContext {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Http
    }

    async fn navigate(&self, url: &Url) -> Result<Navigation> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| HarvestError::ContextClosed {
                worker: "gated".to_string(),
            })?;
        permit.forget();

        Ok(Navigation {
            status: 200,
            final_url: url.to_string(),
            content: listing_page(&[], 1, 1),
        })
    }

    async fn reset(&self) -> Result<()> {
        Ok(())
    }

    async fn set_identity(&self, _identity: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
