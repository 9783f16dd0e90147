//! Headless browser execution context
//!
//! One chromiumoxide tab per worker, all tabs sharing a single browser
//! process owned by the factory. Compiled only with the `browser` feature.

use crate::config::RuntimeKind;
use crate::worker::context::{ContextFactory, ExecutionContext, Navigation};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

const BLANK_PAGE: &str = "about:blank";

fn browser_error(err: impl std::fmt::Display) -> HarvestError {
    HarvestError::Browser(err.to_string())
}

/// Execution context backed by a browser tab
pub struct BrowserContext {
    worker_id: String,
    page: Mutex<Option<Page>>,
    closed: AtomicBool,
}

impl BrowserContext {
    pub fn new(worker_id: &str, page: Page) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            page: Mutex::new(Some(page)),
            closed: AtomicBool::new(false),
        }
    }

    fn closed_error(&self) -> HarvestError {
        HarvestError::ContextClosed {
            worker: self.worker_id.clone(),
        }
    }
}

#[async_trait]
impl ExecutionContext for BrowserContext {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Browser
    }

    async fn navigate(&self, url: &Url) -> Result<Navigation> {
        let guard = self.page.lock().await;
        let page = guard.as_ref().ok_or_else(|| self.closed_error())?;

        page.goto(url.as_str()).await.map_err(browser_error)?;

        // Status of the main document response; a missing response means the
        // page was served from cache or synthesized, so treat it as 200.
        let status = page
            .wait_for_navigation_response()
            .await
            .map_err(browser_error)?
            .and_then(|request| request.response.as_ref().map(|response| response.status))
            .and_then(|status| u16::try_from(status).ok())
            .unwrap_or(200);

        let final_url = page
            .url()
            .await
            .map_err(browser_error)?
            .unwrap_or_else(|| url.to_string());
        let content = page.content().await.map_err(browser_error)?;

        Ok(Navigation {
            status,
            final_url,
            content,
        })
    }

    async fn reset(&self) -> Result<()> {
        let guard = self.page.lock().await;
        let page = guard.as_ref().ok_or_else(|| self.closed_error())?;
        page.goto(BLANK_PAGE).await.map_err(browser_error)?;
        Ok(())
    }

    async fn set_identity(&self, identity: &str) -> Result<()> {
        let guard = self.page.lock().await;
        let page = guard.as_ref().ok_or_else(|| self.closed_error())?;
        page.set_user_agent(identity).await.map_err(browser_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let page = self.page.lock().await.take();
        if let Some(page) = page {
            if let Err(e) = page.close().await {
                tracing::warn!(worker = %self.worker_id, error = %e, "failed to close browser tab");
            }
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Launches one browser and opens a tab per worker
pub struct BrowserContextFactory {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
}

impl BrowserContextFactory {
    /// Starts the browser process
    ///
    /// # Arguments
    ///
    /// * `show_browser` - Launch with a visible window instead of headless
    pub async fn launch(show_browser: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder().window_size(1920, 1080);
        if show_browser {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(HarvestError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(headless = !show_browser, "browser launched");
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
        })
    }
}

#[async_trait]
impl ContextFactory for BrowserContextFactory {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Browser
    }

    async fn create(&self, worker_id: &str, identity: &str) -> Result<Box<dyn ExecutionContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page(BLANK_PAGE)
            .await
            .map_err(browser_error)?;

        let context = BrowserContext::new(worker_id, page);
        context.set_identity(identity).await?;
        Ok(Box::new(context))
    }

    async fn shutdown(&self) {
        if let Err(e) = self.browser.lock().await.close().await {
            tracing::warn!(error = %e, "failed to close browser");
        }
        self.handler.abort();
    }
}
