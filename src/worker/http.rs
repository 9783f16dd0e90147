//! HTTP client execution context
//!
//! Each worker owns its own reqwest client so the identity (User-Agent) can be
//! swapped per worker without touching the others.

use crate::config::RuntimeKind;
use crate::worker::context::{ContextFactory, ExecutionContext, Navigation};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client tagged with the given identity
///
/// # Arguments
///
/// * `user_agent` - The identity sent as the `User-Agent` header
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use nyaa_harvest::worker::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("Mozilla/5.0", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Execution context backed by a reqwest client
pub struct HttpContext {
    worker_id: String,
    client: RwLock<Client>,
    timeout: Duration,
    closed: AtomicBool,
}

impl HttpContext {
    pub fn new(worker_id: &str, identity: &str, timeout: Duration) -> Result<Self> {
        let client = build_http_client(identity, timeout)?;
        Ok(Self {
            worker_id: worker_id.to_string(),
            client: RwLock::new(client),
            timeout,
            closed: AtomicBool::new(false),
        })
    }

    fn client(&self) -> Client {
        self.client
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(HarvestError::ContextClosed {
                worker: self.worker_id.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionContext for HttpContext {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Http
    }

    async fn navigate(&self, url: &Url) -> Result<Navigation> {
        self.ensure_open()?;

        let response = self
            .client()
            .get(url.clone())
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content = response.text().await.map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(Navigation {
            status,
            final_url,
            content,
        })
    }

    async fn reset(&self) -> Result<()> {
        // A client keeps no page state between requests
        self.ensure_open()
    }

    async fn set_identity(&self, identity: &str) -> Result<()> {
        self.ensure_open()?;
        let client = build_http_client(identity, self.timeout)?;
        *self
            .client
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = client;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::trace!(worker = %self.worker_id, "http context closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Creates one `HttpContext` per worker
#[derive(Debug, Clone)]
pub struct HttpContextFactory {
    timeout: Duration,
}

impl HttpContextFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ContextFactory for HttpContextFactory {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Http
    }

    async fn create(&self, worker_id: &str, identity: &str) -> Result<Box<dyn ExecutionContext>> {
        Ok(Box::new(HttpContext::new(worker_id, identity, self.timeout)?))
    }
}
