//! Execution context capability set
//!
//! A worker drives exactly one execution context: either a plain HTTP client
//! or a browser tab. The scheduler only ever talks to this trait.

use crate::config::RuntimeKind;
use crate::Result;
use async_trait::async_trait;
use url::Url;

/// Outcome of a single navigation
#[derive(Debug, Clone)]
pub struct Navigation {
    /// HTTP status of the main document
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    /// Raw page content (HTML)
    pub content: String,
}

impl Navigation {
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    /// Statuses below 400 carry usable content
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// A reusable request-issuing context bound to one identity
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    fn kind(&self) -> RuntimeKind;

    /// Loads `url` and returns its status and content
    async fn navigate(&self, url: &Url) -> Result<Navigation>;

    /// Returns the context to a neutral state between tasks
    async fn reset(&self) -> Result<()>;

    /// Re-tags outbound requests with `identity`
    async fn set_identity(&self, identity: &str) -> Result<()>;

    /// Releases the context. Closing an already-closed context is a no-op.
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Builds one execution context per worker during pool initialization
#[async_trait]
pub trait ContextFactory: Send + Sync {
    fn kind(&self) -> RuntimeKind;

    async fn create(&self, worker_id: &str, identity: &str) -> Result<Box<dyn ExecutionContext>>;

    /// Releases resources shared by every context (e.g. the browser process)
    async fn shutdown(&self) {}
}
