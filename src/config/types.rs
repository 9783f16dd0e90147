use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Nyaa-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub details: DetailsConfig,
}

/// Which kind of execution context backs each worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// One reqwest client per worker
    #[default]
    Http,
    /// One headless browser tab per worker
    Browser,
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Browser => write!(f, "browser"),
        }
    }
}

/// Worker pool sizing and pacing
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Number of workers created at initialization
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Cooldown between finishing a task and accepting the next one (milliseconds)
    #[serde(rename = "cooldown-ms", default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Execution context backing each worker
    #[serde(default)]
    pub runtime: RuntimeKind,

    /// Run the browser with a visible window (browser runtime only)
    #[serde(rename = "show-browser", default)]
    pub show_browser: bool,
}

impl PoolConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            cooldown_ms: default_cooldown_ms(),
            runtime: RuntimeKind::default(),
            show_browser: false,
        }
    }
}

/// Rate-limit retry and acquisition bounds
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum navigation attempts per fetch while rate limited (0 = unbounded)
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Upper bound for the doubling 429 backoff (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_cooldown_ms")]
    pub max_backoff_ms: u64,

    /// Per-request network timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long a caller may wait for a free worker (0 = forever)
    #[serde(rename = "acquire-timeout-ms", default)]
    pub acquire_timeout_ms: u64,
}

impl RetryConfig {
    /// `None` when retries are unbounded
    pub fn max_attempts(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `None` when callers may wait forever
    pub fn acquire_timeout(&self) -> Option<Duration> {
        (self.acquire_timeout_ms > 0).then(|| Duration::from_millis(self.acquire_timeout_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_backoff_ms: default_cooldown_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            acquire_timeout_ms: 0,
        }
    }
}

/// Target site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the index; search queries are sent to this URL
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Worker identity generation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Fixed user agent for every worker; a random one is drawn when unset
    #[serde(rename = "default-user-agent", default)]
    pub default_user_agent: Option<String>,
}

/// How the description block of a detail page is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionFormat {
    /// Raw inner HTML
    Html,
    /// HTML converted to markdown
    #[default]
    Markdown,
    /// Text content only
    Text,
    /// Skip the description
    None,
}

/// Default field mask used when loading detail pages
#[derive(Debug, Clone, Deserialize)]
pub struct DetailsConfig {
    #[serde(default)]
    pub description: DescriptionFormat,
    #[serde(default = "default_true")]
    pub submitter: bool,
    #[serde(default = "default_true")]
    pub information: bool,
    #[serde(default = "default_true")]
    pub files: bool,
    #[serde(default = "default_true")]
    pub comments: bool,
}

impl Default for DetailsConfig {
    fn default() -> Self {
        Self {
            description: DescriptionFormat::default(),
            submitter: true,
            information: true,
            files: true,
            comments: true,
        }
    }
}

fn default_concurrency() -> u32 {
    1
}

fn default_cooldown_ms() -> u64 {
    3000
}

fn default_max_attempts() -> u32 {
    20
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_base_url() -> String {
    "https://nyaa.si".to_string()
}

fn default_true() -> bool {
    true
}
