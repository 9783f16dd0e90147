use crate::config::types::{Config, IdentityConfig, PoolConfig, RetryConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on workers per pool
pub const MAX_CONCURRENCY: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pool_config(&config.pool)?;
    validate_retry_config(&config.retry, &config.pool)?;
    validate_site_config(&config.site)?;
    validate_identity_config(&config.identity)?;
    Ok(())
}

/// Validates worker pool configuration
fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.show_browser && config.runtime != super::RuntimeKind::Browser {
        return Err(ConfigError::Validation(
            "show-browser requires runtime = \"browser\"".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig, pool: &PoolConfig) -> Result<(), ConfigError> {
    if config.max_backoff_ms < pool.cooldown_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms ({}ms) must be >= cooldown-ms ({}ms)",
            config.max_backoff_ms, pool.cooldown_ms
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    Ok(())
}

/// Validates the target site
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates identity configuration
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if let Some(agent) = &config.default_user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default-user-agent cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}
