//! Fetch-retry engine
//!
//! Drives one navigation through a reserved worker. HTTP 429 responses are
//! absorbed by a backoff loop that starts at the worker's cooldown; any other
//! outcome ends the loop. The reservation is consumed, so the worker goes back
//! to its pool exactly once whichever way the loop exits.

mod backoff;

use crate::config::RetryConfig;
use crate::pool::Reservation;
use crate::worker::Worker;
use crate::{HarvestError, Result};
use backoff::{sleep_with_cancellation, Backoff};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Content of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub content: String,
    pub status: u16,
    pub final_url: String,
    /// Navigations issued, including rate-limited ones
    pub attempts: u32,
}

/// Rate-limit aware fetcher shared by every aggregation
#[derive(Debug, Clone)]
pub struct FetchEngine {
    max_attempts: Option<u32>,
    max_backoff: Duration,
    cancellation: CancellationToken,
}

impl FetchEngine {
    /// # Arguments
    ///
    /// * `max_attempts` - Navigation budget per fetch (`None` = retry until not rate limited)
    /// * `max_backoff` - Upper bound for the doubling backoff
    pub fn new(max_attempts: Option<u32>, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            max_backoff,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts(), config.max_backoff())
    }

    /// Ties every backoff wait to `token`
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Fetches `url` through the reserved worker, then releases it
    ///
    /// # Returns
    ///
    /// * `Ok(FetchOutcome)` - First non-rate-limited response with status below 400
    /// * `Err(HarvestError::RateLimitExhausted)` - Every attempt in the budget got 429
    /// * `Err(HarvestError::Status)` - Any other status of 400 or above
    /// * `Err(HarvestError::Cancelled)` - Cancelled while backing off
    pub async fn fetch(&self, reservation: Reservation, url: &Url) -> Result<FetchOutcome> {
        let result = self.fetch_with_retry(reservation.worker(), url).await;
        reservation.release().await;
        result
    }

    async fn fetch_with_retry(&self, worker: &Worker, url: &Url) -> Result<FetchOutcome> {
        let mut backoff = Backoff::new(worker.cooldown(), self.max_backoff);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if self.cancellation.is_cancelled() {
                return Err(HarvestError::Cancelled);
            }

            tracing::trace!(worker = %worker.id(), url = %url, attempt, "navigating");
            let navigation = worker.navigate(url).await?;

            if navigation.is_rate_limited() {
                let exhausted = self
                    .max_attempts
                    .map(|max| attempt >= max)
                    .unwrap_or(false);

                if exhausted {
                    tracing::error!(
                        worker = %worker.id(),
                        url = %url,
                        attempts = attempt,
                        "rate limit retries exhausted"
                    );
                    return Err(HarvestError::RateLimitExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                    });
                }

                tracing::warn!(
                    worker = %worker.id(),
                    url = %url,
                    attempt,
                    backoff_ms = backoff.current().as_millis() as u64,
                    "rate limited, backing off"
                );
                sleep_with_cancellation(backoff.current(), &self.cancellation).await?;
                backoff.advance();
                continue;
            }

            if !navigation.is_success() {
                tracing::warn!(
                    worker = %worker.id(),
                    url = %url,
                    status = navigation.status,
                    "navigation failed"
                );
                return Err(HarvestError::Status {
                    url: url.to_string(),
                    status: navigation.status,
                });
            }

            tracing::debug!(
                worker = %worker.id(),
                url = %url,
                status = navigation.status,
                attempts = attempt,
                "fetched"
            );
            return Ok(FetchOutcome {
                content: navigation.content,
                status: navigation.status,
                final_url: navigation.final_url,
                attempts: attempt,
            });
        }
    }
}
