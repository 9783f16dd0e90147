use crate::{HarvestError, Result};
use std::time::Duration;
use tokio::task::yield_now;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Doubling delay between rate-limited attempts, capped at `max_delay`
#[derive(Debug, Clone, Copy)]
pub(crate) struct Backoff {
    current: Duration,
    max_delay: Duration,
}

impl Backoff {
    pub(crate) fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            current: initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// Delay to wait before the next attempt
    pub(crate) fn current(&self) -> Duration {
        self.current
    }

    pub(crate) fn advance(&mut self) {
        self.current = next_backoff(self.current, self.max_delay);
    }
}

pub(crate) async fn sleep_with_cancellation(
    delay: Duration,
    cancellation: &CancellationToken,
) -> Result<()> {
    if cancellation.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }

    if delay.is_zero() {
        yield_now().await;
        return Ok(());
    }

    tokio::select! {
        _ = cancellation.cancelled() => Err(HarvestError::Cancelled),
        _ = sleep(delay) => Ok(()),
    }
}

fn next_backoff(current: Duration, max_backoff: Duration) -> Duration {
    if current.is_zero() {
        return max_backoff.min(Duration::from_millis(1));
    }

    current.saturating_mul(2).min(max_backoff)
}
