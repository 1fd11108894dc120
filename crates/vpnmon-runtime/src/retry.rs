use crate::error::{MonitorError, Result};
use crate::traits::NodeSource;
use std::time::Duration;
use tracing::{info, warn};
use vpnmon_core::Node;

/// Transient control state for one fetch phase
#[derive(Debug, Clone, Copy)]
struct RetryState {
    attempts_remaining: u32,
    interval: Duration,
}

/// Bounded retry loop around the node-list fetch
///
/// Only transport failures are retried. Anything else (an HTTP error status,
/// an undecodable body) fails the fetch immediately.
#[derive(Debug, Clone)]
pub struct FetchRetrier {
    max_attempts: u32,
    interval: Duration,
}

impl FetchRetrier {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Fetch nodes from `source`, sleeping `interval` between failed attempts
    pub async fn fetch_with_retry(&self, source: &dyn NodeSource) -> Result<Vec<Node>> {
        if self.max_attempts == 0 {
            return Err(MonitorError::invalid_config(
                "fetch attempts must be at least 1",
                "Pass --fetch-attempts 1 or higher",
            ));
        }

        let mut state = RetryState {
            attempts_remaining: self.max_attempts,
            interval: self.interval,
        };
        let mut attempt = 0;

        loop {
            attempt += 1;
            state.attempts_remaining -= 1;

            match source.fetch().await {
                Ok(nodes) => {
                    if attempt > 1 {
                        info!("Node list fetched on attempt {}", attempt);
                    }
                    return Ok(nodes);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if state.attempts_remaining == 0 => {
                    return Err(MonitorError::fetch_exhausted(attempt, e.to_string()));
                }
                Err(e) => {
                    warn!(
                        attempt,
                        remaining = state.attempts_remaining,
                        "Node list fetch failed: {}. Retrying in {:?}",
                        e,
                        state.interval
                    );
                    tokio::time::sleep(state.interval).await;
                }
            }
        }
    }
}
