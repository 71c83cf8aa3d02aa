// SPDX-License-Identifier: GPL-3.0-only
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ReadinessConfig;
use crate::error::{BridgeError, Result};

// Longest wait honoured; larger timeouts would overflow the deadline
const MAX_WAIT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Polls `HEAD {base}/health` until it answers below 300.
///
/// Backoff doubles from `initial_backoff` up to `max_backoff`. The whole wait
/// is bounded by `timeout`, and the shared cancellation token aborts it early.
#[derive(Debug, Clone)]
pub struct ReadinessProber {
    client: Client,
    initial_backoff: Duration,
    max_backoff: Duration,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ReadinessProber {
    pub fn new(client: Client, policy: &ReadinessConfig) -> Self {
        Self {
            client,
            initial_backoff: policy.initial_backoff(),
            max_backoff: policy.max_backoff().max(policy.initial_backoff()),
            timeout: policy.timeout(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Block until the health probe succeeds. Returns the number of probes sent.
    pub async fn wait_until_ready(&self, base_url: &str) -> Result<u32> {
        let url = format!("{}/health", base_url.trim_end_matches('/'));
        let started = Instant::now();
        let deadline = started + self.timeout.min(MAX_WAIT);
        let mut backoff = self.initial_backoff;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let probe = tokio::time::timeout_at(deadline, self.client.head(&url).send());
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return Err(BridgeError::Cancelled),
                outcome = probe => outcome,
            };

            match outcome {
                Err(_) => break,
                Ok(Ok(response)) if response.status().as_u16() < 300 => {
                    if attempt > 1 {
                        info!(url = %url, attempt, "Medusa server became ready");
                    }
                    return Ok(attempt);
                }
                Ok(Ok(response)) => {
                    debug!(url = %url, attempt, status = %response.status(), "Medusa not ready yet");
                }
                Ok(Err(e)) => {
                    debug!(url = %url, attempt, error = %e, "Health probe failed");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(BridgeError::Cancelled),
                _ = tokio::time::sleep(backoff.min(deadline - now)) => {}
            }
            backoff = backoff.saturating_mul(2).min(self.max_backoff);
        }

        let waited = started.elapsed();
        warn!(url = %url, attempts = attempt, ?waited, "Gave up waiting for Medusa server");
        Err(BridgeError::Timeout { url, waited })
    }
}
