use crate::config::FetchConfig;
use crate::error::FetchErrorKind;
use crate::scrapers::backoff::{BackoffPolicy, RateLimitGate};
use crate::scrapers::stats::FetchStats;
use crate::scrapers::traits::Transport;
use crate::scrapers::types::FetchOutcome;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches one URL with per-attempt timeouts, exponential retry for
/// transient failures and a separate budget for 429 responses.
///
/// Never returns an error: every path ends in a [`FetchOutcome`].
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    config: FetchConfig,
    backoff: BackoffPolicy,
    gate: Arc<RateLimitGate>,
    stats: Arc<FetchStats>,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, config: FetchConfig) -> Self {
        Self {
            backoff: BackoffPolicy::from_config(&config),
            gate: Arc::new(RateLimitGate::new(config.min_request_interval)),
            stats: Arc::new(FetchStats::new()),
            transport,
            config,
        }
    }

    pub fn stats(&self) -> &Arc<FetchStats> {
        &self.stats
    }

    fn give_up_rate_limited(&self, url: &str, attempts: u32, reason: &str) -> FetchOutcome {
        let kind = FetchErrorKind::RateLimited;
        self.stats.record_failure(&kind);
        warn!(url, attempts, reason, "Giving up on rate-limited listing");
        FetchOutcome::Failure { kind, attempts }
    }

    /// One GET through the gate, bounded by the per-attempt timeout.
    async fn attempt(&self, url: &str) -> FetchOutcome {
        self.gate.wait().await;

        match tokio::time::timeout(self.config.timeout, self.transport.get(url)).await {
            Err(_) => FetchOutcome::Failure {
                kind: FetchErrorKind::Timeout,
                attempts: 1,
            },
            Ok(Err(kind)) => FetchOutcome::Failure { kind, attempts: 1 },
            Ok(Ok(response)) => FetchOutcome::from_response(response),
        }
    }

    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let mut attempts = 0u32;
        let mut failures = 0u32;
        let mut rate_limit_hits = 0u32;

        loop {
            attempts += 1;

            match self.attempt(url).await {
                FetchOutcome::Success { html, status } => {
                    self.stats.record_success();
                    debug!(
                        url,
                        status,
                        attempts,
                        bytes = html.len(),
                        source = self.transport.source_name(),
                        "Fetched listing"
                    );
                    return FetchOutcome::Success { html, status };
                }

                FetchOutcome::RateLimited { retry_after } => {
                    self.stats.record_rate_limited();
                    rate_limit_hits += 1;

                    if rate_limit_hits > self.config.max_rate_limit_retries {
                        return self.give_up_rate_limited(url, attempts, "repeated rate limiting");
                    }

                    let delay = match retry_after {
                        Some(hint) if hint > self.config.rate_limit_max_hint => {
                            return self.give_up_rate_limited(url, attempts, "Retry-After too long");
                        }
                        Some(hint) => hint,
                        None => self.backoff.rate_limit_delay(rate_limit_hits),
                    };
                    if !self.gate.defer(delay) {
                        return self.give_up_rate_limited(url, attempts, "Retry-After too long");
                    }
                    warn!(
                        url,
                        hit = rate_limit_hits,
                        delay_ms = delay.as_millis() as u64,
                        hinted = retry_after.is_some(),
                        "Rate limited, backing off"
                    );
                    self.stats.record_retry();
                }

                FetchOutcome::Failure { kind, .. } => {
                    failures += 1;

                    if !kind.is_transient() || failures >= self.config.max_retries {
                        self.stats.record_failure(&kind);
                        warn!(url, attempts, error = %kind, "Fetch failed");
                        return FetchOutcome::Failure { kind, attempts };
                    }

                    let delay = self.backoff.retry_delay(failures);
                    warn!(
                        url,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %kind,
                        "Transient fetch failure, retrying"
                    );
                    self.stats.record_retry();
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
