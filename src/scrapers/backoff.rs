//! Retry delays and the shared rate-limit gate.

use crate::config::FetchConfig;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Exponential delays for generic failures and, separately, for 429s
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
    rate_limit_base: Duration,
    rate_limit_max: Duration,
}

impl BackoffPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            base: config.backoff_base,
            max: config.backoff_max,
            rate_limit_base: config.rate_limit_base_delay,
            rate_limit_max: config.rate_limit_max_delay,
        }
    }

    /// `base × 2^(failures−1)`, capped, without jitter.
    pub fn delay(&self, failures: u32) -> Duration {
        exponential(self.base, failures, self.max)
    }

    /// Delay before the next attempt after `failures` transient failures.
    pub fn retry_delay(&self, failures: u32) -> Duration {
        with_jitter(self.delay(failures))
    }

    /// Delay after the `hits`-th 429 when the server gave no hint.
    pub fn rate_limit_delay(&self, hits: u32) -> Duration {
        with_jitter(exponential(self.rate_limit_base, hits, self.rate_limit_max))
    }
}

fn exponential(base: Duration, n: u32, cap: Duration) -> Duration {
    let factor = 1u32.checked_shl(n.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(cap)
}

/// Add up to 10% random jitter so concurrent retries do not line up.
fn with_jitter(delay: Duration) -> Duration {
    let max_ms = (delay.as_millis() / 10) as u64;
    if max_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(fastrand::u64(0..=max_ms))
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

#[derive(Debug, Default)]
struct GateState {
    not_before: Option<Instant>,
    last_request: Option<Instant>,
}

/// Global pacing shared by every in-flight fetch: a 429 on any URL pushes
/// back all further attempts, and consecutive requests keep at least
/// `min_interval` between them.
///
/// The lock only guards the timestamps; waiting happens outside it.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    state: Mutex<GateState>,
    min_interval: Duration,
}

impl RateLimitGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            min_interval,
        }
    }

    /// Wait until a request may go out, then claim the slot.
    pub async fn wait(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();
                let mut ready_at = state.not_before.unwrap_or(now);
                if let Some(spaced) = state
                    .last_request
                    .and_then(|last| last.checked_add(self.min_interval))
                {
                    ready_at = ready_at.max(spaced);
                }
                if ready_at <= now {
                    state.last_request = Some(now);
                    return;
                }
                ready_at - now
            };
            debug!(wait_ms = wait.as_millis() as u64, "Waiting on rate-limit gate");
            tokio::time::sleep(wait).await;
        }
    }

    /// Hold back every request for at least `delay` from now.
    ///
    /// Returns `false`, leaving the gate untouched, when `delay` is too far
    /// out to be represented as an instant.
    pub fn defer(&self, delay: Duration) -> bool {
        let Some(until) = Instant::now().checked_add(delay) else {
            return false;
        };
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.not_before = Some(state.not_before.map_or(until, |current| current.max(until)));
        true
    }

    pub fn deferred_until(&self) -> Option<Instant> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .not_before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::from_config(&FetchConfig {
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(3),
            rate_limit_base_delay: Duration::from_secs(2),
            rate_limit_max_delay: Duration::from_secs(60),
            ..FetchConfig::default()
        })
    }

    #[test]
    fn delays_double_until_capped() {
        let p = policy();
        assert_eq!(p.delay(1), Duration::from_millis(500));
        assert_eq!(p.delay(2), Duration::from_secs(1));
        assert_eq!(p.delay(3), Duration::from_secs(2));
        assert_eq!(p.delay(4), Duration::from_secs(3));
        assert_eq!(p.delay(40), Duration::from_secs(3));
    }

    #[test]
    fn jitter_is_bounded_and_keeps_order() {
        let p = policy();
        for _ in 0..200 {
            let first = p.retry_delay(1);
            let second = p.retry_delay(2);
            assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(550));
            assert!(second > first);
        }
    }

    #[test]
    fn rate_limit_backoff_is_longer() {
        let p = policy();
        assert!(p.rate_limit_delay(1) >= Duration::from_secs(2));
        assert!(p.rate_limit_delay(1) > p.retry_delay(1));
    }

    #[test]
    fn retry_after_seconds_and_dates() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 0).unwrap();
        assert_eq!(parse_retry_after(" 120 ", now), Some(Duration::from_secs(120)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Duration::from_secs(60))
        );
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_gate_holds_requests() {
        let gate = RateLimitGate::new(Duration::ZERO);
        let start = Instant::now();
        assert!(gate.defer(Duration::from_secs(5)));
        assert!(gate.defer(Duration::from_secs(1)));
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_deferral_is_refused() {
        let gate = RateLimitGate::new(Duration::ZERO);
        assert!(gate.defer(Duration::from_secs(3)));
        let deferred = gate.deferred_until();

        assert!(!gate.defer(Duration::from_secs(u64::MAX)));
        assert!(!gate.defer(Duration::MAX));
        assert_eq!(gate.deferred_until(), deferred);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_spaces_requests() {
        let gate = RateLimitGate::new(Duration::from_millis(200));
        let start = Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
