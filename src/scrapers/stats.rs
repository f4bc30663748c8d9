use crate::error::FetchErrorKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

const KINDS: [&str; 5] = ["connection_error", "timeout", "http_error", "rate_limited", "other"];

/// Fetch counters shared by every in-flight request. Lock-free; each
/// update is a single atomic add.
#[derive(Debug, Default)]
pub struct FetchStats {
    successes: AtomicU64,
    failures: AtomicU64,
    retries: AtomicU64,
    rate_limited: AtomicU64,
    failures_by_kind: [AtomicU64; KINDS.len()],
}

/// Point-in-time copy of [`FetchStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub successes: u64,
    pub failures: u64,
    pub retries: u64,
    pub rate_limited: u64,
    pub failures_by_kind: BTreeMap<&'static str, u64>,
}

impl StatsSnapshot {
    pub fn attempted(&self) -> u64 {
        self.successes + self.failures
    }
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, kind: &FetchErrorKind) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        let index = KINDS
            .iter()
            .position(|label| *label == kind.label())
            .unwrap_or(KINDS.len() - 1);
        self.failures_by_kind[index].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            failures_by_kind: KINDS
                .iter()
                .zip(&self.failures_by_kind)
                .map(|(label, count)| (*label, count.load(Ordering::Relaxed)))
                .filter(|(_, count)| *count > 0)
                .collect(),
        }
    }
}
