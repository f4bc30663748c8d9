//! Bounded-concurrency fetch + extract over a URL list.

use crate::config::ScoutConfig;
use crate::error::FetchErrorKind;
use crate::extract::Extractor;
use crate::models::{Record, RecordStatus};
use crate::scrapers::client::FetchClient;
use crate::scrapers::stats::FetchStats;
use crate::scrapers::traits::Transport;
use crate::scrapers::types::FetchOutcome;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Terminal fetch failure for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FetchErrorKind,
    pub attempts: u32,
}

/// Outcome for one input URL. Parse failures are records with
/// `status = parse_error`; only fetch failures take the `Err` side.
#[derive(Debug, Clone)]
pub struct ListingResult {
    pub url: String,
    pub outcome: Result<Record, FetchFailure>,
}

impl ListingResult {
    pub fn is_success(&self) -> bool {
        matches!(&self.outcome, Ok(record) if record.status == RecordStatus::Success)
    }

    /// Flatten into a record, turning a fetch failure into a `fetch_failed` row.
    pub fn into_record(self) -> Record {
        match self.outcome {
            Ok(record) => record,
            Err(failure) => Record::fetch_failed(self.url, &failure.kind, failure.attempts),
        }
    }
}

/// Running totals after each completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }
}

/// Side channel for progress; the default implementation ignores events.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &Progress, result: &ListingResult) {
        let _ = (progress, result);
    }
}

/// Reporter that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressReporter;

impl ProgressReporter for NoopProgressReporter {}

/// Completions between two `info!` progress lines
const PROGRESS_LOG_EVERY: usize = 50;

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn report(&self, progress: &Progress, result: &ListingResult) {
        match &result.outcome {
            Ok(record) => {
                debug!(url = %result.url, status = record.status.as_str(), "Listing done")
            }
            Err(failure) => {
                debug!(url = %result.url, error = %failure.kind, "Listing failed")
            }
        }

        if progress.completed % PROGRESS_LOG_EVERY == 0 || progress.is_finished() {
            info!(
                completed = progress.completed,
                total = progress.total,
                succeeded = progress.succeeded,
                failed = progress.failed,
                "Progress {}/{}",
                progress.completed,
                progress.total
            );
        }
    }
}

/// Drives fetch + extract for a batch of URLs with at most `concurrency`
/// pipelines in flight.
pub struct Orchestrator {
    client: Arc<FetchClient>,
    extractor: Arc<Extractor>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(client: FetchClient, extractor: Extractor, concurrency: usize) -> Self {
        Self {
            client: Arc::new(client),
            extractor: Arc::new(extractor),
            concurrency: concurrency.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &ScoutConfig) -> Self {
        Self::new(
            FetchClient::new(transport, config.fetch.clone()),
            Extractor::new(),
            config.concurrency,
        )
    }

    /// Cancelling the token stops admitting new URLs; in-flight pipelines
    /// still finish (or time out) and are emitted.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &Arc<FetchStats> {
        self.client.stats()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Results in completion order. Every admitted URL yields exactly one
    /// item; nothing here aborts the batch.
    pub fn run<'a>(
        &'a self,
        urls: Vec<String>,
        reporter: &'a dyn ProgressReporter,
    ) -> impl Stream<Item = ListingResult> + 'a {
        let cancel = self.cancel.clone();
        let mut progress = Progress {
            total: urls.len(),
            ..Progress::default()
        };

        info!(
            total = urls.len(),
            concurrency = self.concurrency,
            "Starting listing fetch"
        );

        stream::iter(urls)
            .take_while(move |_| {
                let admit = !cancel.is_cancelled();
                if !admit {
                    warn!("Cancelled, no further URLs admitted");
                }
                futures::future::ready(admit)
            })
            .map(move |url| self.process(url))
            .buffer_unordered(self.concurrency)
            .map(move |result| {
                progress.completed += 1;
                if result.is_success() {
                    progress.succeeded += 1;
                } else {
                    progress.failed += 1;
                }
                reporter.report(&progress, &result);
                result
            })
    }

    /// Run to completion and collect every result.
    pub async fn collect(
        &self,
        urls: Vec<String>,
        reporter: &dyn ProgressReporter,
    ) -> Vec<ListingResult> {
        self.run(urls, reporter).collect().await
    }

    async fn process(&self, url: String) -> ListingResult {
        let outcome = match self.client.fetch(&url).await {
            FetchOutcome::Success { html, .. } => Ok(self
                .extractor
                .extract(&url, &html)
                .unwrap_or_else(|error| {
                    warn!(url = %url, error = %error, "Unparseable listing page");
                    Record::parse_failed(url.as_str(), &error)
                })),
            FetchOutcome::Failure { kind, attempts } => Err(FetchFailure { kind, attempts }),
            // the client resolves rate limiting itself
            FetchOutcome::RateLimited { .. } => Err(FetchFailure {
                kind: FetchErrorKind::RateLimited,
                attempts: 0,
            }),
        };

        ListingResult { url, outcome }
    }
}
