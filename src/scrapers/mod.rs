pub mod backoff;
pub mod client;
pub mod orchestrator;
pub mod quintoandar;
pub mod stats;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod testutil;

pub use client::FetchClient;
pub use orchestrator::{
    FetchFailure, ListingResult, NoopProgressReporter, Orchestrator, Progress, ProgressReporter,
    TracingProgressReporter,
};
pub use quintoandar::QuintoAndarTransport;
pub use stats::{FetchStats, StatsSnapshot};
pub use traits::Transport;
pub use types::{FetchOutcome, RawResponse};
