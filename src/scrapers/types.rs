use crate::error::FetchErrorKind;
use std::time::Duration;

/// What the transport hands back for one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, if the server sent one
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// Result of fetching one URL (or of a single attempt, inside the client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { html: String, status: u16 },
    RateLimited { retry_after: Option<Duration> },
    Failure { kind: FetchErrorKind, attempts: u32 },
}

impl FetchOutcome {
    /// Classify one response.
    pub fn from_response(response: RawResponse) -> Self {
        match response.status {
            200..=299 => FetchOutcome::Success {
                html: response.body,
                status: response.status,
            },
            429 => FetchOutcome::RateLimited {
                retry_after: response.retry_after,
            },
            status => FetchOutcome::Failure {
                kind: FetchErrorKind::HttpError(status),
                attempts: 1,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}
