use crate::error::FetchErrorKind;
use crate::scrapers::types::RawResponse;
use async_trait::async_trait;

/// HTTP seam under the fetch client.
/// Retry, backoff and timeouts live above it, so a transport only performs
/// one GET and reports what happened.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single GET. Non-2xx statuses are responses, not errors.
    async fn get(&self, url: &str) -> Result<RawResponse, FetchErrorKind>;

    /// Get the name of the listing source
    fn source_name(&self) -> &'static str;
}
