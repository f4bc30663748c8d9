use crate::config::FetchConfig;
use crate::error::FetchErrorKind;
use crate::scrapers::backoff::parse_retry_after;
use crate::scrapers::traits::Transport;
use crate::scrapers::types::RawResponse;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER};
use reqwest::Client;
use tracing::debug;

/// QuintoAndar HTTP transport over reqwest
pub struct QuintoAndarTransport {
    client: Client,
}

impl QuintoAndarTransport {
    /// Create a transport with browser-like headers from the fetch config
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .context("Invalid Accept-Language header")?,
        );
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

fn classify(error: reqwest::Error) -> FetchErrorKind {
    if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if error.is_connect() || error.is_request() || error.is_body() {
        FetchErrorKind::ConnectionError(error.to_string())
    } else {
        FetchErrorKind::Other(error.to_string())
    }
}

#[async_trait]
impl Transport for QuintoAndarTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchErrorKind> {
        debug!("Fetching URL: {}", url);

        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_retry_after(value, Utc::now()));

        let body = response.text().await.map_err(classify)?;
        debug!("Downloaded {} bytes of HTML (HTTP {})", body.len(), status);

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }

    fn source_name(&self) -> &'static str {
        "QuintoAndar"
    }
}
