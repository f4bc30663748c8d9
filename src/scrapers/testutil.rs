//! Scripted transport for unit tests.
//!
//! Each URL can be given a queue of canned replies; once the queue is empty
//! the transport serves the default page with status 200. Calls are
//! recorded with their (tokio) timestamps, and the number of concurrent
//! calls is tracked.

use crate::error::FetchErrorKind;
use crate::scrapers::traits::Transport;
use crate::scrapers::types::RawResponse;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(RawResponse),
    Err(FetchErrorKind),
    /// Never answers
    Hang,
}

impl Scripted {
    pub fn html(body: &str) -> Self {
        Scripted::Reply(RawResponse::new(200, body))
    }

    pub fn status(status: u16) -> Self {
        Scripted::Reply(RawResponse::new(status, ""))
    }

    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        let mut response = RawResponse::new(429, "");
        response.retry_after = retry_after_secs.map(Duration::from_secs);
        Scripted::Reply(response)
    }
}

pub struct MockTransport {
    default_html: String,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, Instant)>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new(default_html: &str) -> Self {
        Self {
            default_html: default_html.to_string(),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script(self, url: &str, replies: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.call_times(url).len()
    }

    pub fn call_times(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchErrorKind> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if matches!(next, Some(Scripted::Hang)) {
            std::future::pending::<()>().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Err(kind)) => Err(kind),
            Some(Scripted::Hang) => unreachable!("pending never resolves"),
            None => Ok(RawResponse::new(200, self.default_html.clone())),
        }
    }

    fn source_name(&self) -> &'static str {
        "mock"
    }
}
