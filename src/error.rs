use thiserror::Error;

/// Why a fetch ended without HTML.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Connection could not be established or was dropped mid-response.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// A single attempt exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("HTTP {0}")]
    HttpError(u16),

    /// The rate-limit retry budget ran out while the server kept answering 429.
    #[error("rate limited")]
    RateLimited,

    #[error("{0}")]
    Other(String),
}

impl FetchErrorKind {
    /// Returns true if another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchErrorKind::ConnectionError(_) | FetchErrorKind::Timeout => true,
            FetchErrorKind::HttpError(status) => *status >= 500 || *status == 408,
            FetchErrorKind::RateLimited | FetchErrorKind::Other(_) => false,
        }
    }

    /// Short stable label, used for per-kind statistics and output.
    pub fn label(&self) -> &'static str {
        match self {
            FetchErrorKind::ConnectionError(_) => "connection_error",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::HttpError(_) => "http_error",
            FetchErrorKind::RateLimited => "rate_limited",
            FetchErrorKind::Other(_) => "other",
        }
    }
}

/// The input could not be treated as a markup document at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed markup near {fragment:?}")]
    MalformedMarkup { fragment: String },
}

/// Invalid configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds() {
        assert!(FetchErrorKind::ConnectionError("reset".into()).is_transient());
        assert!(FetchErrorKind::Timeout.is_transient());
        assert!(FetchErrorKind::HttpError(503).is_transient());
        assert!(FetchErrorKind::HttpError(408).is_transient());
        assert!(!FetchErrorKind::HttpError(404).is_transient());
        assert!(!FetchErrorKind::RateLimited.is_transient());
        assert!(!FetchErrorKind::Other("boom".into()).is_transient());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(FetchErrorKind::HttpError(500).label(), "http_error");
        assert_eq!(FetchErrorKind::Timeout.label(), "timeout");
    }
}
