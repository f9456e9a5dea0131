//! Error types for leadsync-client.

use std::time::Duration;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if the request may succeed when sent again.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, ErrorKind::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// The server-requested delay, for rate limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ErrorKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("HTTP error: {status} {message}")]
    Http { status: u16, message: String },

    #[error("Rate limited{}", retry_after.map(|d| format!(", retry after {:?}", d)).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP 401, usually an expired session.
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Error body returned by the org (`[{"errorCode": .., "message": ..}]`).
    #[error("Salesforce API error: {error_code} - {message}")]
    SalesforceApi {
        error_code: String,
        message: String,
        fields: Vec<String>,
    },

    #[error("Gave up after {attempts} retries: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("{0}")]
    Other(String),
}

impl ErrorKind {
    /// Transport-level failures and throttling are retryable; API errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::RateLimited { .. } | ErrorKind::Timeout | ErrorKind::Connection(_) => true,
            ErrorKind::Http { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ErrorKind::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ErrorKind::Json(err.to_string())
        } else {
            ErrorKind::Other(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::Config(format!("Invalid URL: {}", err)), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures_are_retryable() {
        assert!(Error::new(ErrorKind::Timeout).is_retryable());
        assert!(Error::new(ErrorKind::Connection("reset".into())).is_retryable());
        assert!(Error::new(ErrorKind::RateLimited { retry_after: None }).is_retryable());
    }

    #[test]
    fn test_api_errors_are_not_retryable() {
        let err = Error::new(ErrorKind::SalesforceApi {
            error_code: "DUPLICATE_VALUE".to_string(),
            message: "duplicate value found: Email".to_string(),
            fields: vec!["Email".to_string()],
        });
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("DUPLICATE_VALUE"));

        assert!(!Error::new(ErrorKind::NotFound("Lead/00Q".into())).is_retryable());
        assert!(!Error::new(ErrorKind::Authentication("expired".into())).is_retryable());
    }

    #[test]
    fn test_status_classification() {
        for status in [429, 500, 502, 503, 504] {
            let err = Error::new(ErrorKind::Http {
                status,
                message: String::new(),
            });
            assert!(err.is_retryable(), "HTTP {status} should be retryable");
        }
        for status in [400, 401, 403, 404, 409] {
            let err = Error::new(ErrorKind::Http {
                status,
                message: String::new(),
            });
            assert!(!err.is_retryable(), "HTTP {status} should not be retryable");
        }
    }

    #[test]
    fn test_retry_after_only_for_rate_limits() {
        let err = Error::new(ErrorKind::RateLimited {
            retry_after: Some(Duration::from_secs(12)),
        });
        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
        assert!(err.to_string().contains("retry after"));

        assert_eq!(Error::new(ErrorKind::Timeout).retry_after(), None);
    }

    #[test]
    fn test_retries_exhausted_keeps_last_error() {
        let err = Error::new(ErrorKind::RetriesExhausted {
            attempts: 3,
            last_error: "HTTP error: 503 Server error".into(),
        });
        assert_eq!(
            err.to_string(),
            "Gave up after 3 retries: HTTP error: 503 Server error"
        );
    }

    #[test]
    fn test_conversions() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err.kind, ErrorKind::Json(_)));
        assert!(err.source.is_some());

        let url_err = url::Url::parse("no scheme").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
    }
}
