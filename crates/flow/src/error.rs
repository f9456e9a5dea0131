//! Error types for leadsync-flow.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// A store call failed with an error that a retry could clear.
    pub fn is_retryable(&self) -> bool {
        self.source
            .as_ref()
            .and_then(|s| s.downcast_ref::<leadsync_client::Error>())
            .is_some_and(leadsync_client::Error::is_retryable)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A lead failed construction-time validation.
    #[error("Invalid lead: {0}")]
    InvalidLead(String),

    /// The org client failed.
    #[error("Org call failed: {0}")]
    Client(String),

    /// A store answered with something the flow cannot use.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The pipeline notification channel closed.
    #[error("Notification channel closed for flow {0}")]
    ChannelClosed(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<leadsync_client::Error> for Error {
    fn from(err: leadsync_client::Error) -> Self {
        Error::with_source(ErrorKind::Client(err.to_string()), err)
    }
}

impl From<leadsync_auth::Error> for Error {
    fn from(err: leadsync_auth::Error) -> Self {
        Error::with_source(ErrorKind::Config(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}
