//! Error types for leadsync-harness.

use leadsync_flow::JobState;

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

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Fixture creation failed. Never retried.
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Batch job ended {state} with {failed_records} failed records")]
    JobFailed {
        state: JobState,
        failed_records: usize,
    },

    #[error("Lead {email} was not synced to the target org")]
    NotSynced { email: String },

    #[error("Lead {email}: {field} expected {expected:?}, found {actual:?}")]
    FieldMismatch {
        email: String,
        field: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<leadsync_flow::Error> for Error {
    fn from(err: leadsync_flow::Error) -> Self {
        let kind = match &err.kind {
            leadsync_flow::ErrorKind::Timeout(msg) => ErrorKind::Timeout(msg.clone()),
            leadsync_flow::ErrorKind::Config(msg) => ErrorKind::Config(msg.clone()),
            _ => ErrorKind::Store(err.to_string()),
        };
        Error::with_source(kind, err)
    }
}
