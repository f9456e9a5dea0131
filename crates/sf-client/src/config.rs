//! Client configuration.

use crate::error::{Error, ErrorKind, Result};
use crate::retry::RetryConfig;
use std::time::Duration;

/// Configuration for the org HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Retry configuration. `None` disables retries.
    pub retry: Option<RetryConfig>,
    /// Whether gzip/deflate responses are accepted.
    pub accept_compressed: bool,
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Pool idle timeout.
    pub pool_idle_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
    /// Whether to emit per-request debug events.
    pub enable_tracing: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: Some(RetryConfig::default()),
            accept_compressed: true,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: crate::USER_AGENT.to_string(),
            enable_tracing: true,
        }
    }
}

impl ClientConfig {
    /// Create a new client config builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Defaults overridden by `LEADSYNC_HTTP_TIMEOUT_SECS` and
    /// `LEADSYNC_HTTP_MAX_RETRIES` (`0` disables retries).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let number = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|raw| {
                    raw.trim().parse::<u64>().map_err(|e| {
                        Error::with_source(
                            ErrorKind::Config(format!("{key} must be a whole number, got '{raw}'")),
                            e,
                        )
                    })
                })
                .transpose()
        };

        let mut builder = Self::builder();
        if let Some(secs) = number("LEADSYNC_HTTP_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(Error::new(ErrorKind::Config(
                    "LEADSYNC_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
                )));
            }
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        match number("LEADSYNC_HTTP_MAX_RETRIES")? {
            Some(0) => builder = builder.without_retry(),
            Some(retries) => {
                let retries = u32::try_from(retries).unwrap_or(u32::MAX);
                builder = builder.with_retry(RetryConfig::default().with_max_retries(retries));
            }
            None => {}
        }
        Ok(builder.build())
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.config.retry = None;
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.config.accept_compressed = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.config.enable_tracing = enabled;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
