//! Poll flow configuration.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Error, ErrorKind, Result};

/// Default time between scheduled polls.
pub const DEFAULT_POLL_FREQUENCY: Duration = Duration::from_millis(10_000);

/// Default wait before the first scheduled poll.
pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(20_000);

/// Default records per commit block.
pub const DEFAULT_BLOCK_SIZE: usize = 100;

/// Settings for one poll flow and the batch jobs it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between scheduled polls.
    pub frequency: Duration,
    /// Wait before the first scheduled poll.
    pub start_delay: Duration,
    /// Watermark used before the first poll. `None` reads every lead.
    pub watermark_default: Option<DateTime<Utc>>,
    /// Records per commit block.
    pub block_size: usize,
    /// Record failures tolerated before a job stops. `None` is unlimited.
    pub max_failed_records: Option<usize>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_POLL_FREQUENCY,
            start_delay: DEFAULT_START_DELAY,
            watermark_default: None,
            block_size: DEFAULT_BLOCK_SIZE,
            max_failed_records: Some(0),
        }
    }
}

impl PollingConfig {
    pub fn builder() -> PollingConfigBuilder {
        PollingConfigBuilder::default()
    }

    /// Defaults overridden by `POLLING_FREQUENCY_MS` and `POLLING_START_DELAY_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(ms) = parse_var(&lookup, "POLLING_FREQUENCY_MS")? {
            config.frequency = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "POLLING_START_DELAY_MS")? {
            config.start_delay = Duration::from_millis(ms);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frequency.is_zero() {
            return Err(Error::new(ErrorKind::Config(
                "polling frequency must be greater than zero".to_string(),
            )));
        }
        if self.block_size == 0 {
            return Err(Error::new(ErrorKind::Config(
                "block size must be greater than zero".to_string(),
            )));
        }
        Ok(())
    }
}

/// Parse an optional numeric variable. Present but malformed is an error.
pub(crate) fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| {
            Error::with_source(
                ErrorKind::Config(format!("{key} must be a whole number, got '{raw}'")),
                e,
            )
        }),
    }
}

/// Builder for [`PollingConfig`].
#[derive(Debug, Default)]
pub struct PollingConfigBuilder {
    config: PollingConfig,
}

impl PollingConfigBuilder {
    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.config.frequency = frequency;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.config.start_delay = delay;
        self
    }

    pub fn with_watermark_default(mut self, at: DateTime<Utc>) -> Self {
        self.config.watermark_default = Some(at);
        self
    }

    pub fn with_block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    pub fn with_max_failed_records(mut self, max: Option<usize>) -> Self {
        self.config.max_failed_records = max;
        self
    }

    pub fn build(self) -> Result<PollingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
