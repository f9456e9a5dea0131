//! Harness timing and naming configuration.

use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

/// Template name embedded in fixture names.
pub const DEFAULT_TEMPLATE_NAME: &str = "sfdc2sfdc-lead-sync";

/// Longest timeout or interval a config accepts.
pub const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub template_name: String,
    /// Upper bound on the batch job wait.
    pub job_timeout: Duration,
    /// Pause between job status reads.
    pub job_poll_interval: Duration,
    /// Upper bound on the pipeline listener wait.
    pub probe_timeout: Duration,
    /// Pause between listener checks.
    pub probe_interval: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            template_name: DEFAULT_TEMPLATE_NAME.to_string(),
            job_timeout: Duration::from_secs(120),
            job_poll_interval: Duration::from_millis(500),
            probe_timeout: Duration::from_secs(10),
            probe_interval: Duration::from_secs(1),
        }
    }
}

impl HarnessConfig {
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::default()
    }

    /// Defaults overridden by `LEADSYNC_TEMPLATE_NAME` and `LEADSYNC_JOB_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(name) = lookup("LEADSYNC_TEMPLATE_NAME") {
            builder = builder.with_template_name(name);
        }
        if let Some(raw) = lookup("LEADSYNC_JOB_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                Error::with_source(
                    ErrorKind::Config(format!(
                        "LEADSYNC_JOB_TIMEOUT_SECS must be a whole number, got '{raw}'"
                    )),
                    e,
                )
            })?;
            builder = builder.with_job_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    pub fn validate(&self) -> Result<()> {
        let name_ok = !self.template_name.is_empty()
            && self
                .template_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !name_ok {
            return Err(Error::new(ErrorKind::Config(format!(
                "template name '{}' cannot be used in an email address",
                self.template_name
            ))));
        }
        for (label, value) in [
            ("job timeout", self.job_timeout),
            ("job poll interval", self.job_poll_interval),
            ("probe timeout", self.probe_timeout),
            ("probe interval", self.probe_interval),
        ] {
            if value.is_zero() {
                return Err(Error::new(ErrorKind::Config(format!(
                    "{label} must be greater than zero"
                ))));
            }
            if value > MAX_WAIT {
                return Err(Error::new(ErrorKind::Config(format!(
                    "{label} of {value:?} exceeds the {MAX_WAIT:?} limit"
                ))));
            }
        }
        Ok(())
    }
}

/// Builder for [`HarnessConfig`].
#[derive(Debug, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn with_template_name(mut self, name: impl Into<String>) -> Self {
        self.config.template_name = name.into();
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.config.job_timeout = timeout;
        self
    }

    pub fn with_job_poll_interval(mut self, interval: Duration) -> Self {
        self.config.job_poll_interval = interval;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.config.probe_interval = interval;
        self
    }

    pub fn build(self) -> Result<HarnessConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.template_name, "sfdc2sfdc-lead-sync");
        assert_eq!(config.job_timeout, Duration::from_secs(120));
        assert_eq!(config.job_poll_interval, Duration::from_millis(500));
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.probe_interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = HarnessConfig::from_lookup(|key| match key {
            "LEADSYNC_TEMPLATE_NAME" => Some("lead-sync-ci".to_string()),
            "LEADSYNC_JOB_TIMEOUT_SECS" => Some("30".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.template_name, "lead-sync-ci");
        assert_eq!(config.job_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_malformed_values() {
        let err = HarnessConfig::from_lookup(|key| {
            (key == "LEADSYNC_JOB_TIMEOUT_SECS").then(|| "two minutes".to_string())
        })
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));

        let err = HarnessConfig::from_lookup(|key| {
            (key == "LEADSYNC_TEMPLATE_NAME").then(|| "lead sync@x".to_string())
        })
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));

        assert!(HarnessConfig::builder()
            .with_probe_interval(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_oversized_timeouts_rejected() {
        let err = HarnessConfig::from_lookup(|key| {
            (key == "LEADSYNC_JOB_TIMEOUT_SECS").then(|| u64::MAX.to_string())
        })
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
        assert!(err.to_string().contains("job timeout"));

        assert!(HarnessConfig::builder()
            .with_probe_timeout(MAX_WAIT + Duration::from_secs(1))
            .build()
            .is_err());
        assert!(HarnessConfig::builder()
            .with_job_timeout(MAX_WAIT)
            .build()
            .is_ok());
    }
}
