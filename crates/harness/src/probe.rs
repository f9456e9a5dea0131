//! Bounded polling of a condition.

use std::time::Duration;

use leadsync_flow::{PipelineEvent, PipelineListener};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};

/// A condition checked repeatedly by a [`Prober`].
pub trait Probe {
    fn is_satisfied(&mut self) -> bool;

    /// Message used when the prober gives up.
    fn describe_failure(&self) -> String;
}

/// Checks a probe at a fixed interval until it holds or the timeout passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prober {
    timeout: Duration,
    interval: Duration,
}

impl Prober {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns once `probe` holds. Never waits much past the timeout: the
    /// last sleep is cut to the time remaining. A timeout past the clock's
    /// range never expires.
    pub async fn check(&self, probe: &mut impl Probe) -> Result<()> {
        let deadline = Instant::now().checked_add(self.timeout);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if probe.is_satisfied() {
                debug!(attempts, "Probe satisfied");
                return Ok(());
            }
            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now < deadline => self.interval.min(deadline - now),
                Some(_) => {
                    return Err(Error::new(ErrorKind::Timeout(format!(
                        "{} after {:?} ({} checks)",
                        probe.describe_failure(),
                        self.timeout,
                        attempts
                    ))));
                }
                None => self.interval,
            };
            tokio::time::sleep(pause).await;
        }
    }
}

/// Satisfied once the poll flow has announced a completed pipeline run.
#[derive(Debug)]
pub struct ListenerProbe {
    listener: PipelineListener,
}

impl ListenerProbe {
    pub fn new(listener: PipelineListener) -> Self {
        Self { listener }
    }

    pub fn event(&self) -> Option<&PipelineEvent> {
        self.listener.event()
    }

    pub fn into_listener(self) -> PipelineListener {
        self.listener
    }
}

impl Probe for ListenerProbe {
    fn is_satisfied(&mut self) -> bool {
        self.listener.is_notified()
    }

    fn describe_failure(&self) -> String {
        format!(
            "flow {} did not report a completed pipeline",
            self.listener.flow()
        )
    }
}
