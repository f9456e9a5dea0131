//! Waiting on batch jobs started by the poll flow.

use std::time::Duration;

use leadsync_flow::{JobSnapshot, JobTracker};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Error, ErrorKind, Result};

/// Where the harness reads job status from.
pub trait JobStatusSource: Send + Sync {
    fn job(&self, id: &str) -> Option<JobSnapshot>;

    /// Most recently started job.
    fn latest_job(&self) -> Option<JobSnapshot>;
}

impl JobStatusSource for JobTracker {
    fn job(&self, id: &str) -> Option<JobSnapshot> {
        self.get(id)
    }

    fn latest_job(&self) -> Option<JobSnapshot> {
        self.latest()
    }
}

/// Polls a job until it reaches a terminal state, then judges the outcome.
///
/// ```rust,ignore
/// let mut helper = BatchTestHelper::for_job(flow.tracker(), &job_id);
/// helper.await_job_termination(Duration::from_secs(120), Duration::from_millis(500)).await?;
/// helper.assert_job_was_successful()?;
/// ```
#[derive(Debug)]
pub struct BatchTestHelper<'a, J> {
    source: &'a J,
    job_id: Option<String>,
    terminal: Option<JobSnapshot>,
}

impl<'a, J: JobStatusSource> BatchTestHelper<'a, J> {
    /// Follow whichever job was started last.
    pub fn new(source: &'a J) -> Self {
        Self {
            source,
            job_id: None,
            terminal: None,
        }
    }

    pub fn for_job(source: &'a J, job_id: impl Into<String>) -> Self {
        Self {
            source,
            job_id: Some(job_id.into()),
            terminal: None,
        }
    }

    fn current(&self) -> Option<JobSnapshot> {
        match self.job_id {
            Some(ref id) => self.source.job(id),
            None => self.source.latest_job(),
        }
    }

    /// Poll every `poll_interval` until the job is terminal. Fails with a
    /// timeout once `timeout` has passed. A timeout past the clock's range
    /// never expires.
    pub async fn await_job_termination(
        &mut self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<&JobSnapshot> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let job = self.current();
            if let Some(job) = job.filter(|job| job.state.is_terminal()) {
                info!(job_id = %job.id, state = %job.state, "Batch job terminated");
                return Ok(self.terminal.insert(job));
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now < deadline => poll_interval.min(deadline - now),
                Some(_) => {
                        let seen = self
                        .current()
                        .map(|job| format!("job {} still {}", job.id, job.state))
                        .unwrap_or_else(|| "no job started".to_string());
                    return Err(Error::new(ErrorKind::Timeout(format!(
                        "batch job did not finish within {timeout:?}: {seen}"
                    ))));
                }
                None => poll_interval,
            };
            debug!("Batch job not finished yet");
            tokio::time::sleep(pause).await;
        }
    }

    /// Fails unless the awaited job ended `Successful`.
    pub fn assert_job_was_successful(&self) -> Result<&JobSnapshot> {
        let job = self.terminal.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState(
                "no terminated job; await_job_termination first".to_string(),
            ))
        })?;
        if job.state.is_success() {
            Ok(job)
        } else {
            Err(Error::new(ErrorKind::JobFailed {
                state: job.state,
                failed_records: job.failed_records,
            }))
        }
    }

    pub fn terminal_job(&self) -> Option<&JobSnapshot> {
        self.terminal.as_ref()
    }
}
