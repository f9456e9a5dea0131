//! The poll flow: reads changed leads from the source and starts batch jobs.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, Instrument};

use crate::config::PollingConfig;
use crate::error::Result;
use crate::job::{BatchJob, JobId, JobTracker};
use crate::notification::{PipelineEvent, PipelineNotifier};
use crate::store::LeadStore;

/// Name of the template's poll flow.
pub const DEFAULT_FLOW_NAME: &str = "triggerSyncFlow";

/// Scheduled poll over a source store, syncing into a target store.
///
/// ```rust,ignore
/// let flow = PollFlow::new(
///     DEFAULT_FLOW_NAME,
///     Arc::new(org_a),
///     Arc::new(org_b),
///     JobTracker::new(),
///     PipelineNotifier::default(),
///     PollingConfig::from_env()?,
/// );
/// flow.start_scheduler();
/// ```
pub struct PollFlow<S, T> {
    inner: Arc<FlowInner<S, T>>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

struct FlowInner<S, T> {
    name: String,
    source: Arc<S>,
    target: Arc<T>,
    tracker: JobTracker,
    notifier: PipelineNotifier,
    config: PollingConfig,
    watermark: tokio::sync::Mutex<Option<DateTime<Utc>>>,
}

impl<S, T> std::fmt::Debug for PollFlow<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollFlow")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<S, T> PollFlow<S, T>
where
    S: LeadStore + 'static,
    T: LeadStore + 'static,
{
    pub fn new(
        name: impl Into<String>,
        source: Arc<S>,
        target: Arc<T>,
        tracker: JobTracker,
        notifier: PipelineNotifier,
        config: PollingConfig,
    ) -> Self {
        let watermark = tokio::sync::Mutex::new(config.watermark_default);
        Self {
            inner: Arc::new(FlowInner {
                name: name.into(),
                source,
                target,
                tracker,
                notifier,
                config,
                watermark,
            }),
            scheduler: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.inner.tracker
    }

    pub fn notifier(&self) -> &PipelineNotifier {
        &self.inner.notifier
    }

    pub fn config(&self) -> &PollingConfig {
        &self.inner.config
    }

    pub fn source(&self) -> &Arc<S> {
        &self.inner.source
    }

    pub fn target(&self) -> &Arc<T> {
        &self.inner.target
    }

    /// Greatest `LastModifiedDate` handed to a batch job so far.
    pub async fn watermark(&self) -> Option<DateTime<Utc>> {
        *self.inner.watermark.lock().await
    }

    /// Start polling on the configured schedule. Returns false if already running.
    /// Must be called from within a tokio runtime.
    pub fn start_scheduler(&self) -> bool {
        let mut slot = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let inner = Arc::clone(&self.inner);
        let span = tracing::info_span!("poll_scheduler", flow = %inner.name);
        *slot = Some(tokio::spawn(
            async move {
                tokio::time::sleep(inner.config.start_delay).await;
                let mut ticker = tokio::time::interval(inner.config.frequency);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if let Err(err) = inner.run_once().await {
                        error!(error = %err, "Scheduled poll failed");
                    }
                }
            }
            .instrument(span),
        ));
        info!(flow = %self.inner.name, "Poll scheduler started");
        true
    }

    /// Stop the scheduler. Idempotent; returns whether a task was running.
    /// Batch jobs already started keep running.
    pub fn stop_scheduler(&self) -> bool {
        let handle = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                info!(flow = %self.inner.name, "Poll scheduler stopped");
                true
            }
            _ => false,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Poll once now and return the id of the batch job it started.
    pub async fn run_once(&self) -> Result<JobId> {
        self.inner.run_once().await
    }
}

impl<S, T> Drop for PollFlow<S, T> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .scheduler
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl<S, T> FlowInner<S, T>
where
    S: LeadStore + 'static,
    T: LeadStore + 'static,
{
    #[instrument(skip(self), fields(flow = %self.name))]
    async fn run_once(&self) -> Result<JobId> {
        let mut watermark = self.watermark.lock().await;

        let records = match self.source.modified_since(*watermark).await {
            Ok(records) => records,
            Err(err) => {
                self.notifier.publish(PipelineEvent::Failed {
                    flow: self.name.clone(),
                    error: err.to_string(),
                });
                return Err(err);
            }
        };

        let job_id = self.tracker.register(records.len());
        if let Some(newest) = records.iter().filter_map(|lead| lead.last_modified_date).max() {
            *watermark = Some(newest);
        }

        let count = records.len();
        let job = BatchJob::new(
            job_id.clone(),
            Arc::clone(&self.target),
            self.tracker.clone(),
            self.config.block_size,
            self.config.max_failed_records,
        );
        tokio::spawn(job.run(records));

        info!(job_id = %job_id, records = count, "Poll dispatched batch job");
        self.notifier.publish(PipelineEvent::Completed {
            flow: self.name.clone(),
            job_id: job_id.clone(),
            records: count,
        });
        Ok(job_id)
    }
}
