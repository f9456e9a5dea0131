//! Batch jobs and the tracker that records their progress.
//!
//! A [`BatchJob`] moves source leads into the target store in two steps:
//! a lookup by Email, then an upsert in commit blocks. Its progress lives in
//! a [`JobTracker`] snapshot that observers poll.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::lead::{Lead, SaveResult};
use crate::store::LeadStore;

/// Identifier of one batch job instance.
pub type JobId = String;

/// Concurrent `find_by_email` calls during the lookup step.
const LOOKUP_CONCURRENCY: usize = 8;

/// Batch job lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    /// Registered, records not yet processed
    Loading,
    /// Processing records
    Executing,
    /// Every record processed without failure
    Successful,
    /// Ended with failed records
    Failed,
    /// Stopped on request before finishing
    Stopped,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Successful | JobState::Failed | JobState::Stopped
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobState::Successful)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Loading => "Loading",
            JobState::Executing => "Executing",
            JobState::Successful => "Successful",
            JobState::Failed => "Failed",
            JobState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// A record that could not be synchronised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub email: String,
    pub message: String,
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub state: JobState,
    pub total_records: usize,
    pub processed_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub failures: Vec<RecordFailure>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stop_requested: bool,
}

impl JobSnapshot {
    fn new(total_records: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: JobState::Loading,
            total_records,
            processed_records: 0,
            successful_records: 0,
            failed_records: 0,
            failures: Vec::new(),
            created_at: Utc::now(),
            finished_at: None,
            stop_requested: false,
        }
    }

    fn record_success(&mut self) {
        self.processed_records += 1;
        self.successful_records += 1;
    }

    fn record_failure(&mut self, email: &str, message: impl Into<String>) {
        self.processed_records += 1;
        self.failed_records += 1;
        self.failures.push(RecordFailure {
            email: email.to_string(),
            message: message.into(),
        });
    }

    fn finish(&mut self, state: JobState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }
}

/// Registry of job snapshots, shared between the flow and its observers.
#[derive(Debug, Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<Vec<JobSnapshot>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job in `Loading` state and return its id.
    pub fn register(&self, total_records: usize) -> JobId {
        let snapshot = JobSnapshot::new(total_records);
        let id = snapshot.id.clone();
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
        id
    }

    /// Apply `f` to a job's snapshot. Returns false for an unknown id.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut JobSnapshot)) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<JobSnapshot> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|job| job.id == id)
            .cloned()
    }

    /// Most recently registered job.
    pub fn latest(&self) -> Option<JobSnapshot> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn all(&self) -> Vec<JobSnapshot> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ask a running job to stop before its next commit block.
    pub fn request_stop(&self, id: &str) -> bool {
        self.update(id, |job| {
            if !job.state.is_terminal() {
                job.stop_requested = true;
            }
        })
    }
}

enum Step {
    Create(Lead),
    Update(Lead),
}

/// One run of the sync over a set of source leads.
#[derive(Debug)]
pub struct BatchJob<T> {
    id: JobId,
    target: Arc<T>,
    tracker: JobTracker,
    block_size: usize,
    max_failed_records: Option<usize>,
}

impl<T: LeadStore> BatchJob<T> {
    pub fn new(
        id: JobId,
        target: Arc<T>,
        tracker: JobTracker,
        block_size: usize,
        max_failed_records: Option<usize>,
    ) -> Self {
        Self {
            id,
            target,
            tracker,
            block_size: block_size.max(1),
            max_failed_records,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run the job to a terminal state and return its final snapshot.
    #[instrument(skip(self, records), fields(job_id = %self.id, target = %self.target.name(), records = records.len()))]
    pub async fn run(self, records: Vec<Lead>) -> JobSnapshot {
        self.tracker.update(&self.id, |job| job.state = JobState::Executing);

        let steps = match self.lookup(records).await {
            Some(steps) => steps,
            None => return self.finish(JobState::Failed),
        };

        for block in steps.chunks(self.block_size) {
            if self.snapshot().is_some_and(|job| job.stop_requested) {
                info!("Batch job stopped on request");
                return self.finish(JobState::Stopped);
            }
            self.commit(block).await;
            if self.limit_exceeded() {
                warn!("Batch job exceeded its failed-record limit");
                return self.finish(JobState::Failed);
            }
        }

        let failed = self.snapshot().map(|job| job.failed_records).unwrap_or(0);
        self.finish(if failed == 0 {
            JobState::Successful
        } else {
            JobState::Failed
        })
    }

    /// Decide create or update for each lead. `None` when the failure limit
    /// was exceeded during lookup.
    async fn lookup(&self, records: Vec<Lead>) -> Option<Vec<Step>> {
        let matched: Vec<(Lead, Result<Option<Lead>>)> = stream::iter(records)
            .map(|lead| {
                let target = Arc::clone(&self.target);
                async move {
                    let found = target.find_by_email(&lead.email).await;
                    (lead, found)
                }
            })
            .buffered(LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut steps = Vec::with_capacity(matched.len());
        for (lead, found) in matched {
            match found {
                Err(err) => {
                    self.tracker.update(&self.id, |job| {
                        job.record_failure(&lead.email, format!("lookup failed: {err}"))
                    });
                    if self.limit_exceeded() {
                        return None;
                    }
                }
                Ok(None) => steps.push(Step::Create(lead)),
                Ok(Some(existing)) => {
                    let target_is_newer = match (existing.last_modified_date, lead.last_modified_date) {
                        (Some(target_at), Some(source_at)) => target_at > source_at,
                        _ => false,
                    };
                    if target_is_newer {
                        debug!(email = %lead.email, "Target lead is newer, skipping");
                        self.tracker.update(&self.id, JobSnapshot::record_success);
                    } else {
                        steps.push(Step::Update(Lead {
                            id: existing.id,
                            last_modified_date: None,
                            ..lead
                        }));
                    }
                }
            }
        }
        Some(steps)
    }

    async fn commit(&self, block: &[Step]) {
        let mut creates = Vec::new();
        let mut updates = Vec::new();
        for step in block {
            match step {
                Step::Create(lead) => creates.push(lead.clone()),
                Step::Update(lead) => updates.push(lead.clone()),
            }
        }

        if !creates.is_empty() {
            let outcome = self.target.create_leads(&creates).await;
            self.apply(&creates, outcome);
        }
        if !updates.is_empty() {
            let outcome = self.target.update_leads(&updates).await;
            self.apply(&updates, outcome);
        }
        debug!(block = block.len(), "Committed block");
    }

    fn apply(&self, leads: &[Lead], outcome: Result<Vec<SaveResult>>) {
        self.tracker.update(&self.id, |job| match outcome {
            Ok(results) => {
                for (i, lead) in leads.iter().enumerate() {
                    match results.get(i) {
                        Some(result) if result.success => job.record_success(),
                        Some(result) => job.record_failure(
                            &lead.email,
                            result.error_message().unwrap_or_default(),
                        ),
                        None => job.record_failure(&lead.email, "no result returned"),
                    }
                }
            }
            Err(err) => {
                for lead in leads {
                    job.record_failure(&lead.email, err.to_string());
                }
            }
        });
    }

    fn limit_exceeded(&self) -> bool {
        match (self.max_failed_records, self.snapshot()) {
            (Some(max), Some(job)) => job.failed_records > max,
            _ => false,
        }
    }

    fn snapshot(&self) -> Option<JobSnapshot> {
        self.tracker.get(&self.id)
    }

    fn finish(&self, state: JobState) -> JobSnapshot {
        self.tracker.update(&self.id, |job| job.finish(state));
        let snapshot = self.snapshot().unwrap_or_else(|| {
            let mut orphan = JobSnapshot::new(0);
            orphan.id = self.id.clone();
            orphan.finish(state);
            orphan
        });
        info!(
            state = %snapshot.state,
            processed = snapshot.processed_records,
            failed = snapshot.failed_records,
            "Batch job finished"
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLeadStore;
    use chrono::TimeDelta;

    fn lead(email: &str, country: &str) -> Lead {
        Lead::builder()
            .email(email)
            .first_name("FirstName")
            .last_name("LastName")
            .country(country)
            .company("Good one Ltd.")
            .build()
            .unwrap()
    }

    fn job(target: &Arc<InMemoryLeadStore>, tracker: &JobTracker, total: usize, max: Option<usize>) -> BatchJob<InMemoryLeadStore> {
        let id = tracker.register(total);
        BatchJob::new(id, target.clone(), tracker.clone(), 2, max)
    }

    #[test]
    fn test_job_state() {
        assert!(!JobState::Loading.is_terminal());
        assert!(!JobState::Executing.is_terminal());
        assert!(JobState::Successful.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Stopped.is_terminal());
        assert!(JobState::Successful.is_success());
        assert!(!JobState::Stopped.is_success());
        assert_eq!(JobState::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_tracker_register_update_latest() {
        let tracker = JobTracker::new();
        let first = tracker.register(3);
        let second = tracker.register(1);
        assert_ne!(first, second);
        assert_eq!(tracker.latest().unwrap().id, second);
        assert_eq!(tracker.get(&first).unwrap().state, JobState::Loading);

        assert!(tracker.update(&first, |job| job.state = JobState::Executing));
        assert!(!tracker.update("missing", |job| job.state = JobState::Failed));
        assert_eq!(tracker.get(&first).unwrap().state, JobState::Executing);
        assert_eq!(tracker.all().len(), 2);
    }

    #[tokio::test]
    async fn test_creates_and_updates() {
        let target = Arc::new(InMemoryLeadStore::new("B"));
        target.create_leads(&[lead("b@test.com", "California")]).await.unwrap();

        let tracker = JobTracker::new();
        let records = vec![
            lead("a1@test.com", "California"),
            lead("a2@test.com", "North Dakota"),
            lead("b@test.com", "Nevada"),
        ];
        let snapshot = job(&target, &tracker, records.len(), Some(0)).run(records).await;

        assert_eq!(snapshot.state, JobState::Successful);
        assert_eq!(snapshot.processed_records, 3);
        assert_eq!(snapshot.successful_records, 3);
        assert!(snapshot.finished_at.is_some());
        assert_eq!(target.len().await, 3);
        let updated = target.find_by_email("b@test.com").await.unwrap().unwrap();
        assert_eq!(updated.country.as_deref(), Some("Nevada"));
    }

    #[tokio::test]
    async fn test_newer_target_record_is_skipped() {
        let target = Arc::new(InMemoryLeadStore::new("B"));
        let id = target.create_leads(&[lead("b@test.com", "California")]).await.unwrap()[0]
            .id
            .clone()
            .unwrap();

        let mut source = lead("b@test.com", "Nevada");
        source.last_modified_date = Some(Utc::now() - TimeDelta::hours(1));

        let tracker = JobTracker::new();
        let snapshot = job(&target, &tracker, 1, Some(0)).run(vec![source]).await;

        assert_eq!(snapshot.state, JobState::Successful);
        assert_eq!(snapshot.successful_records, 1);
        assert_eq!(
            target.get(&id).await.unwrap().country.as_deref(),
            Some("California")
        );
    }

    #[tokio::test]
    async fn test_failure_limit_stops_job() {
        let target = Arc::new(InMemoryLeadStore::new("B"));
        target.fail_writes_for("a1@test.com");

        let tracker = JobTracker::new();
        let records = vec![
            lead("a1@test.com", "California"),
            lead("a2@test.com", "California"),
            lead("a3@test.com", "California"),
            lead("a4@test.com", "California"),
        ];
        let snapshot = job(&target, &tracker, 4, Some(0)).run(records).await;

        assert_eq!(snapshot.state, JobState::Failed);
        assert_eq!(snapshot.failed_records, 1);
        assert_eq!(snapshot.failures[0].email, "a1@test.com");
        // The second block never ran.
        assert_eq!(snapshot.processed_records, 2);
        assert!(target.find_by_email("a4@test.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unlimited_failures_still_end_failed() {
        let target = Arc::new(InMemoryLeadStore::new("B"));
        target.fail_writes_for("a1@test.com");

        let tracker = JobTracker::new();
        let records = vec![
            lead("a1@test.com", "California"),
            lead("a2@test.com", "California"),
            lead("a3@test.com", "California"),
        ];
        let snapshot = job(&target, &tracker, 3, None).run(records).await;

        assert_eq!(snapshot.state, JobState::Failed);
        assert_eq!(snapshot.processed_records, 3);
        assert_eq!(snapshot.successful_records, 2);
    }

    #[tokio::test]
    async fn test_lookup_errors_fail_records() {
        let target = Arc::new(InMemoryLeadStore::new("B"));
        target.fail_queries(true);

        let tracker = JobTracker::new();
        let snapshot = job(&target, &tracker, 1, Some(0))
            .run(vec![lead("a1@test.com", "California")])
            .await;

        assert_eq!(snapshot.state, JobState::Failed);
        assert!(snapshot.failures[0].message.starts_with("lookup failed"));
    }

    #[tokio::test]
    async fn test_stop_request() {
        let target = Arc::new(InMemoryLeadStore::new("B"));
        let tracker = JobTracker::new();
        let batch = job(&target, &tracker, 1, Some(0));
        assert!(tracker.request_stop(batch.id()));

        let snapshot = batch.run(vec![lead("a1@test.com", "California")]).await;
        assert_eq!(snapshot.state, JobState::Stopped);
        assert!(target.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_job_succeeds() {
        let target = Arc::new(InMemoryLeadStore::new("B"));
        let tracker = JobTracker::new();
        let snapshot = job(&target, &tracker, 0, Some(0)).run(Vec::new()).await;
        assert_eq!(snapshot.state, JobState::Successful);
    }
}
