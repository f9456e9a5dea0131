//! End-to-end sync check: provision, trigger the poll, wait, assert, tear down.

use leadsync_flow::{JobId, JobSnapshot, Lead, LeadField, LeadStore, PollFlow};
use tracing::{error, info, instrument};

use crate::assertions::{assert_all_synced, DEFAULT_FIELDS};
use crate::batch::BatchTestHelper;
use crate::cleanup::{teardown, CleanupReport};
use crate::config::HarnessConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::fixtures::{FixturePlan, FixtureProvisioner, Fixtures};
use crate::probe::{ListenerProbe, Prober};

/// Progress of a scenario. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScenarioState {
    /// Fixtures may be partially created.
    Init,
    /// The poll ran and dispatched a batch job.
    Triggered,
    /// The pipeline reported completion; waiting on the batch job.
    Waiting,
    /// Every source fixture was found in the target.
    Asserted,
    /// Teardown ran.
    Cleaned,
}

impl std::fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScenarioState::Init => "INIT",
            ScenarioState::Triggered => "TRIGGERED",
            ScenarioState::Waiting => "WAITING",
            ScenarioState::Asserted => "ASSERTED",
            ScenarioState::Cleaned => "CLEANED",
        };
        f.write_str(s)
    }
}

/// Outcome of a passing scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub job: JobSnapshot,
    /// Target copies of the source fixtures.
    pub synced: Vec<Lead>,
    pub fixtures: Fixtures,
    pub cleanup: CleanupReport,
}

/// A scenario that did not pass. Teardown has still run.
#[derive(Debug, thiserror::Error)]
#[error("scenario failed in state {state_reached}: {error}")]
pub struct ScenarioFailure {
    #[source]
    pub error: Error,
    /// Last state reached before teardown.
    pub state_reached: ScenarioState,
    pub job: Option<JobSnapshot>,
    pub cleanup: CleanupReport,
}

/// Drives one sync check against a poll flow.
///
/// ```rust,ignore
/// let mut scenario = SyncScenario::new(&flow, HarnessConfig::from_env()?);
/// let report = scenario.run().await?;
/// assert!(report.cleanup.is_clean());
/// ```
#[derive(Debug)]
pub struct SyncScenario<'a, S, T> {
    flow: &'a PollFlow<S, T>,
    config: HarnessConfig,
    plan: FixturePlan,
    fields: Vec<LeadField>,
    state: ScenarioState,
}

impl<'a, S, T> SyncScenario<'a, S, T>
where
    S: LeadStore + 'static,
    T: LeadStore + 'static,
{
    pub fn new(flow: &'a PollFlow<S, T>, config: HarnessConfig) -> Self {
        Self {
            flow,
            config,
            plan: FixturePlan::lead_sync_default(),
            fields: DEFAULT_FIELDS.to_vec(),
            state: ScenarioState::Init,
        }
    }

    pub fn with_plan(mut self, plan: FixturePlan) -> Self {
        self.plan = plan;
        self
    }

    /// Fields compared after the sync. Email is always used for the lookup.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = LeadField>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    fn advance(&mut self, next: ScenarioState) {
        if next > self.state {
            info!(from = %self.state, to = %next, "Scenario state");
            self.state = next;
        }
    }

    /// Run the scenario to completion. Teardown runs whatever happens
    /// before it, and its problems are reported rather than raised.
    #[instrument(skip(self), fields(flow = %self.flow.name(), template = %self.config.template_name))]
    pub async fn run(&mut self) -> std::result::Result<ScenarioReport, ScenarioFailure> {
        let mut fixtures = Fixtures::default();
        let mut job_id = None;

        let outcome = self.execute(&mut fixtures, &mut job_id).await;

        self.flow.stop_scheduler();
        let cleanup = teardown(
            self.flow.source().as_ref(),
            self.flow.target().as_ref(),
            &fixtures,
        )
        .await;
        let state_reached = self.state;
        self.advance(ScenarioState::Cleaned);

        match outcome {
            Ok((job, synced)) => {
                info!(job_id = %job.id, synced = synced.len(), clean = cleanup.is_clean(), "Scenario passed");
                Ok(ScenarioReport {
                    job,
                    synced,
                    fixtures,
                    cleanup,
                })
            }
            Err(error) => {
                error!(error = %error, state = %state_reached, "Scenario failed");
                Err(ScenarioFailure {
                    error,
                    state_reached,
                    job: job_id.and_then(|id: JobId| self.flow.tracker().get(&id)),
                    cleanup,
                })
            }
        }
    }

    async fn execute(
        &mut self,
        fixtures: &mut Fixtures,
        job_id: &mut Option<JobId>,
    ) -> Result<(JobSnapshot, Vec<Lead>)> {
        if self.state != ScenarioState::Init {
            return Err(Error::new(ErrorKind::InvalidState(format!(
                "scenario already ran to {}",
                self.state
            ))));
        }

        let flow = self.flow;
        // The harness fires the poll itself; a running schedule would race it.
        flow.stop_scheduler();

        let provisioner = FixtureProvisioner::new(&self.config.template_name);
        provisioner
            .provision_plan(
                flow.source().as_ref(),
                flow.target().as_ref(),
                &self.plan,
                fixtures,
            )
            .await?;

        let mut probe = ListenerProbe::new(flow.notifier().subscribe(flow.name()));
        let id = flow.run_once().await?;
        *job_id = Some(id.clone());
        self.advance(ScenarioState::Triggered);

        Prober::new(self.config.probe_timeout, self.config.probe_interval)
            .check(&mut probe)
            .await?;
        self.advance(ScenarioState::Waiting);

        let mut helper = BatchTestHelper::for_job(flow.tracker(), id);
        helper
            .await_job_termination(self.config.job_timeout, self.config.job_poll_interval)
            .await?;
        let job = helper.assert_job_was_successful()?.clone();

        let synced = assert_all_synced(flow.target().as_ref(), &fixtures.source, &self.fields).await?;
        self.advance(ScenarioState::Asserted);
        Ok((job, synced))
    }
}
