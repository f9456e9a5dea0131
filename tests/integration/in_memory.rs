//! End-to-end scenarios against in-memory orgs. Always run.

use std::time::Duration;

use leadsync::flow::{JobState, LeadField, LeadStore, PollingConfig};
use leadsync::harness::{
    teardown, BatchTestHelper, ErrorKind, FixturePlan, FixtureProvisioner, Fixtures,
    ScenarioState,
};
use leadsync::{InMemoryLeadStore, Lead, SyncScenario};

use super::common::{fast_config, flow_with, memory_flow, RefusingStore};

#[tokio::test]
async fn test_source_lead_is_synced_by_email() {
    let flow = memory_flow();
    let mut scenario = SyncScenario::new(&flow, fast_config());

    let report = scenario.run().await.expect("scenario should pass");

    assert_eq!(scenario.state(), ScenarioState::Cleaned);
    assert_eq!(report.job.state, JobState::Successful);
    assert_eq!(report.job.total_records, 2);

    let a1 = &report.fixtures.source[0];
    assert!(a1.email.starts_with("a1.sfdc2sfdc-lead-sync-it"));
    assert!(a1.email.ends_with("@test.com"));
    let synced = report
        .synced
        .iter()
        .find(|lead| lead.email == a1.email)
        .expect("a1 fixture in target");
    assert_ne!(synced.id, a1.id, "target id is minted by the target org");

    assert!(report.cleanup.is_clean(), "{:?}", report.cleanup.errors);
    assert!(flow.source().is_empty().await);
    assert!(flow.target().is_empty().await);
}

#[tokio::test]
async fn test_all_fields_compared_when_requested() {
    let flow = memory_flow();
    let mut scenario = SyncScenario::new(&flow, fast_config()).with_fields(LeadField::ALL);

    let report = scenario.run().await.expect("scenario should pass");

    for (expected, actual) in report.fixtures.source.iter().zip(&report.synced) {
        for field in LeadField::ALL {
            assert_eq!(expected.field(field), actual.field(field), "{field}");
        }
    }
}

#[tokio::test]
async fn test_failed_job_is_reported_and_cleaned_up() {
    let flow = flow_with(InMemoryLeadStore::new("A"), RefusingStore::new("B", "a2."));
    let mut scenario = SyncScenario::new(&flow, fast_config());

    let failure = scenario.run().await.expect_err("job should fail");

    assert_eq!(failure.state_reached, ScenarioState::Waiting);
    assert!(matches!(
        failure.error.kind,
        ErrorKind::JobFailed {
            state: JobState::Failed,
            failed_records: 1
        }
    ));
    let job = failure.job.expect("job snapshot");
    assert_eq!(job.failures.len(), 1);
    assert!(job.failures[0].email.starts_with("a2."));

    // a2 never reached B, so it is skipped rather than reported.
    assert!(failure.cleanup.is_clean(), "{:?}", failure.cleanup.errors);
    assert_eq!(failure.cleanup.source_deleted.len(), 2);
    assert_eq!(failure.cleanup.target_deleted.len(), 2);
    assert_eq!(failure.cleanup.target_missing.len(), 1);
    assert!(flow.source().is_empty().await);
    assert!(flow.target().inner().is_empty().await);
}

#[tokio::test]
async fn test_job_failure_fails_success_assertion() {
    let flow = flow_with(InMemoryLeadStore::new("A"), RefusingStore::new("B", "x."));
    let lead = Lead::builder()
        .email("x.1@test.com")
        .last_name("LastName")
        .company("Good one Ltd.")
        .build()
        .unwrap();
    flow.source().create_leads(&[lead]).await.unwrap();

    let job_id = flow.run_once().await.unwrap();
    let mut helper = BatchTestHelper::for_job(flow.tracker(), &job_id);
    let job = helper
        .await_job_termination(Duration::from_secs(5), Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(job.state, JobState::Failed);

    let err = helper.assert_job_was_successful().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::JobFailed { .. }));
}

#[tokio::test]
async fn test_cleanup_skips_leads_missing_from_target() {
    let source = InMemoryLeadStore::new("A");
    let target = InMemoryLeadStore::new("B");
    let mut fixtures = Fixtures::default();
    FixtureProvisioner::new("tmpl")
        .provision_plan(
            &source,
            &target,
            &FixturePlan::lead_sync_default(),
            &mut fixtures,
        )
        .await
        .unwrap();

    let report = teardown(&source, &target, &fixtures).await;

    assert!(report.is_clean());
    assert_eq!(report.target_missing.len(), 2);
    assert_eq!(report.target_deleted.len(), 1);
    assert!(source.is_empty().await);
    assert!(target.is_empty().await);
}

#[tokio::test]
async fn test_existing_target_lead_is_updated() {
    let flow = memory_flow();
    let older = Lead::builder()
        .email("a1.shared@test.com")
        .last_name("LastName1")
        .country("Oregon")
        .company("Not so good one Ltd.")
        .build()
        .unwrap();
    flow.target().create_leads(&[older.clone()]).await.unwrap();
    let newer = Lead {
        country: Some("California".to_string()),
        ..older
    };
    flow.source().create_leads(&[newer]).await.unwrap();

    let job_id = flow.run_once().await.unwrap();
    let mut helper = BatchTestHelper::for_job(flow.tracker(), &job_id);
    helper
        .await_job_termination(Duration::from_secs(5), Duration::from_millis(10))
        .await
        .unwrap();
    helper.assert_job_was_successful().unwrap();

    assert_eq!(flow.target().len().await, 1);
    let synced = flow
        .target()
        .find_by_email("a1.shared@test.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(synced.country.as_deref(), Some("California"));
}

#[tokio::test]
async fn test_scheduler_is_stopped_by_scenario() {
    let flow = memory_flow();
    assert!(flow.start_scheduler());
    assert!(flow.is_scheduled());

    SyncScenario::new(&flow, fast_config())
        .run()
        .await
        .expect("scenario should pass");

    assert!(!flow.is_scheduled());
}

#[tokio::test(start_paused = true)]
async fn test_slow_target_times_out_instead_of_hanging() {
    let target = InMemoryLeadStore::new("B").with_latency(Duration::from_secs(30));
    let flow = flow_with(InMemoryLeadStore::new("A"), target);
    let config = leadsync::HarnessConfig::builder()
        .with_job_timeout(Duration::from_secs(2))
        .with_job_poll_interval(Duration::from_millis(500))
        .build()
        .unwrap();

    let failure = SyncScenario::new(&flow, config)
        .run()
        .await
        .expect_err("job cannot finish in time");

    assert!(failure.error.is_timeout());
    assert_eq!(failure.state_reached, ScenarioState::Waiting);
    assert!(flow.source().is_empty().await);
}

#[tokio::test]
async fn test_parallel_scenarios_use_distinct_fixtures() {
    let first = memory_flow();
    let second = memory_flow();
    let mut left = SyncScenario::new(&first, fast_config());
    let mut right = SyncScenario::new(&second, fast_config());

    let (left, right) = futures::future::join(left.run(), right.run()).await;
    let (left, right) = (left.unwrap(), right.unwrap());

    for email in left.fixtures.emails() {
        assert!(!right.fixtures.emails().contains(&email));
    }
}

#[tokio::test]
async fn test_watermark_limits_what_the_poll_reads() {
    let source = InMemoryLeadStore::new("A");
    let stale = Lead::builder()
        .email("old@test.com")
        .last_name("Old")
        .company("Old Ltd.")
        .build()
        .unwrap();
    source.create_leads(&[stale]).await.unwrap();

    let flow = leadsync::PollFlow::new(
        "triggerSyncFlow",
        std::sync::Arc::new(source),
        std::sync::Arc::new(InMemoryLeadStore::new("B")),
        leadsync::flow::JobTracker::new(),
        leadsync::flow::PipelineNotifier::default(),
        PollingConfig::builder()
            .with_watermark_default(chrono::Utc::now() + chrono::TimeDelta::milliseconds(5))
            .build()
            .unwrap(),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;

    let report = SyncScenario::new(&flow, fast_config())
        .run()
        .await
        .expect("scenario should pass");

    assert_eq!(report.job.total_records, 2);
    assert!(flow.target().find_by_email("old@test.com").await.unwrap().is_none());
}
