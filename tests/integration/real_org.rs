//! Scenarios against two real orgs. Ignored by default; they need `SF_A_*`
//! and `SF_B_*` credentials and create (then delete) Leads in both orgs.

use std::sync::Arc;

use leadsync::flow::{
    JobState, JobTracker, LeadStore, PipelineNotifier, PollingConfig, DEFAULT_FLOW_NAME,
};
use leadsync::harness::{unique_email, ScenarioState};
use leadsync::{HarnessConfig, Lead, PollFlow, SalesforceLeadStore, SyncScenario};

use super::common::org_credentials;

async fn org_store(prefix: &str, name: &str) -> SalesforceLeadStore {
    let creds = org_credentials(prefix).await;
    SalesforceLeadStore::from_credentials(name, &creds).expect("lead store for org")
}

#[tokio::test]
#[ignore = "needs SF_A_* and SF_B_* org credentials"]
async fn test_lead_sync_between_orgs() {
    let mut polling = PollingConfig::default();
    polling.watermark_default = Some(chrono::Utc::now() - chrono::TimeDelta::minutes(1));

    let flow = PollFlow::new(
        DEFAULT_FLOW_NAME,
        Arc::new(org_store("SF_A", "A").await),
        Arc::new(org_store("SF_B", "B").await),
        JobTracker::new(),
        PipelineNotifier::default(),
        polling,
    );

    let mut scenario = SyncScenario::new(&flow, HarnessConfig::default());
    let report = match scenario.run().await {
        Ok(report) => report,
        Err(failure) => panic!(
            "{failure}\njob: {:?}\ncleanup: {:?}",
            failure.job, failure.cleanup
        ),
    };

    assert_eq!(scenario.state(), ScenarioState::Cleaned);
    assert_eq!(report.job.state, JobState::Successful);
    assert_eq!(report.synced.len(), 2);
    assert!(report.cleanup.is_clean(), "{:?}", report.cleanup.errors);
}

#[tokio::test]
#[ignore = "needs SF_A_* org credentials"]
async fn test_salesforce_store_create_find_delete() {
    let store = org_store("SF_A", "A").await;
    let lead = Lead::builder()
        .email(unique_email("sfdc2sfdc-lead-sync", "store."))
        .first_name("FirstName")
        .last_name("LastName")
        .country("California")
        .company("Good one Ltd.")
        .build()
        .unwrap();

    let created = store.create_leads(&[lead.clone()]).await.unwrap();
    assert!(created[0].success, "{:?}", created[0].errors);
    let id = created[0].id.clone().unwrap();

    let found = store.find_by_email(&lead.email).await.unwrap().unwrap();
    assert_eq!(found.id.as_deref(), Some(id.as_str()));
    assert_eq!(found.company, "Good one Ltd.");
    assert!(found.last_modified_date.is_some());

    let deleted = store.delete_leads(&[id]).await.unwrap();
    assert!(deleted[0].success);
    assert!(store.find_by_email(&lead.email).await.unwrap().is_none());
}
