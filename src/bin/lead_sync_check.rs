//! Run the lead sync scenario once against two real orgs.
//!
//! Creates fixture leads in both orgs, fires the poll flow, waits for the
//! batch job, checks the leads arrived in org B and deletes every fixture.
//!
//! ```sh
//! export SF_A_AUTH_URL='force://PlatformCLI::...'
//! export SF_B_AUTH_URL='force://PlatformCLI::...'
//! cargo run --bin lead-sync-check
//! ```
//!
//! `SF_A_INSTANCE_URL` / `SF_A_ACCESS_TOKEN` (and the `SF_B_` pair) work in
//! place of the auth URLs.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use leadsync::flow::{JobTracker, PipelineNotifier, PollingConfig, DEFAULT_FLOW_NAME};
use leadsync::harness::{CleanupReport, ScenarioReport};
use leadsync::{
    ClientConfig, Credentials, HarnessConfig, OrgCredentials, PollFlow, SalesforceLeadStore,
    SyncScenario,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!();
            eprintln!("  1. Authenticate: sf org login web -a org-a (and org-b)");
            eprintln!("  2. Get auth URL: sf org display --verbose -o org-a");
            eprintln!("  3. Export:       export SF_A_AUTH_URL='force://...' (and SF_B_AUTH_URL)");
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` means the scenario ran and failed.
async fn run() -> anyhow::Result<bool> {
    let org_a = OrgCredentials::from_env_or_auth_url("SF_A")
        .await
        .context("loading org A credentials")?;
    let org_b = OrgCredentials::from_env_or_auth_url("SF_B")
        .await
        .context("loading org B credentials")?;

    let mut polling = PollingConfig::from_env()?;
    polling.watermark_default = Some(chrono::Utc::now() - chrono::TimeDelta::minutes(1));
    let harness = HarnessConfig::from_env()?;
    let http = ClientConfig::from_env()?;

    println!(
        "Checking lead sync {} -> {}",
        org_a.instance_url(),
        org_b.instance_url()
    );

    let flow = PollFlow::new(
        DEFAULT_FLOW_NAME,
        Arc::new(SalesforceLeadStore::from_credentials_with_config(
            "A",
            &org_a,
            http.clone(),
        )?),
        Arc::new(SalesforceLeadStore::from_credentials_with_config(
            "B", &org_b, http,
        )?),
        JobTracker::new(),
        PipelineNotifier::default(),
        polling,
    );

    let mut scenario = SyncScenario::new(&flow, harness);
    match scenario.run().await {
        Ok(report) => {
            print_report(&report);
            print_cleanup(&report.cleanup);
            println!("\nPASSED");
            Ok(true)
        }
        Err(failure) => {
            println!("\nFAILED in state {}: {}", failure.state_reached, failure.error);
            if let Some(ref job) = failure.job {
                println!(
                    "  job {}: {} ({} of {} records failed)",
                    job.id, job.state, job.failed_records, job.total_records
                );
                for record in &job.failures {
                    println!("    {}: {}", record.email, record.message);
                }
            }
            print_cleanup(&failure.cleanup);
            Ok(false)
        }
    }
}

fn print_report(report: &ScenarioReport) {
    let job = &report.job;
    println!(
        "  job {}: {} ({} processed, {} successful)",
        job.id, job.state, job.processed_records, job.successful_records
    );
    for lead in &report.synced {
        println!(
            "  synced {} -> {}",
            lead.email,
            lead.id.as_deref().unwrap_or("?")
        );
    }
}

fn print_cleanup(cleanup: &CleanupReport) {
    println!(
        "  cleanup: {} deleted in A, {} deleted in B, {} not found in B",
        cleanup.source_deleted.len(),
        cleanup.target_deleted.len(),
        cleanup.target_missing.len()
    );
    for issue in &cleanup.errors {
        println!("  WARNING cleanup {issue}");
    }
}
