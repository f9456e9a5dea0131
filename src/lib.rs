//! # leadsync
//!
//! Salesforce-to-Salesforce Lead sync template and the harness that checks it
//! end to end.
//!
//! Access tokens and refresh tokens are redacted from `Debug` output and
//! skipped by tracing spans. Salesforce error messages are scrubbed of session
//! ids before they reach an error value.
//!
//! ## Crates
//!
//! - **leadsync-client** - HTTP core: retry with backoff, org client, SOQL paging
//! - **leadsync-auth** - Org credentials from env or SFDX auth URL, OAuth refresh
//! - **leadsync-flow** - Lead model, lead stores, poll flow, batch job, job tracker
//! - **leadsync-harness** - Fixtures, poll trigger, completion wait, assertions, teardown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leadsync::{HarnessConfig, OrgCredentials, PollFlow, SalesforceLeadStore, SyncScenario};
//! use leadsync::flow::{JobTracker, PipelineNotifier, PollingConfig, DEFAULT_FLOW_NAME};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let org_a = OrgCredentials::from_env_or_auth_url("SF_A").await?;
//!     let org_b = OrgCredentials::from_env_or_auth_url("SF_B").await?;
//!
//!     let flow = PollFlow::new(
//!         DEFAULT_FLOW_NAME,
//!         Arc::new(SalesforceLeadStore::from_credentials("A", &org_a)?),
//!         Arc::new(SalesforceLeadStore::from_credentials("B", &org_b)?),
//!         JobTracker::new(),
//!         PipelineNotifier::default(),
//!         PollingConfig::from_env()?,
//!     );
//!
//!     let report = SyncScenario::new(&flow, HarnessConfig::from_env()?).run().await?;
//!     println!("job {} synced {} leads", report.job.id, report.synced.len());
//!     Ok(())
//! }
//! ```

pub use leadsync_auth as auth;
pub use leadsync_client as client;
pub use leadsync_flow as flow;
pub use leadsync_harness as harness;

pub use leadsync_auth::{Credentials, OrgCredentials};
pub use leadsync_client::{ClientConfig, OrgClient};
pub use leadsync_flow::{InMemoryLeadStore, Lead, LeadStore, PollFlow, SalesforceLeadStore};
pub use leadsync_harness::{HarnessConfig, ScenarioFailure, ScenarioReport, SyncScenario};
