//! # leadsync-harness
//!
//! Integration harness for the Salesforce-to-Salesforce lead sync template.
//!
//! A run creates uniquely named fixture Leads in both orgs, fires the poll
//! flow once, waits for the pipeline to report completion and for the batch
//! job to terminate, checks the source fixtures reached the target, and then
//! deletes every fixture whatever the outcome.
//!
//! ```text
//!   INIT ──run_once──▶ TRIGGERED ──listener──▶ WAITING ──job ok + asserts──▶ ASSERTED
//!     │                    │                      │                            │
//!     └────────────────────┴──────────────────────┴────────── teardown ───────▶ CLEANED
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use leadsync_harness::{HarnessConfig, SyncScenario};
//!
//! let mut scenario = SyncScenario::new(&flow, HarnessConfig::from_env()?);
//! match scenario.run().await {
//!     Ok(report) => println!("synced {} leads", report.synced.len()),
//!     Err(failure) => eprintln!("{failure} (cleanup clean: {})", failure.cleanup.is_clean()),
//! }
//! ```

mod assertions;
mod batch;
mod cleanup;
mod config;
mod error;
mod fixtures;
mod naming;
mod probe;
mod scenario;

pub use assertions::{assert_all_synced, assert_synced, compare_fields, DEFAULT_FIELDS};
pub use batch::{BatchTestHelper, JobStatusSource};
pub use cleanup::{teardown, CleanupIssue, CleanupReport};
pub use config::{HarnessConfig, HarnessConfigBuilder, DEFAULT_TEMPLATE_NAME, MAX_WAIT};
pub use error::{Error, ErrorKind, Result};
pub use fixtures::{FixturePlan, FixtureProvisioner, FixtureSpec, Fixtures, OrgSide};
pub use naming::{build_unique_name, unique_email, FIXTURE_EMAIL_DOMAIN};
pub use probe::{ListenerProbe, Probe, Prober};
pub use scenario::{ScenarioFailure, ScenarioReport, ScenarioState, SyncScenario};
