//! # leadsync-flow
//!
//! The lead sync itself: a poll flow that reads Leads changed in org A and a
//! batch job that creates or updates them in org B, matched by Email.
//!
//! ```text
//!   PollFlow ──modified_since(watermark)──▶ source LeadStore (A)
//!      │
//!      ├── JobTracker::register ──▶ BatchJob ──find_by_email / create / update──▶ target LeadStore (B)
//!      │
//!      └── PipelineNotifier::publish(Completed { flow, job_id, records })
//! ```
//!
//! Both orgs sit behind [`LeadStore`]. [`SalesforceLeadStore`] talks to a
//! real org; [`InMemoryLeadStore`] stands in for one in tests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use leadsync_flow::{InMemoryLeadStore, JobTracker, PipelineNotifier, PollFlow, PollingConfig};
//!
//! let flow = PollFlow::new(
//!     "triggerSyncFlow",
//!     Arc::new(InMemoryLeadStore::new("A")),
//!     Arc::new(InMemoryLeadStore::new("B")),
//!     JobTracker::new(),
//!     PipelineNotifier::default(),
//!     PollingConfig::default(),
//! );
//! let job_id = flow.run_once().await?;
//! ```

mod config;
mod error;
mod flow;
mod job;
mod lead;
mod memory;
mod notification;
mod salesforce;
mod store;

pub use config::{
    PollingConfig, PollingConfigBuilder, DEFAULT_BLOCK_SIZE, DEFAULT_POLL_FREQUENCY,
    DEFAULT_START_DELAY,
};
pub use error::{Error, ErrorKind, Result};
pub use flow::{PollFlow, DEFAULT_FLOW_NAME};
pub use job::{BatchJob, JobId, JobSnapshot, JobState, JobTracker, RecordFailure};
pub use lead::{soql_datetime, Lead, LeadBuilder, LeadField, SaveError, SaveResult, LEAD_FIELDS};
pub use memory::InMemoryLeadStore;
pub use notification::{PipelineEvent, PipelineListener, PipelineNotifier};
pub use salesforce::{SalesforceLeadStore, COLLECTION_LIMIT};
pub use store::LeadStore;
