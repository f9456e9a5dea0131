//! # leadsync-client
//!
//! HTTP core shared by every org-facing part of the lead sync template.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        SalesforceLeadStore (leadsync-flow), harness         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        OrgClient                            │
//! │  - bound to one org (instance URL + access token)           │
//! │  - REST URL helpers, typed JSON calls, SOQL paging          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      OrgHttpClient                          │
//! │  - retry with backoff + jitter, Retry-After handling        │
//! │  - Salesforce error body mapping, API usage warnings        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use leadsync_client::OrgClient;
//!
//! let org_a = OrgClient::new("https://org-a.my.salesforce.com", token)?;
//! let leads: Vec<serde_json::Value> = org_a
//!     .query_all("SELECT Id, Email FROM Lead LIMIT 10")
//!     .await?;
//! ```

mod client;
mod config;
mod error;
mod org_client;
mod request;
mod response;
mod retry;
pub mod security;

pub use client::OrgHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use org_client::{OrgClient, QueryResult};
pub use request::{RequestBuilder, RequestMethod};
pub use response::{ApiUsage, Response};
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "62.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("leadsync/", env!("CARGO_PKG_VERSION"));

/// API usage percentage above which responses log a warning.
pub const API_USAGE_WARN_PERCENT: f64 = 90.0;
