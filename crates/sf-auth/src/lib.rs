//! # leadsync-auth
//!
//! Credentials for the two orgs the lead sync template talks to.
//!
//! Each org is configured under its own environment prefix, so a single
//! process can hold the source (A) and target (B) sessions side by side:
//!
//! ```rust,ignore
//! use leadsync_auth::OrgCredentials;
//!
//! let org_a = OrgCredentials::from_env_or_auth_url("SF_A").await?;
//! let org_b = OrgCredentials::from_env_or_auth_url("SF_B").await?;
//! ```
//!
//! Access and refresh tokens are redacted in Debug output and never recorded
//! in tracing spans.

mod credentials;
mod error;
mod oauth;

pub use credentials::{Credentials, OrgCredentials};
pub use error::{Error, ErrorKind, Result};
pub use oauth::{OAuthClient, TokenResponse};

/// Login host for production orgs.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Login host for sandboxes and scratch orgs.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";
