//! The store contract shared by the Salesforce and in-memory backends.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::lead::{Lead, SaveResult};

/// Lead operations the sync and its harness need from an org.
///
/// Write calls return one [`SaveResult`] per submitted record, in submission
/// order. A transport or API failure of the whole call is an `Err`; a record
/// the org refused is an unsuccessful `SaveResult`.
pub trait LeadStore: Send + Sync {
    /// Label used in logs ("A", "B", an org alias).
    fn name(&self) -> &str;

    fn create_leads(&self, leads: &[Lead]) -> impl Future<Output = Result<Vec<SaveResult>>> + Send;

    /// Update leads by their `id`. A lead without an id yields a failed result.
    fn update_leads(&self, leads: &[Lead]) -> impl Future<Output = Result<Vec<SaveResult>>> + Send;

    /// Most recently modified lead with this exact Email.
    fn find_by_email(&self, email: &str) -> impl Future<Output = Result<Option<Lead>>> + Send;

    /// Leads with `LastModifiedDate` strictly after `since`, oldest first.
    /// `None` reads every lead.
    fn modified_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<Lead>>> + Send;

    fn delete_leads(&self, ids: &[String]) -> impl Future<Output = Result<Vec<SaveResult>>> + Send;
}
