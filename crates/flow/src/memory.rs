//! In-process org stand-in for tests and dry runs.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::lead::{Lead, SaveResult};
use crate::store::LeadStore;

/// A lead store held in memory.
///
/// Ids look like real Lead ids (`00Q` prefix, 18 characters). Every write
/// stamps `LastModifiedDate` with a strictly increasing time, so watermark
/// queries behave as they do against an org.
#[derive(Debug)]
pub struct InMemoryLeadStore {
    name: String,
    org_tag: char,
    state: RwLock<StoreState>,
    next_id: AtomicU64,
    failing_emails: std::sync::RwLock<HashSet<String>>,
    fail_queries: AtomicBool,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct StoreState {
    records: BTreeMap<String, Lead>,
    last_stamp: Option<DateTime<Utc>>,
}

impl StoreState {
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::milliseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

impl InMemoryLeadStore {
    /// `name` doubles as the id tag: its first alphanumeric character is
    /// embedded in every id so ids from two stores never coincide.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let org_tag = name
            .chars()
            .find(char::is_ascii_alphanumeric)
            .unwrap_or('X')
            .to_ascii_uppercase();
        Self {
            name,
            org_tag,
            state: RwLock::new(StoreState::default()),
            next_id: AtomicU64::new(1),
            failing_emails: std::sync::RwLock::new(HashSet::new()),
            fail_queries: AtomicBool::new(false),
            latency: None,
        }
    }

    /// Delay every call, to simulate a slow org.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Refuse creates and updates of leads with this Email.
    pub fn fail_writes_for(&self, email: impl Into<String>) {
        self.failing_emails
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(email.into());
    }

    /// Make `modified_since` and `find_by_email` fail.
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Override a record's `LastModifiedDate`.
    pub async fn set_last_modified(&self, id: &str, at: DateTime<Utc>) -> bool {
        let mut state = self.state.write().await;
        match state.records.get_mut(id) {
            Some(lead) => {
                lead.last_modified_date = Some(at);
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Lead> {
        self.state.read().await.records.get(id).cloned()
    }

    pub async fn all(&self) -> Vec<Lead> {
        self.state.read().await.records.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn mint_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("00Q{}{:014}", self.org_tag, n)
    }

    fn write_refused(&self, lead: &Lead) -> bool {
        self.failing_emails
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&lead.email)
    }

    async fn simulate(&self, query: bool) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if query && self.fail_queries.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::Store(format!(
                "{} is not answering queries",
                self.name
            ))));
        }
        Ok(())
    }
}

impl LeadStore for InMemoryLeadStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_leads(&self, leads: &[Lead]) -> Result<Vec<SaveResult>> {
        self.simulate(false).await?;
        let mut state = self.state.write().await;

        let results = leads
            .iter()
            .map(|lead| {
                if self.write_refused(lead) {
                    return SaveResult::failed("CANNOT_INSERT_UPDATE_ACTIVATE_ENTITY", "write refused");
                }
                let id = self.mint_id();
                let mut stored = lead.clone();
                stored.id = Some(id.clone());
                stored.last_modified_date = Some(state.next_stamp());
                state.records.insert(id.clone(), stored);
                SaveResult::ok(id)
            })
            .collect();

        debug!(store = %self.name, count = leads.len(), "Created leads");
        Ok(results)
    }

    async fn update_leads(&self, leads: &[Lead]) -> Result<Vec<SaveResult>> {
        self.simulate(false).await?;
        let mut state = self.state.write().await;

        let results = leads
            .iter()
            .map(|lead| {
                let Some(id) = lead.id.as_deref() else {
                    return SaveResult::failed("MISSING_ARGUMENT", "Id not specified in an update call");
                };
                if self.write_refused(lead) {
                    return SaveResult::failed("CANNOT_INSERT_UPDATE_ACTIVATE_ENTITY", "write refused");
                }
                let stamp = state.next_stamp();
                match state.records.get_mut(id) {
                    Some(existing) => {
                        *existing = Lead {
                            id: Some(id.to_string()),
                            last_modified_date: Some(stamp),
                            ..lead.clone()
                        };
                        SaveResult::ok(id)
                    }
                    None => SaveResult::failed("ENTITY_IS_DELETED", "entity is deleted"),
                }
            })
            .collect();

        debug!(store = %self.name, count = leads.len(), "Updated leads");
        Ok(results)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>> {
        self.simulate(true).await?;
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|lead| lead.email == email)
            .max_by_key(|lead| lead.last_modified_date)
            .cloned())
    }

    async fn modified_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Lead>> {
        self.simulate(true).await?;
        let state = self.state.read().await;
        let mut leads: Vec<Lead> = state
            .records
            .values()
            .filter(|lead| match (since, lead.last_modified_date) {
                (Some(since), Some(at)) => at > since,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();
        leads.sort_by_key(|lead| lead.last_modified_date);
        Ok(leads)
    }

    async fn delete_leads(&self, ids: &[String]) -> Result<Vec<SaveResult>> {
        self.simulate(false).await?;
        let mut state = self.state.write().await;
        Ok(ids
            .iter()
            .map(|id| match state.records.remove(id) {
                Some(_) => SaveResult::ok(id.clone()),
                None => SaveResult::failed("ENTITY_IS_DELETED", "entity is deleted"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(email: &str) -> Lead {
        Lead::builder()
            .email(email)
            .last_name("LastName")
            .company("Good one Ltd.")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_stamps() {
        let store = InMemoryLeadStore::new("A");
        let results = store
            .create_leads(&[lead("a1@test.com"), lead("a2@test.com")])
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.success));
        let first = results[0].id.clone().unwrap();
        assert_eq!(first.len(), 18);
        assert!(first.starts_with("00QA"));

        let stored = store.all().await;
        assert!(stored[0].last_modified_date < stored[1].last_modified_date);
    }

    #[tokio::test]
    async fn test_ids_differ_between_stores() {
        let a = InMemoryLeadStore::new("A");
        let b = InMemoryLeadStore::new("B");
        let id_a = a.create_leads(&[lead("x@test.com")]).await.unwrap()[0].id.clone();
        let id_b = b.create_leads(&[lead("x@test.com")]).await.unwrap()[0].id.clone();
        assert_ne!(id_a, id_b);
    }

    #[tokio::test]
    async fn test_modified_since_is_strict_and_ordered() {
        let store = InMemoryLeadStore::new("A");
        store.create_leads(&[lead("one@test.com")]).await.unwrap();
        let watermark = store.all().await[0].last_modified_date;
        store.create_leads(&[lead("two@test.com")]).await.unwrap();

        let newer = store.modified_since(watermark).await.unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].email, "two@test.com");
        assert_eq!(store.modified_since(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = InMemoryLeadStore::new("B");
        let id = store.create_leads(&[lead("b@test.com")]).await.unwrap()[0]
            .id
            .clone()
            .unwrap();

        let mut changed = lead("b@test.com");
        changed.id = Some(id.clone());
        changed.country = Some("California".into());
        assert!(store.update_leads(&[changed]).await.unwrap()[0].success);
        assert_eq!(
            store.get(&id).await.unwrap().country.as_deref(),
            Some("California")
        );

        let missing = store.update_leads(&[lead("no-id@test.com")]).await.unwrap();
        assert!(!missing[0].success);

        let deleted = store.delete_leads(&[id.clone(), id]).await.unwrap();
        assert!(deleted[0].success);
        assert!(!deleted[1].success);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_find_by_email_and_failure_injection() {
        let store = InMemoryLeadStore::new("B");
        store.fail_writes_for("bad@test.com");
        let results = store
            .create_leads(&[lead("bad@test.com"), lead("good@test.com")])
            .await
            .unwrap();
        assert!(!results[0].success);
        assert!(results[1].success);

        assert!(store.find_by_email("bad@test.com").await.unwrap().is_none());
        assert!(store.find_by_email("good@test.com").await.unwrap().is_some());

        store.fail_queries(true);
        assert!(store.find_by_email("good@test.com").await.is_err());
        assert!(store.modified_since(None).await.is_err());
    }
}
