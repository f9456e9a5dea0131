use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use leadsync::flow::{
    JobTracker, Lead, LeadStore, PipelineNotifier, PollingConfig, Result, SaveResult,
    DEFAULT_FLOW_NAME,
};
use leadsync::{HarnessConfig, InMemoryLeadStore, OrgCredentials, PollFlow};

pub type MemoryFlow<T = InMemoryLeadStore> = PollFlow<InMemoryLeadStore, T>;

/// Poll flow between two fresh in-memory orgs.
pub fn memory_flow() -> MemoryFlow {
    flow_with(InMemoryLeadStore::new("A"), InMemoryLeadStore::new("B"))
}

pub fn flow_with<T: LeadStore + 'static>(source: InMemoryLeadStore, target: T) -> MemoryFlow<T> {
    PollFlow::new(
        DEFAULT_FLOW_NAME,
        Arc::new(source),
        Arc::new(target),
        JobTracker::new(),
        PipelineNotifier::default(),
        PollingConfig::default(),
    )
}

/// Short waits so failing scenarios finish quickly.
pub fn fast_config() -> HarnessConfig {
    HarnessConfig::builder()
        .with_template_name("sfdc2sfdc-lead-sync-it")
        .with_job_timeout(Duration::from_secs(5))
        .with_job_poll_interval(Duration::from_millis(20))
        .with_probe_timeout(Duration::from_secs(1))
        .with_probe_interval(Duration::from_millis(20))
        .build()
        .expect("valid harness config")
}

/// In-memory org that refuses creates and updates of leads whose Email
/// starts with `prefix`.
#[derive(Debug)]
pub struct RefusingStore {
    inner: InMemoryLeadStore,
    prefix: String,
}

impl RefusingStore {
    pub fn new(name: &str, prefix: &str) -> Self {
        Self {
            inner: InMemoryLeadStore::new(name),
            prefix: prefix.to_string(),
        }
    }

    pub fn inner(&self) -> &InMemoryLeadStore {
        &self.inner
    }

    /// Refused leads get a failed result in place; the rest go through.
    async fn write(&self, leads: &[Lead], update: bool) -> Result<Vec<SaveResult>> {
        let (refused, allowed): (Vec<_>, Vec<_>) = leads
            .iter()
            .cloned()
            .enumerate()
            .partition(|(_, lead)| lead.email.starts_with(&self.prefix));
        let allowed_leads: Vec<Lead> = allowed.iter().map(|(_, lead)| lead.clone()).collect();
        let mut written = if update {
            self.inner.update_leads(&allowed_leads).await?
        } else {
            self.inner.create_leads(&allowed_leads).await?
        }
        .into_iter();

        let mut results = Vec::with_capacity(leads.len());
        for i in 0..leads.len() {
            if refused.iter().any(|(j, _)| *j == i) {
                results.push(SaveResult::failed("FIELD_CUSTOM_VALIDATION_EXCEPTION", "refused"));
            } else if let Some(result) = written.next() {
                results.push(result);
            }
        }
        Ok(results)
    }
}

impl LeadStore for RefusingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn create_leads(&self, leads: &[Lead]) -> Result<Vec<SaveResult>> {
        self.write(leads, false).await
    }

    async fn update_leads(&self, leads: &[Lead]) -> Result<Vec<SaveResult>> {
        self.write(leads, true).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>> {
        self.inner.find_by_email(email).await
    }

    async fn modified_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Lead>> {
        self.inner.modified_since(since).await
    }

    async fn delete_leads(&self, ids: &[String]) -> Result<Vec<SaveResult>> {
        self.inner.delete_leads(ids).await
    }
}

/// Credentials for one of the two real orgs, `SF_A` or `SF_B`.
///
/// Panics with setup instructions when the variables are missing. Tests that
/// call this are `#[ignore]`d and only run on request.
pub async fn org_credentials(prefix: &str) -> OrgCredentials {
    match OrgCredentials::from_env_or_auth_url(prefix).await {
        Ok(creds) => creds,
        Err(e) => panic!(
            "\n\n\
            Could not load {prefix} credentials: {e}\n\n\
            To fix:\n  \
              1. Authenticate: sf org login web -a <alias>\n  \
              2. Get auth URL: sf org display --verbose -o <alias>\n  \
              3. Export:       export {prefix}_AUTH_URL='force://...'\n\n"
        ),
    }
}
