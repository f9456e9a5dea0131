//! Test data created in both orgs before the poll fires.

use leadsync_flow::{Lead, LeadStore};
use tracing::{info, instrument};

use crate::error::{Error, ErrorKind, Result};
use crate::naming::unique_email;

/// Which org a fixture lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrgSide {
    /// Source org (A)
    Source,
    /// Target org (B)
    Target,
}

/// Field values for one fixture lead. The Email is generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSpec {
    pub prefix: String,
    pub first_name: Option<String>,
    pub last_name: String,
    pub country: Option<String>,
    pub company: String,
}

impl FixtureSpec {
    pub fn new(
        prefix: impl Into<String>,
        last_name: impl Into<String>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            first_name: None,
            last_name: last_name.into(),
            country: None,
            company: company.into(),
        }
    }

    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// The leads to create in each org.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixturePlan {
    pub source: Vec<FixtureSpec>,
    pub target: Vec<FixtureSpec>,
}

impl FixturePlan {
    /// One pre-existing lead in B, two leads in A to be synced.
    pub fn lead_sync_default() -> Self {
        Self {
            target: vec![FixtureSpec::new("b.", "LastName", "Good one Ltd.")
                .first_name("FirstName")
                .country("California")],
            source: vec![
                FixtureSpec::new("a1.", "LastName1", "Not so good one Ltd.")
                    .first_name("FirstName1")
                    .country("California"),
                FixtureSpec::new("a2.", "LastName2", "Best one Ltd.")
                    .first_name("FirstName2")
                    .country("North Dakota"),
            ],
        }
    }
}

/// Every fixture created so far, with ids where the create succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fixtures {
    pub source: Vec<Lead>,
    pub target: Vec<Lead>,
}

impl Fixtures {
    pub fn side(&self, side: OrgSide) -> &[Lead] {
        match side {
            OrgSide::Source => &self.source,
            OrgSide::Target => &self.target,
        }
    }

    fn side_mut(&mut self, side: OrgSide) -> &mut Vec<Lead> {
        match side {
            OrgSide::Source => &mut self.source,
            OrgSide::Target => &mut self.target,
        }
    }

    /// Ids of created source fixtures.
    pub fn source_ids(&self) -> Vec<String> {
        self.source.iter().filter_map(|lead| lead.id.clone()).collect()
    }

    /// Emails of every fixture, source first.
    pub fn emails(&self) -> Vec<&str> {
        self.source
            .iter()
            .chain(&self.target)
            .map(|lead| lead.email.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.target.is_empty()
    }
}

/// Builds uniquely named fixtures and creates them through a store.
#[derive(Debug, Clone)]
pub struct FixtureProvisioner {
    template_name: String,
}

impl FixtureProvisioner {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
        }
    }

    /// A lead for `spec` with a fresh unique Email.
    pub fn build(&self, spec: &FixtureSpec) -> Result<Lead> {
        let mut builder = Lead::builder()
            .email(unique_email(&self.template_name, &spec.prefix))
            .last_name(&spec.last_name)
            .company(&spec.company);
        if let Some(ref first_name) = spec.first_name {
            builder = builder.first_name(first_name);
        }
        if let Some(ref country) = spec.country {
            builder = builder.country(country);
        }
        builder
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Setup(e.to_string()), e))
    }

    /// Create `specs` in `store` and record them in `fixtures`.
    ///
    /// Leads are recorded before the outcome is checked, so teardown sees
    /// every lead that may exist even when this returns an error.
    #[instrument(skip(self, store, specs, fixtures), fields(store = %store.name(), count = specs.len()))]
    pub async fn provision<S: LeadStore>(
        &self,
        store: &S,
        side: OrgSide,
        specs: &[FixtureSpec],
        fixtures: &mut Fixtures,
    ) -> Result<()> {
        let mut leads = specs
            .iter()
            .map(|spec| self.build(spec))
            .collect::<Result<Vec<_>>>()?;

        let outcome = store.create_leads(&leads).await;
        let results = match outcome {
            Ok(results) => results,
            Err(err) => {
                fixtures.side_mut(side).extend(leads);
                return Err(Error::with_source(
                    ErrorKind::Setup(format!("creating fixtures in {} failed", store.name())),
                    err,
                ));
            }
        };

        let mut problem = None;
        if results.len() != leads.len() {
            problem = Some(format!(
                "{} returned {} results for {} fixtures",
                store.name(),
                results.len(),
                leads.len()
            ));
        }
        for (lead, result) in leads.iter_mut().zip(&results) {
            match (&result.id, result.success) {
                (Some(id), true) => {
                    if let Err(e) = lead.set_id(id.clone()) {
                        problem.get_or_insert_with(|| e.to_string());
                    }
                }
                _ => {
                    problem.get_or_insert_with(|| {
                        format!(
                            "fixture {} was not created: {}",
                            lead.email,
                            result
                                .error_message()
                                .unwrap_or_else(|| "no id returned".to_string())
                        )
                    });
                }
            }
        }

        fixtures.side_mut(side).extend(leads);
        match problem {
            Some(message) => Err(Error::new(ErrorKind::Setup(message))),
            None => {
                info!("Fixtures created");
                Ok(())
            }
        }
    }

    /// Create the whole plan: target fixtures first, then source fixtures.
    pub async fn provision_plan<S: LeadStore, T: LeadStore>(
        &self,
        source: &S,
        target: &T,
        plan: &FixturePlan,
        fixtures: &mut Fixtures,
    ) -> Result<()> {
        self.provision(target, OrgSide::Target, &plan.target, fixtures)
            .await?;
        self.provision(source, OrgSide::Source, &plan.source, fixtures)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadsync_flow::{InMemoryLeadStore, SaveResult};

    #[test]
    fn test_default_plan() {
        let plan = FixturePlan::lead_sync_default();
        assert_eq!(plan.target.len(), 1);
        assert_eq!(plan.target[0].prefix, "b.");
        assert_eq!(plan.target[0].company, "Good one Ltd.");
        let countries: Vec<_> = plan.source.iter().map(|s| s.country.as_deref()).collect();
        assert_eq!(countries, vec![Some("California"), Some("North Dakota")]);
    }

    #[test]
    fn test_build_generates_unique_emails() {
        let provisioner = FixtureProvisioner::new("tmpl");
        let spec = FixtureSpec::new("a1.", "LastName1", "Not so good one Ltd.");
        let first = provisioner.build(&spec).unwrap();
        let second = provisioner.build(&spec).unwrap();
        assert_ne!(first.email, second.email);
        assert!(first.email.starts_with("a1.tmpl"));
        assert!(first.id.is_none());
    }

    #[tokio::test]
    async fn test_provision_assigns_ids_in_order() {
        let store = InMemoryLeadStore::new("A");
        let provisioner = FixtureProvisioner::new("tmpl");
        let plan = FixturePlan::lead_sync_default();
        let mut fixtures = Fixtures::default();

        provisioner
            .provision(&store, OrgSide::Source, &plan.source, &mut fixtures)
            .await
            .unwrap();

        assert_eq!(fixtures.source.len(), 2);
        for lead in &fixtures.source {
            let id = lead.id.as_deref().unwrap();
            assert_eq!(store.get(id).await.unwrap().email, lead.email);
        }
        assert_eq!(fixtures.source_ids().len(), 2);
    }

    #[tokio::test]
    async fn test_provision_failure_still_records_created_leads() {
        struct HalfBroken;

        impl LeadStore for HalfBroken {
            fn name(&self) -> &str {
                "half"
            }

            async fn create_leads(&self, leads: &[Lead]) -> leadsync_flow::Result<Vec<SaveResult>> {
                Ok(leads
                    .iter()
                    .enumerate()
                    .map(|(i, _)| {
                        if i == 0 {
                            SaveResult::ok("00Q000000000001")
                        } else {
                            SaveResult::failed("DUPLICATES_DETECTED", "duplicate")
                        }
                    })
                    .collect())
            }

            async fn update_leads(&self, _: &[Lead]) -> leadsync_flow::Result<Vec<SaveResult>> {
                Ok(Vec::new())
            }

            async fn find_by_email(&self, _: &str) -> leadsync_flow::Result<Option<Lead>> {
                Ok(None)
            }

            async fn modified_since(
                &self,
                _: Option<chrono::DateTime<chrono::Utc>>,
            ) -> leadsync_flow::Result<Vec<Lead>> {
                Ok(Vec::new())
            }

            async fn delete_leads(&self, _: &[String]) -> leadsync_flow::Result<Vec<SaveResult>> {
                Ok(Vec::new())
            }
        }

        let provisioner = FixtureProvisioner::new("tmpl");
        let mut fixtures = Fixtures::default();
        let err = provisioner
            .provision(
                &HalfBroken,
                OrgSide::Source,
                &FixturePlan::lead_sync_default().source,
                &mut fixtures,
            )
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::Setup(ref m) if m.contains("DUPLICATES_DETECTED")));
        assert_eq!(fixtures.source.len(), 2);
        assert_eq!(fixtures.source_ids(), vec!["00Q000000000001".to_string()]);
    }

    #[tokio::test]
    async fn test_provision_plan_creates_both_sides() {
        let source = InMemoryLeadStore::new("A");
        let target = InMemoryLeadStore::new("B");
        let mut fixtures = Fixtures::default();
        FixtureProvisioner::new("tmpl")
            .provision_plan(
                &source,
                &target,
                &FixturePlan::lead_sync_default(),
                &mut fixtures,
            )
            .await
            .unwrap();

        assert_eq!(fixtures.emails().len(), 3);
        assert_eq!(source.len().await, 2);
        assert_eq!(target.len().await, 1);
        assert!(fixtures.side(OrgSide::Target)[0].email.starts_with("b.tmpl"));
    }
}
