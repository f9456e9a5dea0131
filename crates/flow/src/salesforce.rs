//! Lead store backed by an org's REST API.
//!
//! Writes use SObject Collections (`composite/sobjects`), reads use SOQL.

use chrono::{DateTime, Utc};
use leadsync_auth::Credentials;
use leadsync_client::security::{ids, soql};
use leadsync_client::{ClientConfig, OrgClient, RequestMethod};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::lead::{soql_datetime, Lead, SaveResult, LEAD_FIELDS};
use crate::store::LeadStore;

/// Records per SObject Collections call.
pub const COLLECTION_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct SalesforceLeadStore {
    name: String,
    org: OrgClient,
}

#[derive(Serialize)]
struct CollectionRequest {
    #[serde(rename = "allOrNone")]
    all_or_none: bool,
    records: Vec<serde_json::Value>,
}

impl SalesforceLeadStore {
    pub fn new(name: impl Into<String>, org: OrgClient) -> Self {
        Self {
            name: name.into(),
            org,
        }
    }

    pub fn from_credentials(name: impl Into<String>, creds: &impl Credentials) -> Result<Self> {
        Self::from_credentials_with_config(name, creds, ClientConfig::default())
    }

    pub fn from_credentials_with_config(
        name: impl Into<String>,
        creds: &impl Credentials,
        config: ClientConfig,
    ) -> Result<Self> {
        let org = OrgClient::with_config(creds.instance_url(), creds.access_token(), config)?
            .with_api_version(creds.api_version());
        Ok(Self::new(name, org))
    }

    pub fn org(&self) -> &OrgClient {
        &self.org
    }

    fn select(&self) -> Result<String> {
        soql::select_list(LEAD_FIELDS)
            .map(|fields| format!("SELECT {fields} FROM Lead"))
            .ok_or_else(|| Error::new(ErrorKind::Store("unsafe Lead field list".to_string())))
    }

    fn collection_body(leads: &[Lead], with_ids: bool) -> Result<CollectionRequest> {
        let records = leads
            .iter()
            .map(|lead| -> Result<serde_json::Value> {
                let mut value = serde_json::to_value(lead)?;
                if let serde_json::Value::Object(ref mut map) = value {
                    map.insert(
                        "attributes".to_string(),
                        serde_json::json!({"type": "Lead"}),
                    );
                    if with_ids {
                        if let Some(ref id) = lead.id {
                            map.insert("Id".to_string(), serde_json::json!(id));
                        }
                    }
                }
                Ok(value)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CollectionRequest {
            all_or_none: false,
            records,
        })
    }

    fn check_count(&self, submitted: usize, results: &[SaveResult]) -> Result<()> {
        if results.len() == submitted {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Store(format!(
                "{} returned {} results for {} records",
                self.name,
                results.len(),
                submitted
            ))))
        }
    }
}

impl LeadStore for SalesforceLeadStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, leads), fields(store = %self.name, count = leads.len()))]
    async fn create_leads(&self, leads: &[Lead]) -> Result<Vec<SaveResult>> {
        let mut results = Vec::with_capacity(leads.len());
        for chunk in leads.chunks(COLLECTION_LIMIT) {
            let body = Self::collection_body(chunk, false)?;
            let page: Vec<SaveResult> = self
                .org
                .post_json(&self.org.rest_url("composite/sobjects"), &body)
                .await?;
            self.check_count(chunk.len(), &page)?;
            results.extend(page);
        }
        Ok(results)
    }

    #[instrument(skip(self, leads), fields(store = %self.name, count = leads.len()))]
    async fn update_leads(&self, leads: &[Lead]) -> Result<Vec<SaveResult>> {
        let mut results = Vec::with_capacity(leads.len());
        for chunk in leads.chunks(COLLECTION_LIMIT) {
            // Records without a usable id never leave the process.
            let (sendable, refused): (Vec<(usize, &Lead)>, Vec<(usize, &Lead)>) = chunk
                .iter()
                .enumerate()
                .partition(|(_, lead)| {
                    lead.id.as_deref().is_some_and(ids::is_valid_salesforce_id)
                });

            let mut page = vec![None; chunk.len()];
            for (i, _) in refused {
                page[i] = Some(SaveResult::failed(
                    "MISSING_ARGUMENT",
                    "Id not specified in an update call",
                ));
            }

            if !sendable.is_empty() {
                let records: Vec<Lead> = sendable.iter().map(|(_, l)| (*l).clone()).collect();
                let body = Self::collection_body(&records, true)?;
                let sent: Vec<SaveResult> = self
                    .org
                    .patch_json(&self.org.rest_url("composite/sobjects"), &body)
                    .await?;
                self.check_count(records.len(), &sent)?;
                for ((i, _), result) in sendable.iter().zip(sent) {
                    page[*i] = Some(result);
                }
            }

            results.extend(page.into_iter().flatten());
        }
        Ok(results)
    }

    #[instrument(skip(self), fields(store = %self.name))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>> {
        let soql = format!(
            "{} WHERE Email = '{}' ORDER BY LastModifiedDate DESC LIMIT 1",
            self.select()?,
            soql::escape_string(email)
        );
        let page = self.org.query::<Lead>(&soql).await?;
        Ok(page.records.into_iter().next())
    }

    #[instrument(skip(self), fields(store = %self.name))]
    async fn modified_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Lead>> {
        // Email is the business key; leads without one cannot be matched.
        let soql = match since {
            Some(at) => format!(
                "{} WHERE Email != null AND LastModifiedDate > {} ORDER BY LastModifiedDate ASC",
                self.select()?,
                soql_datetime(&at)
            ),
            None => format!(
                "{} WHERE Email != null ORDER BY LastModifiedDate ASC",
                self.select()?
            ),
        };
        let rows: Vec<serde_json::Value> = self.org.query_all(&soql).await?;
        let mut leads = Vec::with_capacity(rows.len());
        for row in rows {
            if row.get("Email").is_none_or(serde_json::Value::is_null) {
                warn!(id = ?row.get("Id"), "Skipping lead without an email");
                continue;
            }
            leads.push(serde_json::from_value(row)?);
        }
        Ok(leads)
    }

    #[instrument(skip(self, record_ids), fields(store = %self.name, count = record_ids.len()))]
    async fn delete_leads(&self, record_ids: &[String]) -> Result<Vec<SaveResult>> {
        if let Some(bad) = record_ids.iter().find(|id| !ids::is_valid_salesforce_id(id)) {
            return Err(Error::new(ErrorKind::InvalidLead(format!(
                "'{bad}' is not a Salesforce id"
            ))));
        }

        let mut results = Vec::with_capacity(record_ids.len());
        for chunk in record_ids.chunks(COLLECTION_LIMIT) {
            let request = self
                .org
                .request(RequestMethod::Delete, &self.org.rest_url("composite/sobjects"))
                .query("ids", chunk.join(","))
                .query("allOrNone", "false");
            let page: Vec<SaveResult> = self.org.send_json(request).await?;
            self.check_count(chunk.len(), &page)?;
            results.extend(page);
        }
        Ok(results)
    }
}
