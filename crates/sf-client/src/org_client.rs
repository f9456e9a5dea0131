//! Authenticated client bound to a single org.
//!
//! The access token is redacted in Debug output and skipped in tracing spans.

use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;

use crate::client::OrgHttpClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::request::{RequestBuilder, RequestMethod};
use crate::DEFAULT_API_VERSION;

/// Client for one org (instance URL + access token).
///
/// ```rust,ignore
/// let org = OrgClient::new(creds.instance_url(), creds.access_token())?
///     .with_api_version(creds.api_version());
/// let page: QueryResult<Lead> = org.query("SELECT Id, Email FROM Lead").await?;
/// ```
#[derive(Clone)]
pub struct OrgClient {
    http: OrgHttpClient,
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for OrgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgClient")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl OrgClient {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_config(instance_url, access_token, ClientConfig::default())
    }

    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self {
            http: OrgHttpClient::new(config)?,
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Set the API version (e.g., "62.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Resolve a path against the instance URL; absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.instance_url, path.trim_start_matches('/'))
        }
    }

    /// `rest_url("composite/sobjects")` -> `<instance>/services/data/v62.0/composite/sobjects`
    pub fn rest_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// Authenticated request builder for a path or URL.
    pub fn request(&self, method: RequestMethod, path: &str) -> RequestBuilder {
        RequestBuilder::new(method, self.url(path)).bearer_auth(&self.access_token)
    }

    /// Execute a prepared request and decode its JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.http.send_json(request).await
    }

    #[instrument(skip(self), fields(org = %self.instance_url))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(self.request(RequestMethod::Get, path)).await
    }

    #[instrument(skip(self, body), fields(org = %self.instance_url))]
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(self.request(RequestMethod::Post, path).json(body)?)
            .await
    }

    /// PATCH with a JSON body. SObject Collections answer PATCH with per-record results.
    #[instrument(skip(self, body), fields(org = %self.instance_url))]
    pub async fn patch_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(self.request(RequestMethod::Patch, path).json(body)?)
            .await
    }

    /// Run one SOQL page.
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryResult<T>> {
        let request = self
            .request(RequestMethod::Get, &self.rest_url("query"))
            .query("q", soql);
        self.send_json(request).await
    }

    /// Run a SOQL query and follow `nextRecordsUrl` until done.
    #[instrument(skip(self), fields(org = %self.instance_url))]
    pub async fn query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        let mut page: QueryResult<T> = self.query(soql).await?;
        let mut records = std::mem::take(&mut page.records);

        while let Some(next) = page.next_records_url.take() {
            page = self.get_json(&next).await?;
            records.append(&mut page.records);
        }

        Ok(records)
    }
}

/// One page of a SOQL query.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct QueryResult<T> {
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    pub done: bool,
    #[serde(rename = "nextRecordsUrl", default)]
    pub next_records_url: Option<String>,
    pub records: Vec<T>,
}
