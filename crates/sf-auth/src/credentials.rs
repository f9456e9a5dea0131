//! Per-org credentials.
//!
//! Debug output redacts the access and refresh tokens.

use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};
use crate::oauth::OAuthClient;
use crate::{PRODUCTION_LOGIN_URL, SANDBOX_LOGIN_URL};

/// Anything that can authenticate calls against one org.
pub trait Credentials: Send + Sync {
    fn instance_url(&self) -> &str;

    fn access_token(&self) -> &str;

    /// API version, e.g. "62.0".
    fn api_version(&self) -> &str;

    /// True when neither the instance URL nor the token is empty.
    fn is_valid(&self) -> bool {
        !self.instance_url().is_empty() && !self.access_token().is_empty()
    }
}

/// Session for one of the two orgs (A or B).
#[derive(Clone)]
pub struct OrgCredentials {
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for OrgCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgCredentials")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl OrgCredentials {
    pub fn new(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            access_token: access_token.into(),
            api_version: api_version.into(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Load credentials from variables under `prefix`.
    ///
    /// With `prefix = "SF_A"`:
    /// - `SF_A_INSTANCE_URL` (required)
    /// - `SF_A_ACCESS_TOKEN` (required)
    /// - `SF_A_API_VERSION` (default: "62.0")
    pub fn from_env_prefixed(prefix: &str) -> Result<Self> {
        let instance_url = required_var(prefix, "INSTANCE_URL")?;
        let access_token = required_var(prefix, "ACCESS_TOKEN")?;
        let api_version = std::env::var(format!("{prefix}_API_VERSION"))
            .unwrap_or_else(|_| leadsync_client::DEFAULT_API_VERSION.to_string());

        Ok(Self::new(instance_url, access_token, api_version))
    }

    /// Exchange an SFDX auth URL for a live session. The refresh token is
    /// spent here and not kept.
    ///
    /// Accepted shapes:
    /// - `force://<client_id>:<client_secret>:<refresh_token>@<instance_url>`
    /// - `force://<client_id>::<refresh_token>@<instance_url>` (no secret)
    /// - `force://<client_id>:<client_secret>:<refresh_token>:<username>@<instance_url>`
    #[instrument(skip(auth_url))]
    pub async fn from_sfdx_auth_url(auth_url: &str) -> Result<Self> {
        let parsed = AuthUrl::parse(auth_url)?;

        let mut oauth = OAuthClient::new(parsed.client_id);
        if let Some(secret) = parsed.client_secret {
            oauth = oauth.with_secret(secret);
        }

        let login_url = login_url_for(parsed.instance_url);
        debug!(login_url, "Refreshing org session");

        let token = oauth
            .refresh_token(parsed.refresh_token, login_url)
            .await
            .map_err(|e| {
                if !e.is_expired_grant() {
                    return e;
                }
                Error::new(ErrorKind::OAuth {
                    error: "invalid_grant".to_string(),
                    description: format!(
                        "Refresh token expired or invalid. Generate a fresh auth URL with \
                         `sf org display --verbose --json`. Original error: {e}"
                    ),
                })
            })?;

        Ok(Self::new(
            token.instance_url,
            token.access_token,
            leadsync_client::DEFAULT_API_VERSION,
        ))
    }

    /// Prefer `<prefix>_AUTH_URL` when set, else the plain variables.
    pub async fn from_env_or_auth_url(prefix: &str) -> Result<Self> {
        match std::env::var(format!("{prefix}_AUTH_URL")) {
            Ok(auth_url) if !auth_url.trim().is_empty() => {
                let creds = Self::from_sfdx_auth_url(auth_url.trim()).await?;
                match std::env::var(format!("{prefix}_API_VERSION")) {
                    Ok(version) => Ok(creds.with_api_version(version)),
                    Err(_) => Ok(creds),
                }
            }
            _ => Self::from_env_prefixed(prefix),
        }
    }
}

impl Credentials for OrgCredentials {
    fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }
}

fn required_var(prefix: &str, name: &str) -> Result<String> {
    let key = format!("{prefix}_{name}");
    match std::env::var(&key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::new(ErrorKind::MissingOrgVar(key))),
    }
}

#[derive(Debug, PartialEq, Eq)]
struct AuthUrl<'a> {
    client_id: &'a str,
    client_secret: Option<&'a str>,
    refresh_token: &'a str,
    instance_url: &'a str,
}

impl<'a> AuthUrl<'a> {
    fn parse(auth_url: &'a str) -> Result<Self> {
        let rest = auth_url.strip_prefix("force://").ok_or_else(|| {
            Error::new(ErrorKind::InvalidAuthUrl(
                "Auth URL must start with force://".to_string(),
            ))
        })?;

        let (credentials, instance_url) = rest.split_once('@').ok_or_else(|| {
            Error::new(ErrorKind::InvalidAuthUrl(
                "Invalid auth URL format: missing @".to_string(),
            ))
        })?;

        // Username (4th field) is accepted and ignored.
        let parts: Vec<&str> = credentials.splitn(4, ':').collect();
        if parts.len() < 3 || parts[0].is_empty() || parts[2].is_empty() {
            return Err(Error::new(ErrorKind::InvalidAuthUrl(
                "Invalid auth URL format: expected client_id:client_secret:refresh_token[:username]"
                    .to_string(),
            )));
        }

        Ok(Self {
            client_id: parts[0],
            client_secret: Some(parts[1]).filter(|s| !s.is_empty()),
            refresh_token: parts[2],
            instance_url,
        })
    }
}

/// Token endpoint host for an instance URL. Local hosts are used as-is.
fn login_url_for(instance_url: &str) -> &str {
    if instance_url.contains("localhost") || instance_url.contains("127.0.0.1") {
        instance_url
    } else if instance_url.contains("test.salesforce.com")
        || instance_url.contains("sandbox")
        || instance_url.contains(".scratch.")
    {
        SANDBOX_LOGIN_URL
    } else {
        PRODUCTION_LOGIN_URL
    }
}
