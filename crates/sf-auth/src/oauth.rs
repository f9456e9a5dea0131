//! OAuth 2.0 refresh-token exchange.

use serde::Deserialize;
use tracing::instrument;

use crate::error::{Error, ErrorKind, Result};

/// Token endpoint client for one connected app.
#[derive(Clone)]
pub struct OAuthClient {
    client_id: String,
    client_secret: Option<String>,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Exchange a refresh token for a fresh access token.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_token(&self, refresh_token: &str, login_url: &str) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(ref secret) = self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http_client
            .post(format!(
                "{}/services/oauth2/token",
                login_url.trim_end_matches('/')
            ))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(serde_urlencoded::to_string(params)?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<OAuthErrorResponse>(&body) {
                Ok(err) => Error::new(ErrorKind::OAuth {
                    error: err.error,
                    description: err.error_description,
                }),
                Err(_) => Error::new(ErrorKind::Http(format!(
                    "token endpoint returned {status}"
                ))),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Successful token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub instance_url: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_refresh_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_secret=shh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "00Dxx!fresh",
                "instance_url": "https://org-a.my.salesforce.com",
                "issued_at": "1700000000000"
            })))
            .mount(&server)
            .await;

        let token = OAuthClient::new("PlatformCLI")
            .with_secret("shh")
            .refresh_token("5Aep-refresh", &server.uri())
            .await
            .unwrap();

        assert_eq!(token.access_token, "00Dxx!fresh");
        assert_eq!(token.instance_url, "https://org-a.my.salesforce.com");
        assert!(!format!("{token:?}").contains("fresh"));
    }

    #[tokio::test]
    async fn test_refresh_token_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "expired access/refresh token"
            })))
            .mount(&server)
            .await;

        let err = OAuthClient::new("PlatformCLI")
            .refresh_token("stale", &server.uri())
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::OAuth { ref error, .. } if error == "invalid_grant"));
    }
}
