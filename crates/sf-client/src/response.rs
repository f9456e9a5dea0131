//! Response wrapper and Salesforce error-body mapping.

use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

/// Successful (or not-yet-checked) HTTP response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name)?.to_str().ok()
    }

    /// Retry-After header in seconds form.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// Daily API usage reported in `Sforce-Limit-Info`.
    pub fn api_usage(&self) -> Option<ApiUsage> {
        ApiUsage::parse(self.header("sforce-limit-info")?)
    }

    pub async fn text(self) -> Result<String> {
        self.inner.text().await.map_err(Into::into)
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.inner.bytes().await?;
        serde_json::from_slice(&body).map_err(Into::into)
    }

    /// Turn a non-2xx response into the matching error kind.
    pub(crate) async fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status();
        let body = self.text().await.unwrap_or_default();
        Err(parse_error_response(status, &body))
    }
}

/// API usage from the `Sforce-Limit-Info` header (`api-usage=25/15000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiUsage {
    pub used: u64,
    pub limit: u64,
}

impl ApiUsage {
    pub fn parse(header: &str) -> Option<Self> {
        let usage = header
            .split(',')
            .map(str::trim)
            .find_map(|part| part.strip_prefix("api-usage="))?;
        let (used, limit) = usage.split_once('/')?;
        Some(Self {
            used: used.trim().parse().ok()?,
            limit: limit.trim().parse().ok()?,
        })
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    pub fn percentage(&self) -> f64 {
        if self.limit == 0 {
            100.0
        } else {
            (self.used as f64 / self.limit as f64) * 100.0
        }
    }
}

fn parse_error_response(status: u16, body: &str) -> Error {
    if status == 429 {
        return Error::new(ErrorKind::RateLimited { retry_after: None });
    }

    // Salesforce answers with an array of errors, occasionally a single object.
    let first = serde_json::from_str::<Vec<SalesforceErrorBody>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next())
        .or_else(|| serde_json::from_str::<SalesforceErrorBody>(body).ok());

    if let Some(err) = first {
        return Error::new(ErrorKind::SalesforceApi {
            error_code: err.error_code,
            message: sanitize_error_message(&err.message),
            fields: err.fields.unwrap_or_default(),
        });
    }

    let message = sanitize_error_message(body);
    let kind = match status {
        401 => ErrorKind::Authentication(message),
        403 => ErrorKind::Authorization(message),
        404 => ErrorKind::NotFound(message),
        _ => ErrorKind::Http { status, message },
    };
    Error::new(kind)
}

static TOKEN_PATTERN: LazyLock<regex_lite::Regex> = LazyLock::new(|| {
    regex_lite::Regex::new(r"00[A-Za-z0-9]{13,}![A-Za-z0-9_.]+").expect("valid token pattern")
});

static SESSION_PATTERN: LazyLock<regex_lite::Regex> = LazyLock::new(|| {
    regex_lite::Regex::new(r"sid=[A-Za-z0-9]{20,}").expect("valid session pattern")
});

/// Redact access tokens and session ids, and cap the length.
fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let redacted = TOKEN_PATTERN.replace_all(message, "[REDACTED_TOKEN]");
    let mut sanitized = SESSION_PATTERN
        .replace_all(&redacted, "sid=[REDACTED]")
        .into_owned();

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }
    sanitized
}

#[derive(Debug, serde::Deserialize)]
struct SalesforceErrorBody {
    #[serde(alias = "errorCode")]
    error_code: String,
    message: String,
    fields: Option<Vec<String>>,
}
