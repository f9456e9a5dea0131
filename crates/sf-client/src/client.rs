//! Retrying HTTP client used for every org call.

use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{is_retryable_status, Error, ErrorKind, Result};
use crate::request::{RequestBuilder, RequestMethod};
use crate::response::Response;
use crate::retry::RetryPolicy;
use crate::API_USAGE_WARN_PERCENT;

/// HTTP client with retry, Retry-After handling and Salesforce error mapping.
#[derive(Debug, Clone)]
pub struct OrgHttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl OrgHttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.accept_compressed)
            .deflate(config.accept_compressed)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request, retrying transport failures, throttling and 5xx
    /// responses. A POST that timed out is not retried: the org may have
    /// committed it already.
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.log_url()))]
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let mut policy = self.config.retry.clone().map(RetryPolicy::new);

        loop {
            let err = match self.execute_once(&request).await {
                Ok(response) => return response.error_for_status().await,
                Err(err) => err,
            };

            let committed_maybe = request.method == RequestMethod::Post && err.is_timeout();
            if !err.is_retryable() || committed_maybe {
                return Err(err);
            }
            let Some(policy) = policy.as_mut() else {
                return Err(err);
            };

            match policy.next_delay(err.retry_after()) {
                Some(delay) => {
                    warn!(
                        attempt = policy.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Org request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(Error::with_source(
                        ErrorKind::RetriesExhausted {
                            attempts: policy.attempt(),
                            last_error: err.to_string(),
                        },
                        err,
                    ));
                }
            }
        }
    }

    /// One attempt. Throttling and retryable statuses come back as errors so
    /// the caller's retry loop sees them.
    async fn execute_once(&self, request: &RequestBuilder) -> Result<Response> {
        let mut req = self
            .inner
            .request(request.method.to_reqwest(), request.full_url()?);

        if let Some(ref token) = request.bearer_token {
            req = req.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        if self.config.enable_tracing {
            debug!("Sending request");
        }

        let response = Response::new(req.send().await?);
        let status = response.status();

        if self.config.enable_tracing {
            debug!(status, "Response received");
        }

        if let Some(usage) = response.api_usage() {
            if usage.percentage() >= API_USAGE_WARN_PERCENT {
                warn!(
                    used = usage.used,
                    limit = usage.limit,
                    "Org API usage is close to the daily limit"
                );
            }
        }

        if status == 429 {
            return Err(Error::new(ErrorKind::RateLimited {
                retry_after: response.retry_after(),
            }));
        }
        if is_retryable_status(status) {
            return Err(Error::new(ErrorKind::Http {
                status,
                message: format!("Server error: {}", status),
            }));
        }

        Ok(response)
    }

    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T> {
        self.execute(request).await?.json().await
    }
}
