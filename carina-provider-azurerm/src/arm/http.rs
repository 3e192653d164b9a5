//! HTTP implementation of `ManagementClient`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};

use super::{ArmError, ArmResponse, ManagementClient, TokenCredential};

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

struct RawResponse {
    status: u16,
    headers: HeaderMap,
    body: String,
}

/// Talks to Azure Resource Manager over HTTPS
pub struct HttpManagementClient {
    http: Client,
    endpoint: String,
    credential: TokenCredential,
    max_retries: u32,
    retry_delay: Duration,
    poll_interval: Duration,
    max_polls: u32,
}

impl HttpManagementClient {
    pub fn new(endpoint: impl Into<String>, credential: TokenCredential) -> Result<Self, ArmError> {
        let http = Client::builder()
            .user_agent(concat!("carina-provider-azurerm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArmError::Transport(format!("creating HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credential,
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(10),
            max_polls: 360,
        })
    }

    /// Retries after throttling (429) or server errors (5xx)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay for retries when the API sends no `Retry-After`
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, id: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, id, api_version)
    }

    /// Send one request, retrying throttled and failed attempts
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<RawResponse, ArmError> {
        let mut attempt = 0;
        loop {
            let token = self.credential.token().await?;
            let mut request = self.http.request(method.clone(), url).bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }

            log::debug!("{} {}", method, url);
            let response = request
                .send()
                .await
                .map_err(|e| ArmError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body_text = response
                .text()
                .await
                .map_err(|e| ArmError::Transport(format!("reading response body: {}", e)))?;

            if is_retryable(status) && attempt < self.max_retries {
                let delay = retry_after(&headers)
                    .unwrap_or_else(|| self.retry_delay.saturating_mul(2u32.saturating_pow(attempt)));
                attempt += 1;
                log::warn!(
                    "{} {} returned {}, retrying in {:?} (attempt {}/{})",
                    method,
                    url,
                    status,
                    delay,
                    attempt,
                    self.max_retries
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !(200..300).contains(&status) {
                log::debug!("{} {} failed: {} - {}", method, url, status, truncate(&body_text));
            }

            return Ok(RawResponse {
                status,
                headers,
                body: body_text,
            });
        }
    }

    async fn execute(
        &self,
        method: Method,
        id: &str,
        api_version: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ArmResponse, ArmError> {
        let url = self.url(id, api_version);
        let raw = self.send(method.clone(), &url, body).await?;

        if !(200..300).contains(&raw.status) {
            return Err(ArmError::from_response(raw.status, &raw.body));
        }

        if matches!(raw.status, 201 | 202) {
            let polled = if let Some(operation) = header(&raw.headers, "azure-asyncoperation") {
                self.wait_for_async_operation(&operation).await?;
                true
            } else if let Some(location) = header(&raw.headers, "location")
                && raw.status == 202
            {
                self.wait_for_location(&location).await?;
                true
            } else {
                false
            };

            if polled {
                // The operation response carries no resource, read it again
                return if method == Method::DELETE {
                    Ok(ArmResponse::new(200, None))
                } else {
                    self.execute_get(id, api_version).await
                };
            }
        }

        Ok(ArmResponse::new(raw.status, parse_body(&raw.body)?))
    }

    async fn execute_get(&self, id: &str, api_version: &str) -> Result<ArmResponse, ArmError> {
        let url = self.url(id, api_version);
        let raw = self.send(Method::GET, &url, None).await?;
        if !(200..300).contains(&raw.status) {
            return Err(ArmError::from_response(raw.status, &raw.body));
        }
        Ok(ArmResponse::new(raw.status, parse_body(&raw.body)?))
    }

    /// Poll an `Azure-AsyncOperation` URL until the operation reaches a terminal status
    async fn wait_for_async_operation(&self, url: &str) -> Result<(), ArmError> {
        for _ in 0..self.max_polls {
            let raw = self.send(Method::GET, url, None).await?;
            if !(200..300).contains(&raw.status) {
                return Err(ArmError::from_response(raw.status, &raw.body));
            }

            let body = parse_body(&raw.body)?.unwrap_or_default();
            let status = body
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("InProgress")
                .to_string();

            if status.eq_ignore_ascii_case("Succeeded") {
                return Ok(());
            }
            if status.eq_ignore_ascii_case("Failed") || status.eq_ignore_ascii_case("Canceled") {
                let message = body
                    .pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("no error details returned")
                    .to_string();
                return Err(ArmError::OperationFailed { status, message });
            }

            log::debug!("operation {} is {}", url, status);
            tokio::time::sleep(retry_after(&raw.headers).unwrap_or(self.poll_interval)).await;
        }

        Err(ArmError::Timeout(format!("waiting for operation {}", url)))
    }

    /// Poll a `Location` URL until it stops answering 202
    async fn wait_for_location(&self, url: &str) -> Result<(), ArmError> {
        for _ in 0..self.max_polls {
            let raw = self.send(Method::GET, url, None).await?;
            match raw.status {
                202 => {
                    tokio::time::sleep(retry_after(&raw.headers).unwrap_or(self.poll_interval))
                        .await;
                }
                200..=299 => return Ok(()),
                status => return Err(ArmError::from_response(status, &raw.body)),
            }
        }

        Err(ArmError::Timeout(format!("waiting for operation {}", url)))
    }
}

#[async_trait]
impl ManagementClient for HttpManagementClient {
    async fn get(&self, id: &str, api_version: &str) -> Result<ArmResponse, ArmError> {
        self.execute(Method::GET, id, api_version, None).await
    }

    async fn put(
        &self,
        id: &str,
        api_version: &str,
        body: &serde_json::Value,
    ) -> Result<ArmResponse, ArmError> {
        self.execute(Method::PUT, id, api_version, Some(body)).await
    }

    async fn patch(
        &self,
        id: &str,
        api_version: &str,
        body: &serde_json::Value,
    ) -> Result<ArmResponse, ArmError> {
        self.execute(Method::PATCH, id, api_version, Some(body)).await
    }

    async fn delete(&self, id: &str, api_version: &str) -> Result<ArmResponse, ArmError> {
        self.execute(Method::DELETE, id, api_version, None).await
    }
}

fn is_retryable(status: u16) -> bool {
    status == 429 || matches!(status, 500 | 502 | 503 | 504)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `Retry-After` in seconds
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header(headers, "retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn parse_body(body: &str) -> Result<Option<serde_json::Value>, ArmError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| ArmError::Decode(e.to_string()))
}

fn truncate(body: &str) -> String {
    if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(429));
        assert!(is_retryable(503));
        assert!(!is_retryable(404));
        assert!(!is_retryable(501));
    }

    #[test]
    fn retry_after_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert("Retry-After", HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
        headers.insert("Retry-After", HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn url_joins_endpoint_and_id() {
        let client = HttpManagementClient::new(
            "https://management.azure.com/",
            TokenCredential::from_token("t"),
        )
        .unwrap();
        assert_eq!(
            client.url("/subscriptions/abc", "2023-07-01-preview"),
            "https://management.azure.com/subscriptions/abc?api-version=2023-07-01-preview"
        );
    }

    #[test]
    fn long_bodies_are_truncated_for_logs() {
        let body = "x".repeat(500);
        let shown = truncate(&body);
        assert!(shown.starts_with(&"x".repeat(200)));
        assert!(shown.ends_with("[truncated, 500 bytes total]"));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn empty_body_parses_to_none() {
        assert_eq!(parse_body("  ").unwrap(), None);
        assert!(parse_body("not json").is_err());
    }
}
