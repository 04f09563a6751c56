// src/llm/http_client.rs
// HTTP client with transient-failure retry, shared by the model providers

use anyhow::{Result, anyhow};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::warn;

/// Retries after the first attempt
const DEFAULT_MAX_RETRIES: u32 = 3;
/// First backoff; doubles on every retry
const DEFAULT_BASE_BACKOFF_MS: u64 = 1_000;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Whether an HTTP status is worth retrying (rate limits and server errors)
fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Shared reqwest client plus retry policy
pub struct LlmHttpClient {
    client: Client,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl LlmHttpClient {
    pub fn new(request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            request_timeout,
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
        }
    }

    /// POST `body` with Bearer auth and return the response body on success
    pub async fn post_bearer(
        &self,
        request_id: &str,
        url: &str,
        api_key: &str,
        body: String,
    ) -> Result<String> {
        self.execute_with_retry(request_id, body, |client, body| {
            client
                .post(url)
                .bearer_auth(api_key)
                .header("Content-Type", "application/json")
                .body(body)
        })
        .await
    }

    /// Execute a request built by `build_request`, retrying transient failures.
    ///
    /// The closure is called once per attempt so each attempt gets a fresh builder.
    /// Only connect/timeout errors and 429/5xx responses are retried; anything else
    /// may already have been processed by the server.
    pub async fn execute_with_retry<F>(
        &self,
        request_id: &str,
        body: String,
        build_request: F,
    ) -> Result<String>
    where
        F: Fn(&Client, String) -> reqwest::RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff = self.base_backoff;

        loop {
            match build_request(&self.client, body.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.text().await?);
                    }

                    let error_body = response.text().await.unwrap_or_default();
                    if retries < self.max_retries && is_transient(status) {
                        warn!(
                            request_id = %request_id,
                            status = %status,
                            "Transient model API error, retrying in {:?}",
                            backoff
                        );
                    } else {
                        return Err(anyhow!(
                            "API error {}: {}",
                            status,
                            crate::utils::truncate(&error_body, 500)
                        ));
                    }
                }
                Err(e) => {
                    if retries < self.max_retries && (e.is_connect() || e.is_timeout()) {
                        warn!(
                            request_id = %request_id,
                            error = %e,
                            "Model API unreachable, retrying in {:?}",
                            backoff
                        );
                    } else {
                        return Err(anyhow!("Request failed: {}", e));
                    }
                }
            }

            tokio::time::sleep(backoff).await;
            retries += 1;
            backoff *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let client = LlmHttpClient::new(Duration::from_secs(10));
        assert_eq!(client.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(client.base_backoff, Duration::from_millis(DEFAULT_BASE_BACKOFF_MS));
        assert_eq!(client.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient(StatusCode::UNAUTHORIZED));
        assert!(!is_transient(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_connection_refused_is_error_after_retries() {
        let mut client = LlmHttpClient::new(Duration::from_millis(500));
        client.max_retries = 1;
        client.base_backoff = Duration::from_millis(10);
        let result = client
            .post_bearer("test", "http://127.0.0.1:1", "key", "{}".into())
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Request failed"), "unexpected error: {}", err);
    }
}
