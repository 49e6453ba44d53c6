//! HTTPS-only HTTP client shared by the distributor integrations.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;

use super::SupplierError;

pub const USER_AGENT: &str = "OnyxPartsManager/1.0";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 1000;

pub struct SecureClient {
    client: Client,
    max_retries: u32,
    initial_delay_ms: u64,
}

impl SecureClient {
    /// Build the HTTPS-only client. A builder failure is an error rather than
    /// a fallback to an unrestricted default client.
    pub fn new(timeout: Duration) -> Result<Self, SupplierError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .https_only(true)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                SupplierError::Transport(e)
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            initial_delay_ms: INITIAL_RETRY_DELAY_MS,
        })
    }

    pub fn with_retries(mut self, max_retries: u32, initial_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_delay_ms = initial_delay_ms;
        self
    }

    pub fn ensure_https(url: &str) -> Result<(), SupplierError> {
        if !url.starts_with("https://") {
            tracing::warn!("Non-HTTPS URL requested: {}", url);
            return Err(SupplierError::InsecureUrl(url.to_string()));
        }
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<T, SupplierError> {
        Self::ensure_https(url)?;
        let response = self
            .send_with_retry(|| {
                headers
                    .iter()
                    .fold(self.client.get(url).query(query), |req, (k, v)| req.header(*k, *v))
            })
            .await?;
        Self::decode(response).await
    }

    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, SupplierError> {
        Self::ensure_https(url)?;
        let response = self
            .send_with_retry(|| self.client.post(url).query(query).json(body))
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SupplierError> {
        response
            .json::<T>()
            .await
            .map_err(|e| SupplierError::Parse(format!("Failed to parse JSON: {}", e)))
    }

    /// Send, retrying transport failures, 429 and 5xx with exponential backoff.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response, SupplierError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retry_count = 0;
        let mut delay_ms = self.initial_delay_ms;

        loop {
            match build().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|h| h.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .map(Duration::from_secs)
                            .unwrap_or(Duration::from_millis(delay_ms));

                        if retry_count < self.max_retries {
                            retry_count += 1;
                            tracing::warn!(
                                "Rate limited. Retrying after {:?} (attempt {}/{})",
                                retry_after,
                                retry_count,
                                self.max_retries
                            );
                            sleep(retry_after).await;
                            delay_ms *= 2;
                            continue;
                        }
                        return Err(SupplierError::RateLimited { retry_after });
                    }

                    if status.is_server_error() && retry_count < self.max_retries {
                        retry_count += 1;
                        tracing::warn!(
                            "Server error {}. Retrying in {}ms (attempt {}/{})",
                            status,
                            delay_ms,
                            retry_count,
                            self.max_retries
                        );
                        sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms *= 2;
                        continue;
                    }

                    let message = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(SupplierError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    if retry_count < self.max_retries {
                        retry_count += 1;
                        tracing::warn!(
                            "Request failed: {}. Retrying in {}ms (attempt {}/{})",
                            e,
                            delay_ms,
                            retry_count,
                            self.max_retries
                        );
                        sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms *= 2;
                        continue;
                    }
                    tracing::error!("Request failed: {}", e);
                    return Err(SupplierError::Transport(e));
                }
            }
        }
    }
}
