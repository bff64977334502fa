//! Shared HTTP plumbing for the external service adapters

use crate::config::ServicesConfig;
use crate::{Result, RoadcastError};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Build a client with timeout, user agent and transient-failure retries.
///
/// `max_retries = 0` disables retrying.
pub fn build_client(services: &ServicesConfig, max_retries: u32) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(services.timeout())
        .user_agent(services.user_agent.as_str())
        .build()
        .map_err(|e| RoadcastError::config(format!("Failed to create HTTP client: {e}")))?;

    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(200), Duration::from_secs(5))
        .build_with_max_retries(max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// GET `url` and decode a JSON body. Errors are returned as plain messages for
/// the caller to wrap in its own error kind.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &ClientWithMiddleware,
    url: &str,
) -> std::result::Result<T, String> {
    let start = Instant::now();
    debug!("GET {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!(
            "request failed with status: {} - {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        ));
    }

    let body = response
        .json::<T>()
        .await
        .map_err(|e| format!("invalid response body: {e}"))?;

    let elapsed = start.elapsed();
    if elapsed.as_secs() > 5 {
        warn!("Slow response from {}: {:.3}s", url, elapsed.as_secs_f64());
    }
    Ok(body)
}
