//! HTTP plumbing shared by the REST adapters.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ProviderError, ProviderResult};

/// Builds a client with the adapter timeout.
pub(crate) fn build_client(timeout: Duration, user_agent: &str) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| {
            ProviderError::configuration(format!("failed to create HTTP client: {e}"))
                .with_source(e)
        })
}

/// Maps a transport failure.
pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("request failed: {e}")
    };
    ProviderError::network(message).with_source(e)
}

/// Turns a non-success status into the matching error.
pub(crate) async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(ProviderError::authentication(
            "access token expired or invalid",
        )),
        StatusCode::FORBIDDEN => Err(ProviderError::authorization("access denied to calendar")),
        StatusCode::NOT_FOUND => Err(ProviderError::not_found(format!(
            "{} not found",
            response.url().path()
        ))),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {s} seconds"))
                    .unwrap_or_default()
            )))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::server(format!("API error ({status}): {body}")))
        }
    }
}

/// Reads and decodes a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {e}")))
}

/// Reads a text body.
pub(crate) async fn read_text(response: Response) -> ProviderResult<String> {
    response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))
}
