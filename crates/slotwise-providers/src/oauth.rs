//! OAuth 2.0 refresh-token exchange shared by Google and Outlook.
//!
//! Integrations store a long-lived refresh token. Every API call first
//! trades it for a short-lived access token at the provider's token endpoint.

use reqwest::Client;
use serde::Deserialize;
use slotwise_core::{Credentials, ProviderKind};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{read_text, send_error};

/// Borrowed view of OAuth credentials.
#[derive(Debug, Clone, Copy)]
pub struct OAuthParts<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
    pub tenant: Option<&'a str>,
}

impl<'a> OAuthParts<'a> {
    /// Extracts the OAuth fields, rejecting any other credential shape.
    pub fn from_credentials(
        credentials: &'a Credentials,
        provider: ProviderKind,
    ) -> ProviderResult<Self> {
        credentials
            .check_shape(provider)
            .map_err(|e| ProviderError::invalid_credentials(e.to_string()))?;
        match credentials {
            Credentials::OAuth {
                client_id,
                client_secret,
                refresh_token,
                tenant,
            } => Ok(Self {
                client_id,
                client_secret,
                refresh_token,
                tenant: tenant.as_deref(),
            }),
            _ => Err(ProviderError::invalid_credentials(format!(
                "{provider} requires OAuth credentials"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchanges a refresh token for an access token.
///
/// A rejection by the token endpoint (any 4xx) means the stored credentials
/// are no good and is reported as `InvalidCredentials`.
pub async fn refresh_access_token(
    http: &Client,
    token_url: &str,
    parts: OAuthParts<'_>,
    scope: Option<&str>,
) -> ProviderResult<String> {
    let mut params = vec![
        ("client_id", parts.client_id),
        ("client_secret", parts.client_secret),
        ("refresh_token", parts.refresh_token),
        ("grant_type", "refresh_token"),
    ];
    if let Some(scope) = scope {
        params.push(("scope", scope));
    }

    let response = http
        .post(token_url)
        .form(&params)
        .send()
        .await
        .map_err(send_error)?;

    let status = response.status();
    let body = read_text(response).await?;

    if status.is_client_error() {
        return Err(ProviderError::invalid_credentials(format!(
            "token refresh rejected ({status}): {body}"
        )));
    }
    if !status.is_success() {
        return Err(ProviderError::server(format!(
            "token endpoint error ({status}): {body}"
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {e}")))?;

    debug!("refreshed access token");
    Ok(token.access_token)
}
