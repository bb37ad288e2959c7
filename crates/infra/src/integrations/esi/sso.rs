//! Refresh-token grant against the EVE SSO token endpoint.

use std::time::Duration;

use opcal_domain::{OpCalError, RemoteConfig};
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::types::TokenResponse;
use crate::http::HttpClient;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SsoError {
    /// The SSO refused the refresh token. It will not work again.
    #[error("refresh token rejected: {0}")]
    Rejected(String),

    #[error("SSO unavailable: {0}")]
    Unavailable(String),

    #[error("malformed SSO response: {0}")]
    Malformed(String),
}

#[derive(Clone)]
pub struct SsoTokenRefresher {
    http: HttpClient,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
}

impl std::fmt::Debug for SsoTokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoTokenRefresher")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SsoTokenRefresher {
    pub fn new(
        http: HttpClient,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.filter(|secret| !secret.is_empty()),
        }
    }

    /// `None` when no SSO application is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, OpCalError> {
        if config.client_id.is_empty() {
            return Ok(None);
        }
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Some(Self::new(
            http,
            config.sso_token_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        )))
    }

    /// Exchange `refresh_token` for a fresh access token.
    #[instrument(skip_all, fields(token_url = %self.token_url))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SsoError> {
        let mut form = vec![("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        let mut request = self.http.request(Method::POST, &self.token_url);
        match &self.client_secret {
            Some(secret) => request = request.basic_auth(&self.client_id, Some(secret)),
            None => form.push(("client_id", self.client_id.as_str())),
        }
        let request = request.form(&form);

        let response = self
            .http
            .send(request)
            .await
            .map_err(|err| SsoError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("{status}: {}", body.trim());
            warn!(status = status.as_u16(), "token refresh failed");
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => SsoError::Rejected(message),
                _ => SsoError::Unavailable(message),
            });
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|err| SsoError::Malformed(err.to_string()))?;
        debug!(expires_in = token.expires_in, rotated = token.refresh_token.is_some(), "token refreshed");
        Ok(token)
    }
}
