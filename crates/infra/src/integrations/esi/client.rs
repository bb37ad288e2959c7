//! ESI character calendar client implementing [`RemoteCalendarFeed`].
//!
//! Every request is sent once with the owner's bearer token. Failures are
//! classified into [`FeedError`]:
//!
//! | outcome                         | error         |
//! |---------------------------------|---------------|
//! | 401                             | `Unauthorized`|
//! | 403                             | `Forbidden`   |
//! | 5xx, 420 / 429, connect failure | `Unavailable` |
//! | client timeout                  | `Timeout`     |
//! | other status, malformed body    | `Unexpected`  |

use std::time::Duration;

use async_trait::async_trait;
use opcal_core::{FeedError, RemoteCalendarFeed};
use opcal_domain::{
    CharacterId, Credential, EventDetail, EventSummary, OpCalError, RemoteConfig,
};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::types::{CalendarEventDto, CalendarSummaryDto};
use crate::http::HttpClient;

const DATASOURCE: &str = "tranquility";

pub struct EsiCalendarClient {
    http: HttpClient,
    base_url: Url,
    timeout: Duration,
}

impl EsiCalendarClient {
    pub fn new(http: HttpClient, base_url: &str, timeout: Duration) -> Result<Self, OpCalError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| OpCalError::Config(format!("invalid ESI base url '{base_url}': {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(OpCalError::Config(format!("ESI base url cannot be a base: {base_url}")));
        }
        Ok(Self { http, base_url, timeout })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, OpCalError> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Self::new(http, &config.base_url, timeout)
    }

    fn endpoint(&self, segments: &[String]) -> Result<Url, FeedError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FeedError::Unexpected(format!("invalid ESI base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        url.query_pairs_mut().append_pair("datasource", DATASOURCE);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        credential: &Credential,
    ) -> Result<T, FeedError> {
        let request = self.http.request(Method::GET, url.clone()).bearer_auth(&credential.access_token);
        let response = self.http.send(request).await.map_err(|err| self.classify_transport(&err))?;
        let response = check_status(response).await?;

        response.json::<T>().await.map_err(|err| {
            if err.is_timeout() {
                FeedError::Timeout(self.timeout)
            } else {
                FeedError::Unexpected(format!("malformed ESI response from {}: {err}", url.path()))
            }
        })
    }

    fn classify_transport(&self, err: &reqwest::Error) -> FeedError {
        if err.is_timeout() {
            FeedError::Timeout(self.timeout)
        } else if err.is_connect() || err.is_request() {
            FeedError::Unavailable(format!("ESI unreachable: {err}"))
        } else {
            FeedError::Unexpected(err.to_string())
        }
    }
}

async fn check_status(response: Response) -> Result<Response, FeedError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("ESI returned {status}: {}", body.trim());
    warn!(status = status.as_u16(), "ESI request failed");

    Err(match status {
        StatusCode::UNAUTHORIZED => FeedError::Unauthorized(message),
        StatusCode::FORBIDDEN => FeedError::Forbidden(message),
        StatusCode::TOO_MANY_REQUESTS => FeedError::Unavailable(message),
        // ESI error-limit response
        s if s.as_u16() == 420 => FeedError::Unavailable(message),
        s if s.is_server_error() => FeedError::Unavailable(message),
        _ => FeedError::Unexpected(message),
    })
}

#[async_trait]
impl RemoteCalendarFeed for EsiCalendarClient {
    #[instrument(skip(self, credential))]
    async fn list_events(
        &self,
        character_id: CharacterId,
        credential: &Credential,
    ) -> Result<Vec<EventSummary>, FeedError> {
        let url = self.endpoint(&["characters".into(), character_id.to_string(), "calendar".into()])?;
        let events: Vec<CalendarSummaryDto> = self.get_json(url, credential).await?;
        debug!(character_id, count = events.len(), "calendar listing fetched");
        Ok(events.into_iter().map(EventSummary::from).collect())
    }

    #[instrument(skip(self, credential))]
    async fn get_event_detail(
        &self,
        character_id: CharacterId,
        event_id: i64,
        credential: &Credential,
    ) -> Result<EventDetail, FeedError> {
        let url = self.endpoint(&[
            "characters".into(),
            character_id.to_string(),
            "calendar".into(),
            event_id.to_string(),
        ])?;
        let detail: CalendarEventDto = self.get_json(url, credential).await?;
        Ok(detail.into())
    }
}
