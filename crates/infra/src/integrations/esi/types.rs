//! ESI wire types for the character calendar endpoints.

use chrono::{DateTime, Utc};
use opcal_domain::{EventDetail, EventSummary};
use serde::Deserialize;

/// Element of `GET /characters/{character_id}/calendar/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSummaryDto {
    pub event_id: i64,
    pub event_date: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub importance: i64,
    #[serde(default)]
    pub event_response: Option<String>,
}

impl From<CalendarSummaryDto> for EventSummary {
    fn from(dto: CalendarSummaryDto) -> Self {
        Self {
            event_id: dto.event_id,
            event_date: dto.event_date,
            title: dto.title,
            importance: dto.importance,
            response: dto.event_response,
        }
    }
}

/// Body of `GET /characters/{character_id}/calendar/{event_id}/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEventDto {
    pub event_id: i64,
    #[serde(default)]
    pub text: String,
    pub owner_id: i64,
    pub owner_name: String,
    pub owner_type: String,
    #[serde(default)]
    pub importance: i64,
    /// Minutes.
    pub duration: i64,
}

impl From<CalendarEventDto> for EventDetail {
    fn from(dto: CalendarEventDto) -> Self {
        Self {
            event_id: dto.event_id,
            text: dto.text,
            owner_id: dto.owner_id,
            owner_type: dto.owner_type,
            owner_name: dto.owner_name,
            importance: dto.importance,
            duration_minutes: dto.duration,
        }
    }
}

/// SSO token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Seconds until `access_token` expires.
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}
