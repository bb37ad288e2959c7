//! Events mirrored from a remote in-game calendar

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::owner::OwnerId;

/// Entry of a remote calendar listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: i64,
    pub event_date: DateTime<Utc>,
    pub title: String,
    pub importance: i64,
    pub response: Option<String>,
}

/// Per-event detail record; only fetched for events not yet imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetail {
    pub event_id: i64,
    pub text: String,
    pub owner_id: i64,
    pub owner_type: String,
    pub owner_name: String,
    pub importance: i64,
    pub duration_minutes: i64,
}

/// Locally cached copy of a remote calendar entry.
///
/// Immutable once created: later syncs only keep or purge it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedEvent {
    pub event_id: i64,
    pub owner_id: OwnerId,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub title: String,
    pub text: String,
    pub owner_type: String,
    pub owner_name: String,
    pub importance: i64,
    pub duration_minutes: i64,
}

impl ImportedEvent {
    /// Builds the cached record from a listing entry and its detail.
    ///
    /// The remote service does not report an end time; it is derived as
    /// `start + duration`. An out-of-range duration leaves `end` empty.
    pub fn from_remote(owner_id: OwnerId, summary: &EventSummary, detail: &EventDetail) -> Self {
        let end = Duration::try_minutes(detail.duration_minutes)
            .and_then(|duration| summary.event_date.checked_add_signed(duration));

        Self {
            event_id: summary.event_id,
            owner_id,
            start: summary.event_date,
            end,
            title: summary.title.clone(),
            text: detail.text.clone(),
            owner_type: detail.owner_type.clone(),
            owner_name: detail.owner_name.clone(),
            importance: detail.importance,
            duration_minutes: detail.duration_minutes,
        }
    }
}
