//! Port interfaces for the remote calendar service
//!
//! Implementations perform no retries; the next scheduled sync is the retry.

use std::time::Duration;

use async_trait::async_trait;
use opcal_domain::{CharacterId, Credential, EventDetail, EventSummary, OwnerErrorState};
use thiserror::Error;

/// Classified failure of a remote calendar call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Transport failure or 5xx response.
    #[error("remote calendar unavailable: {0}")]
    Unavailable(String),

    #[error("remote calendar call timed out after {0:?}")]
    Timeout(Duration),

    /// The remote service rejected the credential (401).
    #[error("remote calendar rejected credential: {0}")]
    Unauthorized(String),

    /// The credential lacks access to the requested calendar (403).
    #[error("remote calendar denied access: {0}")]
    Forbidden(String),

    /// Anything that could not be classified, including malformed payloads.
    #[error("unexpected remote calendar failure: {0}")]
    Unexpected(String),
}

impl FeedError {
    /// Sync outcome reported for this failure.
    pub const fn error_state(&self) -> OwnerErrorState {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => OwnerErrorState::RemoteUnavailable,
            Self::Unauthorized(_) => OwnerErrorState::TokenInvalid,
            Self::Forbidden(_) => OwnerErrorState::InsufficientPermissions,
            Self::Unexpected(_) => OwnerErrorState::Unknown,
        }
    }
}

/// Read access to a character's in-game calendar.
#[async_trait]
pub trait RemoteCalendarFeed: Send + Sync {
    /// Upcoming calendar entries visible to the character.
    async fn list_events(
        &self,
        character_id: CharacterId,
        credential: &Credential,
    ) -> Result<Vec<EventSummary>, FeedError>;

    async fn get_event_detail(
        &self,
        character_id: CharacterId,
        event_id: i64,
        credential: &Credential,
    ) -> Result<EventDetail, FeedError>;
}
