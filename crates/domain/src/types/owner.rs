//! Calendar owners and their sync outcome
//!
//! An [`Owner`] is an account whose in-game calendar is mirrored locally. It
//! is either a corporation calendar (synced through one of its characters) or
//! a personal calendar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type OwnerId = i64;
pub type UserId = i64;
pub type CharacterId = i64;
pub type CorporationId = i64;

/// Corporation an owner syncs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corporation {
    pub corporation_id: CorporationId,
    pub corporation_name: String,
}

/// Character linked to an owner, together with the platform user that owns
/// the character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterBinding {
    pub character_id: CharacterId,
    pub character_name: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub corporation: Option<Corporation>,
    pub character: Option<CharacterBinding>,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_error: OwnerErrorState,
}

impl Owner {
    /// True when the owner mirrors a corporation calendar rather than a
    /// personal one.
    pub fn is_corporate(&self) -> bool {
        self.corporation.is_some()
    }

    /// Human readable label used in logs.
    pub fn label(&self) -> String {
        match (&self.corporation, &self.character) {
            (Some(corp), _) => corp.corporation_name.clone(),
            (None, Some(character)) => character.character_name.clone(),
            (None, None) => format!("owner #{}", self.id),
        }
    }
}

/// Input for creating or re-authorizing an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRegistration {
    pub corporation: Option<Corporation>,
    pub character: CharacterBinding,
}

/// Outcome of a sync or credential resolution for one owner.
///
/// Persisted on the owner as a stable integer code.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Error, Serialize, Deserialize,
)]
pub enum OwnerErrorState {
    #[default]
    #[error("No error")]
    None,
    #[error("Invalid token")]
    TokenInvalid,
    #[error("Expired token")]
    TokenExpired,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("No character set for fetching calendar data")]
    NoCharacter,
    #[error("Remote calendar service is currently unavailable")]
    RemoteUnavailable,
    #[error("Operation mode does not match the current setting")]
    OperationModeMismatch,
    #[error("Unknown error")]
    Unknown,
}

impl OwnerErrorState {
    pub const fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::TokenInvalid => 1,
            Self::TokenExpired => 2,
            Self::InsufficientPermissions => 3,
            Self::NoCharacter => 4,
            Self::RemoteUnavailable => 5,
            Self::OperationModeMismatch => 6,
            Self::Unknown => 99,
        }
    }

    /// Unrecognized codes map to [`OwnerErrorState::Unknown`].
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::None,
            1 => Self::TokenInvalid,
            2 => Self::TokenExpired,
            3 => Self::InsufficientPermissions,
            4 => Self::NoCharacter,
            5 => Self::RemoteUnavailable,
            6 => Self::OperationModeMismatch,
            _ => Self::Unknown,
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::None)
    }

    /// Stable snake_case label for structured logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TokenInvalid => "token_invalid",
            Self::TokenExpired => "token_expired",
            Self::InsufficientPermissions => "insufficient_permissions",
            Self::NoCharacter => "no_character",
            Self::RemoteUnavailable => "remote_unavailable",
            Self::OperationModeMismatch => "operation_mode_mismatch",
            Self::Unknown => "unknown",
        }
    }

    /// Credential problems are local to one owner and need operator action
    /// (re-authorization or a permission grant).
    pub const fn is_credential_problem(self) -> bool {
        matches!(
            self,
            Self::TokenInvalid
                | Self::TokenExpired
                | Self::InsufficientPermissions
                | Self::NoCharacter
        )
    }
}
