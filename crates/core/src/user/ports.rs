//! Port interfaces for the platform user directory
//!
//! The calendar does not own users, groups or account tiers; it asks the
//! surrounding platform through this trait.

use async_trait::async_trait;
use opcal_domain::{CharacterId, Permission, Result, UserId, Viewer};

/// Read access to platform users, their memberships and permissions.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether the user currently holds `permission`.
    async fn has_permission(&self, user_id: UserId, permission: Permission) -> Result<bool>;

    /// Load groups, account tier and permissions of a user.
    async fn load_viewer(&self, user_id: UserId) -> Result<Option<Viewer>>;

    /// User that owns the given character, if the character is known.
    async fn character_owner(&self, character_id: CharacterId) -> Result<Option<UserId>>;
}
