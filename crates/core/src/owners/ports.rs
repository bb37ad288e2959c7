//! Port interfaces for owner storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcal_domain::{Owner, OwnerErrorState, OwnerId, OwnerRegistration, Result};

#[async_trait]
pub trait OwnerRepository: Send + Sync {
    async fn get(&self, id: OwnerId) -> Result<Option<Owner>>;

    async fn list(&self) -> Result<Vec<Owner>>;

    async fn list_active(&self) -> Result<Vec<Owner>>;

    /// Create the owner, or re-authorize the existing one. Corporate owners
    /// are keyed by corporation, personal owners by character. The stored
    /// owner is (re)activated.
    async fn upsert(&self, registration: &OwnerRegistration) -> Result<Owner>;

    /// Fails with `NotFound` for unknown owners.
    async fn set_active(&self, id: OwnerId, active: bool) -> Result<()>;

    async fn record_sync_outcome(
        &self,
        id: OwnerId,
        state: OwnerErrorState,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Hard delete; cascades to the owner's imported events.
    async fn delete(&self, id: OwnerId) -> Result<()>;
}
