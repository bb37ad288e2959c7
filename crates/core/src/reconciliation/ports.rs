//! Port interfaces for imported-event storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcal_domain::{ImportedEvent, OwnerId, Result};

/// Storage of events mirrored from remote calendars.
///
/// Writes issued during one sync must be visible to the next sync of the same
/// owner. No cross-owner isolation is required.
#[async_trait]
pub trait ImportedEventRepository: Send + Sync {
    /// Remote ids currently cached for the owner.
    async fn list_event_ids(&self, owner_id: OwnerId) -> Result<Vec<i64>>;

    /// Store a newly observed event. Storing an id that is already cached for
    /// the same owner is a no-op.
    async fn create(&self, event: &ImportedEvent) -> Result<()>;

    /// Delete the owner's cached events with the given ids; returns the
    /// number of rows removed.
    async fn delete_many(&self, owner_id: OwnerId, event_ids: &[i64]) -> Result<usize>;

    async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<ImportedEvent>>;

    /// Events of every owner starting in `[from, to)`, ordered by start.
    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ImportedEvent>>;

    async fn find_by_event_id(&self, event_id: i64) -> Result<Option<ImportedEvent>>;
}
