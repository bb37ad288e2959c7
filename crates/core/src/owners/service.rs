//! Owner service - registration, activation and guarded syncs

use std::sync::Arc;

use chrono::Utc;
use opcal_domain::{
    OpCalError, Owner, OwnerId, OwnerRegistration, Permission, Result, Viewer,
};
use tracing::{info, instrument, warn};

use super::ports::OwnerRepository;
use crate::reconciliation::{OwnerSyncGuard, ReconciliationEngine, SyncReport};
use crate::user::ports::UserDirectory;

pub struct OwnerService {
    owners: Arc<dyn OwnerRepository>,
    directory: Arc<dyn UserDirectory>,
    engine: Arc<ReconciliationEngine>,
    guard: OwnerSyncGuard,
}

impl OwnerService {
    pub fn new(
        owners: Arc<dyn OwnerRepository>,
        directory: Arc<dyn UserDirectory>,
        engine: Arc<ReconciliationEngine>,
    ) -> Self {
        Self { owners, directory, engine, guard: OwnerSyncGuard::new() }
    }

    pub fn guard(&self) -> &OwnerSyncGuard {
        &self.guard
    }

    /// Register (or re-authorize) an in-game calendar.
    ///
    /// The requester needs the owner-registration permission and must own
    /// the character being linked. The caller is expected to trigger a first
    /// [`OwnerService::sync_owner`] afterwards.
    #[instrument(skip(self, requester, registration), fields(user_id = requester.user_id))]
    pub async fn register(
        &self,
        requester: &Viewer,
        registration: &OwnerRegistration,
    ) -> Result<Owner> {
        if !requester.has(Permission::AddIngameCalendarOwner) {
            return Err(OpCalError::PermissionDenied(
                Permission::AddIngameCalendarOwner.to_string(),
            ));
        }

        let character = &registration.character;
        let actual_owner = self.directory.character_owner(character.character_id).await?;
        if character.user_id != requester.user_id || actual_owner != Some(requester.user_id) {
            warn!(
                user_id = requester.user_id,
                character_id = character.character_id,
                "character does not belong to requesting user"
            );
            return Err(OpCalError::PermissionDenied(format!(
                "character {} does not belong to user {}",
                character.character_id, requester.user_id
            )));
        }

        let owner = self.owners.upsert(registration).await?;
        info!(
            owner_id = owner.id,
            owner = %owner.label(),
            character_id = character.character_id,
            "calendar owner registered"
        );
        Ok(owner)
    }

    /// Run one sync for the owner and record the outcome on it.
    ///
    /// A second call for the same owner while one is in flight fails with
    /// `Conflict` instead of overlapping.
    #[instrument(skip(self))]
    pub async fn sync_owner(&self, owner_id: OwnerId) -> Result<SyncReport> {
        let Some(_permit) = self.guard.try_acquire(owner_id) else {
            return Err(OpCalError::Conflict(format!("sync already running for owner {owner_id}")));
        };

        let owner = self
            .owners
            .get(owner_id)
            .await?
            .ok_or_else(|| OpCalError::NotFound(format!("owner {owner_id}")))?;

        let report = self.engine.sync_with_report(&owner).await;

        if owner.is_active {
            self.owners.record_sync_outcome(owner.id, report.state, Utc::now()).await?;
        }

        Ok(report)
    }

    pub async fn set_active(&self, owner_id: OwnerId, active: bool) -> Result<()> {
        self.owners.set_active(owner_id, active).await?;
        info!(owner_id, active, "owner activation changed");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Owner>> {
        self.owners.list().await
    }

    pub async fn list_active(&self) -> Result<Vec<Owner>> {
        self.owners.list_active().await
    }

    /// Delete the owner together with its imported events.
    pub async fn remove(&self, owner_id: OwnerId) -> Result<()> {
        let Some(_permit) = self.guard.try_acquire(owner_id) else {
            return Err(OpCalError::Conflict(format!("sync running for owner {owner_id}")));
        };
        self.owners.delete(owner_id).await?;
        info!(owner_id, "owner removed");
        Ok(())
    }
}
