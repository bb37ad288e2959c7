//! Single-flight guard: at most one sync per owner at a time.
//!
//! Syncs of different owners never contend.

use std::sync::Arc;

use dashmap::DashSet;
use opcal_domain::OwnerId;

#[derive(Debug, Clone, Default)]
pub struct OwnerSyncGuard {
    in_flight: Arc<DashSet<OwnerId>>,
}

impl OwnerSyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the owner, or returns `None` while another sync holds it.
    pub fn try_acquire(&self, owner_id: OwnerId) -> Option<OwnerSyncPermit> {
        self.in_flight
            .insert(owner_id)
            .then(|| OwnerSyncPermit { owner_id, in_flight: Arc::clone(&self.in_flight) })
    }

    pub fn is_running(&self, owner_id: OwnerId) -> bool {
        self.in_flight.contains(&owner_id)
    }
}

/// Releases the owner when dropped.
#[derive(Debug)]
pub struct OwnerSyncPermit {
    owner_id: OwnerId,
    in_flight: Arc<DashSet<OwnerId>>,
}

impl OwnerSyncPermit {
    pub const fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Drop for OwnerSyncPermit {
    fn drop(&mut self) {
        self.in_flight.remove(&self.owner_id);
    }
}
