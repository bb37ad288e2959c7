//! Mirroring of remote calendars into the local imported-event cache

pub mod engine;
pub mod guard;
pub mod ports;

pub use engine::{ReconciliationEngine, SyncReport, SyncStage};
pub use guard::{OwnerSyncGuard, OwnerSyncPermit};
