//! Cron scheduling of owner synchronization
//!
//! The scheduler follows the runtime rules used across this crate:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on all async operations

pub mod error;
pub mod owner_sync_scheduler;

pub use error::{SchedulerError, SchedulerPhase, SchedulerResult};
pub use owner_sync_scheduler::{
    sync_active_owners, OwnerSyncScheduler, OwnerSyncSchedulerConfig, SyncBatchSummary,
};
