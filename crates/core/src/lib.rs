//! # OpCal Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for storage, credentials and the remote
//!   calendar feed
//! - The credential resolver and the owner reconciliation engine
//! - Visibility filtering of calendar entries
//! - Calendar and owner services
//!
//! ## Architecture Principles
//! - Only depends on `opcal-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod calendar;
pub mod credentials;
pub mod feed;
pub mod owners;
pub mod reconciliation;
pub mod user;
pub mod visibility;

// Re-export specific items to avoid ambiguity
pub use calendar::ports::{LocalEventRepository, NotificationSender, VisibilityFilterRepository};
pub use calendar::{CalendarService, EventView, MonthView};
pub use credentials::ports::{CredentialStore, CredentialStoreError};
pub use credentials::CredentialResolver;
pub use feed::ports::{FeedError, RemoteCalendarFeed};
pub use owners::ports::OwnerRepository;
pub use owners::OwnerService;
pub use reconciliation::ports::ImportedEventRepository;
pub use reconciliation::{OwnerSyncGuard, ReconciliationEngine, SyncReport, SyncStage};
pub use user::ports::UserDirectory;
