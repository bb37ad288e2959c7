//! # OpCal Infrastructure
//!
//! Adapters implementing the `opcal-core` ports:
//! - SQLCipher-backed repositories, user directory and credential store
//! - ESI calendar feed client and SSO token refresh
//! - Cron scheduler fanning reconciliation out across owners
//! - Configuration loading and error conversions

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod scheduling;

pub use config::{load as load_config, load_from_file};
pub use database::{
    DbManager, SqliteCredentialStore, SqliteImportedEventRepository, SqliteLocalEventRepository,
    SqliteOwnerRepository, SqliteUserDirectory, SqliteVisibilityFilterRepository,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::esi::{EsiCalendarClient, SsoTokenRefresher};
pub use scheduling::{OwnerSyncScheduler, OwnerSyncSchedulerConfig, SchedulerError};
