//! Database implementations

pub(crate) mod convert;
pub mod credential_store;
pub mod imported_event_repository;
pub mod local_event_repository;
pub mod manager;
pub mod owner_repository;
pub mod user_directory;
pub mod visibility_filter_repository;

pub use credential_store::SqliteCredentialStore;
pub use imported_event_repository::SqliteImportedEventRepository;
pub use local_event_repository::SqliteLocalEventRepository;
pub use manager::DbManager;
pub use owner_repository::SqliteOwnerRepository;
pub use user_directory::SqliteUserDirectory;
pub use visibility_filter_repository::SqliteVisibilityFilterRepository;
