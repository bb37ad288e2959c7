//! Application-level implementations of core ports.

pub mod notifications;

pub use notifications::LoggingNotificationSender;
