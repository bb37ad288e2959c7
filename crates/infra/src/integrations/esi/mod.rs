//! EVE Swagger Interface (ESI) adapters
//!
//! - [`EsiCalendarClient`]: the remote calendar feed
//! - [`SsoTokenRefresher`]: refresh-token grant against the SSO token endpoint

pub mod client;
pub mod sso;
pub mod types;

pub use client::EsiCalendarClient;
pub use sso::{SsoError, SsoTokenRefresher};
