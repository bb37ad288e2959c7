//! Credential lookup for owner syncs

pub mod ports;
pub mod resolver;

pub use resolver::CredentialResolver;
