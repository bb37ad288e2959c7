//! # OpCal Domain
//!
//! Business domain types and models for OpCal.
//!
//! This crate contains:
//! - Calendar data types (owners, imported events, local events, filters)
//! - The owner sync outcome enumeration ([`OwnerErrorState`])
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other OpCal crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
