//! # OpCal Application
//!
//! Service layer wiring the workspace together.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Application-level port implementations
//! - Logging setup for the `opcal` binary
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod adapters;
pub mod context;
pub mod utils;

pub use context::AppContext;
