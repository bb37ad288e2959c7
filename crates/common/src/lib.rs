//! Shared infrastructure utilities for OpCal crates.
//!
//! # Feature Tiers
//!
//! - `platform`: encrypted SQLite storage (SQLCipher pool, pragmas, errors)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod storage;

#[cfg(feature = "platform")]
pub use storage::{
    PoolHealth, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig, StorageError,
    StorageResult,
};
