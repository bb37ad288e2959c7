//! Storage primitives for encrypted databases
//!
//! SQLCipher-backed connection pooling shared by the repositories in
//! `opcal-infra`. Schemas and migrations belong to the caller.

pub mod error;
pub mod sqlcipher;

pub use error::{StorageError, StorageResult};
pub use sqlcipher::{
    apply_connection_pragmas, PoolHealth, SqlCipherConnection, SqlCipherPool,
    SqlCipherPoolConfig, SqlCipherStatement,
};
