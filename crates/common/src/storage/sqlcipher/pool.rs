//! SQLCipher connection pool

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
use super::config::SqlCipherPoolConfig;
use super::connection::SqlCipherConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{looks_like_wrong_key, StorageError, StorageResult};

/// Snapshot of the pool state returned by [`SqlCipherPool::health_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolHealth {
    pub healthy: bool,
    pub connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
    pub message: Option<String>,
}

/// Pool of encrypted SQLite connections.
///
/// Every connection gets the cipher key and pragmas applied when it is
/// opened. The key is verified once at construction.
#[derive(Debug)]
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlCipherPoolConfig,
}

impl SqlCipherPool {
    /// Open (or create) the database at `path` and build the pool.
    ///
    /// # Errors
    /// `WrongKeyOrNotEncrypted` when the file exists but cannot be decrypted
    /// with `encryption_key`; `Connection` for any other open failure.
    #[instrument(skip(encryption_key), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(
        path: &Path,
        encryption_key: String,
        config: SqlCipherPoolConfig,
    ) -> StorageResult<Self> {
        info!("Creating SQLCipher connection pool");

        let cipher_config = SqlCipherConfig::new(encryption_key);
        let pool_config = config.clone();

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            configure_sqlcipher(conn, &cipher_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| open_failure("Failed to create pool", &e))?;

        {
            let conn = pool.get().map_err(|e| open_failure("Failed to get test connection", &e))?;
            verify_encryption(&conn)?;
            debug!("Encryption verified successfully");
        }

        info!(max_size = config.max_size, "SQLCipher pool created");
        Ok(Self { pool, config })
    }

    /// Check out a connection, waiting at most the configured timeout.
    #[instrument(skip(self), fields(pool_size = self.config.max_size))]
    pub fn get_sqlcipher_connection(&self) -> StorageResult<SqlCipherConnection> {
        let start = std::time::Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                debug!(duration_ms = start.elapsed().as_millis() as u64, "Connection acquired");
                Ok(SqlCipherConnection::new(conn))
            }
            Err(e) if e.to_string().to_lowercase().contains("timed out") => {
                warn!(timeout = ?self.config.connection_timeout, "Connection timeout");
                Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
            }
            Err(e) => {
                warn!(error = %e, "Connection error");
                Err(StorageError::Connection(format!("Failed to get connection: {}", e)))
            }
        }
    }

    pub fn health_check(&self) -> PoolHealth {
        let state = self.pool.state();
        let message = self.pool.get().err().map(|e| format!("Pool unhealthy: {}", e));

        PoolHealth {
            healthy: message.is_none(),
            connections: state.connections,
            idle_connections: state.idle_connections,
            max_connections: self.config.max_size,
            message,
        }
    }

    pub fn max_size(&self) -> u32 {
        self.config.max_size
    }
}

fn open_failure(context: &str, err: &r2d2::Error) -> StorageError {
    warn!(error = %err, "{}", context);
    if looks_like_wrong_key(&err.to_string()) {
        StorageError::WrongKeyOrNotEncrypted
    } else {
        StorageError::Connection(format!("{}: {}", context, err))
    }
}
