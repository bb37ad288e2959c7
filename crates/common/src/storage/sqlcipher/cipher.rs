//! SQLCipher key and cipher settings

use rusqlite::Connection;
use tracing::{debug, error};
use zeroize::Zeroizing;

use crate::storage::error::{looks_like_wrong_key, StorageError, StorageResult};

/// SQLCipher configuration
///
/// The key is wiped from memory when the config is dropped.
#[derive(Clone)]
pub struct SqlCipherConfig {
    key: Zeroizing<String>,

    /// Cipher compatibility version (default: 4 for SQLCipher 4.x)
    pub cipher_compatibility: i32,

    /// KDF iterations for key derivation (default: 256000)
    pub kdf_iter: i32,
}

impl std::fmt::Debug for SqlCipherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCipherConfig")
            .field("key", &"***")
            .field("cipher_compatibility", &self.cipher_compatibility)
            .field("kdf_iter", &self.kdf_iter)
            .finish()
    }
}

impl SqlCipherConfig {
    pub fn new(key: String) -> Self {
        Self { key: Zeroizing::new(key), cipher_compatibility: 4, kdf_iter: 256000 }
    }

    pub fn with_kdf_iter(mut self, iterations: i32) -> Self {
        self.kdf_iter = iterations;
        self
    }
}

/// Configure SQLCipher for a freshly opened connection.
///
/// `PRAGMA key` must be the first statement run on the connection.
pub fn configure_sqlcipher(conn: &Connection, config: &SqlCipherConfig) -> StorageResult<()> {
    let start = std::time::Instant::now();

    conn.pragma_update(None, "key", config.key.as_str()).map_err(|e| {
        error!(error = %e, "SQLCipher key setup failed");
        if looks_like_wrong_key(&e.to_string()) {
            StorageError::WrongKeyOrNotEncrypted
        } else {
            StorageError::Encryption(format!("Failed to set encryption key: {}", e))
        }
    })?;

    conn.pragma_update(None, "cipher_compatibility", config.cipher_compatibility).map_err(|e| {
        error!(error = %e, "Failed to set cipher_compatibility");
        StorageError::Encryption(format!("Failed to set cipher_compatibility: {}", e))
    })?;

    conn.pragma_update(None, "kdf_iter", config.kdf_iter).map_err(|e| {
        error!(error = %e, "Failed to set kdf_iter");
        StorageError::Encryption(format!("Failed to set kdf_iter: {}", e))
    })?;

    debug!(duration_ms = start.elapsed().as_millis(), "SQLCipher configuration successful");
    Ok(())
}

/// Force SQLCipher to decrypt the header and schema pages so a wrong key is
/// reported before the pool hands out connections.
pub fn verify_encryption(conn: &Connection) -> StorageResult<()> {
    let result = conn
        .query_row("PRAGMA user_version", [], |_| Ok::<(), rusqlite::Error>(()))
        .and_then(|_| conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(())))
        .map_err(|e| {
            if looks_like_wrong_key(&e.to_string()) {
                StorageError::WrongKeyOrNotEncrypted
            } else {
                StorageError::from(e)
            }
        });

    if let Err(e) = &result {
        error!(error = %e, "Encryption verification failed");
    }
    result
}
