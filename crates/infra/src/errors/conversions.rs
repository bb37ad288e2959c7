//! Conversions from external infrastructure errors into domain errors.

use opcal_common::storage::StorageError;
use opcal_domain::OpCalError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub OpCalError);

impl From<InfraError> for OpCalError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<OpCalError> for InfraError {
    fn from(value: OpCalError) -> Self {
        InfraError(value)
    }
}

trait IntoOpCalError {
    fn into_opcal(self) -> OpCalError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → OpCalError */
/* -------------------------------------------------------------------------- */

impl IntoOpCalError for SqlError {
    fn into_opcal(self) -> OpCalError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => OpCalError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        OpCalError::Database("database is locked".into())
                    }
                    // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        OpCalError::Conflict(format!("unique constraint violation: {message}"))
                    }
                    // SQLITE_CONSTRAINT_FOREIGNKEY
                    (ErrorCode::ConstraintViolation, 787) => OpCalError::InvalidInput(format!(
                        "foreign key constraint violation: {message}"
                    )),
                    (ErrorCode::NotADatabase, _) => OpCalError::Database(
                        "SQLCipher key rejected or database not encrypted".into(),
                    ),
                    _ => OpCalError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => OpCalError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                OpCalError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                OpCalError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => OpCalError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidQuery => OpCalError::Database("invalid SQL query".into()),
            other => OpCalError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_opcal())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → OpCalError */
/* -------------------------------------------------------------------------- */

impl IntoOpCalError for StorageError {
    fn into_opcal(self) -> OpCalError {
        match self {
            StorageError::Rusqlite(err) => err.into_opcal(),
            StorageError::InvalidConfig(message) => OpCalError::Config(message),
            other => OpCalError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_opcal())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → OpCalError */
/* -------------------------------------------------------------------------- */

impl IntoOpCalError for HttpError {
    fn into_opcal(self) -> OpCalError {
        if self.is_timeout() {
            return OpCalError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return OpCalError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => OpCalError::Auth(message),
                404 => OpCalError::NotFound(message),
                429 => OpCalError::Network(message),
                400..=499 => OpCalError::InvalidInput(message),
                _ => OpCalError::Network(message),
            };
        }

        if self.is_decode() {
            return OpCalError::Internal(format!("malformed HTTP response body: {self}"));
        }

        OpCalError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_opcal())
    }
}

/// Shorthand used by the repositories: `.map_err(map_sql_error)`.
pub(crate) fn map_sql_error(err: SqlError) -> OpCalError {
    OpCalError::from(InfraError::from(err))
}

pub(crate) fn map_storage_error(err: StorageError) -> OpCalError {
    OpCalError::from(InfraError::from(err))
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
