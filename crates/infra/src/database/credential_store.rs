//! SQLCipher-backed `CredentialStore` over the `esi_tokens` table.
//!
//! Scopes are stored space separated, as the SSO grants them. Refreshing
//! goes through the [`SsoTokenRefresher`] when one is configured; a token the
//! SSO rejects is flagged `is_valid = 0` and never returned again.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use opcal_core::{CredentialStore, CredentialStoreError};
use opcal_domain::{CharacterId, Credential, OpCalError, Result, UserId};
use rusqlite::{OptionalExtension, Row, ToSql};
use tracing::{debug, instrument, warn};

use super::convert::read_timestamp;
use super::manager::DbManager;
use crate::errors::conversions::{map_sql_error, map_storage_error};
use crate::integrations::esi::{SsoError, SsoTokenRefresher};

const TOKEN_COLUMNS: &str =
    "id, character_id, user_id, access_token, refresh_token, scopes, expires_at";

pub struct SqliteCredentialStore {
    db: Arc<DbManager>,
    refresher: Option<Arc<SsoTokenRefresher>>,
}

impl SqliteCredentialStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db, refresher: None }
    }

    pub fn with_refresher(mut self, refresher: Arc<SsoTokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Insert (`id == 0`) or overwrite a stored token.
    pub async fn save_credential(&self, credential: &Credential) -> Result<Credential> {
        let credential = credential.clone();
        self.db
            .run(move |conn| {
                let scopes = join_scopes(&credential);
                let expires_at = credential.expires_at.timestamp();
                let id = if credential.id == 0 {
                    let now = Utc::now().timestamp();
                    conn.execute(
                        "INSERT INTO esi_tokens (user_id, character_id, access_token, refresh_token,
                                                 scopes, expires_at, is_valid, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                        [
                            &credential.user_id as &dyn ToSql,
                            &credential.character_id,
                            &credential.access_token,
                            &credential.refresh_token,
                            &scopes,
                            &expires_at,
                            &now,
                        ]
                        .as_ref(),
                    )
                    .map_err(map_storage_error)?;
                    conn.inner().last_insert_rowid()
                } else {
                    let changed = conn
                        .execute(
                            "UPDATE esi_tokens SET user_id = ?1, character_id = ?2, access_token = ?3,
                                    refresh_token = ?4, scopes = ?5, expires_at = ?6, is_valid = 1
                             WHERE id = ?7",
                            [
                                &credential.user_id as &dyn ToSql,
                                &credential.character_id,
                                &credential.access_token,
                                &credential.refresh_token,
                                &scopes,
                                &expires_at,
                                &credential.id,
                            ]
                            .as_ref(),
                        )
                        .map_err(map_storage_error)?;
                    if changed == 0 {
                        return Err(OpCalError::NotFound(format!("credential {}", credential.id)));
                    }
                    credential.id
                };
                Ok(Credential { id, ..credential })
            })
            .await
    }

    async fn mark_invalid(&self, id: i64) -> Result<()> {
        self.db
            .run(move |conn| {
                conn.execute("UPDATE esi_tokens SET is_valid = 0 WHERE id = ?1", [&id as &dyn ToSql].as_ref())
                    .map_err(map_storage_error)?;
                Ok(())
            })
            .await
    }

    async fn is_marked_valid(&self, id: i64) -> Result<bool> {
        self.db
            .run(move |conn| {
                let valid: Option<bool> = conn
                    .inner()
                    .query_row("SELECT is_valid FROM esi_tokens WHERE id = ?1", [id], |row| row.get(0))
                    .optional()
                    .map_err(map_sql_error)?;
                Ok(valid.unwrap_or(false))
            })
            .await
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    #[instrument(skip(self, scopes))]
    async fn find_credential(
        &self,
        user_id: UserId,
        character_id: CharacterId,
        scopes: &[&str],
    ) -> std::result::Result<Option<Credential>, CredentialStoreError> {
        let required: Vec<String> = scopes.iter().map(|scope| scope.to_string()).collect();
        let candidates = self
            .db
            .run(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {TOKEN_COLUMNS} FROM esi_tokens
                         WHERE user_id = ?1 AND character_id = ?2 AND is_valid = 1
                         ORDER BY expires_at DESC, id DESC"
                    ))
                    .map_err(map_storage_error)?;
                stmt.query_map(&[&user_id as &dyn ToSql, &character_id], map_credential)
                    .map_err(map_storage_error)
            })
            .await
            .map_err(unavailable)?;

        let found = candidates.into_iter().find(|credential| credential.covers(&required));
        debug!(found = found.is_some(), "credential lookup");
        Ok(found)
    }

    fn is_expired(&self, credential: &Credential) -> bool {
        credential.is_expired_at(Utc::now())
    }

    fn is_invalid(&self, credential: &Credential) -> bool {
        credential.access_token.is_empty()
    }

    #[instrument(skip(self, credential), fields(credential_id = credential.id))]
    async fn refresh(
        &self,
        credential: &Credential,
    ) -> std::result::Result<Credential, CredentialStoreError> {
        let Some(refresher) = &self.refresher else {
            return Err(CredentialStoreError::Expired("no SSO application configured".into()));
        };
        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            return Err(CredentialStoreError::Invalid("credential has no refresh token".into()));
        };
        if !self.is_marked_valid(credential.id).await.map_err(unavailable)? {
            return Err(CredentialStoreError::Invalid("credential was revoked".into()));
        }

        let token = match refresher.refresh(refresh_token).await {
            Ok(token) => token,
            Err(SsoError::Rejected(reason)) => {
                warn!(%reason, "refresh token rejected, invalidating credential");
                self.mark_invalid(credential.id).await.map_err(unavailable)?;
                return Err(CredentialStoreError::Invalid(reason));
            }
            Err(err) => return Err(CredentialStoreError::Expired(err.to_string())),
        };

        let Some(expires_at) =
            Duration::try_seconds(token.expires_in).and_then(|ttl| Utc::now().checked_add_signed(ttl))
        else {
            warn!(expires_in = token.expires_in, "SSO returned an out-of-range token lifetime");
            return Err(CredentialStoreError::Expired(format!(
                "token lifetime out of range: {}s",
                token.expires_in
            )));
        };

        let renewed = Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token.or_else(|| credential.refresh_token.clone()),
            expires_at,
            ..credential.clone()
        };
        self.save_credential(&renewed).await.map_err(unavailable)
    }
}

fn unavailable(err: OpCalError) -> CredentialStoreError {
    CredentialStoreError::Unavailable(err.to_string())
}

fn join_scopes(credential: &Credential) -> String {
    credential.scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn map_credential(row: &Row<'_>) -> rusqlite::Result<Credential> {
    let scopes: String = row.get(5)?;
    Ok(Credential {
        id: row.get(0)?,
        character_id: row.get(1)?,
        user_id: row.get(2)?,
        access_token: row.get(3)?,
        refresh_token: row.get(4)?,
        scopes: scopes.split_whitespace().map(str::to_string).collect(),
        expires_at: read_timestamp(row, 6)?,
    })
}
