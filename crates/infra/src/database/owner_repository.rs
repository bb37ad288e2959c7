//! SQLCipher-backed implementation of the `OwnerRepository` port.
//!
//! Corporate owners are unique per corporation; personal owners are unique
//! per character (partial index on `character_id WHERE corporation_id IS
//! NULL`). Deleting an owner cascades to `imported_events`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcal_common::storage::SqlCipherConnection;
use opcal_core::OwnerRepository;
use opcal_domain::{
    CharacterBinding, Corporation, OpCalError, Owner, OwnerErrorState, OwnerId,
    OwnerRegistration, Result,
};
use rusqlite::{OptionalExtension, Row, ToSql};
use tracing::{debug, instrument};

use super::convert::{bool_to_int, read_optional_timestamp};
use super::manager::DbManager;
use crate::errors::conversions::{map_sql_error, map_storage_error};

const OWNER_COLUMNS: &str = "id, corporation_id, corporation_name, character_id, character_name, \
                             user_id, is_active, last_sync_at, last_error";

pub struct SqliteOwnerRepository {
    db: Arc<DbManager>,
}

impl SqliteOwnerRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OwnerRepository for SqliteOwnerRepository {
    async fn get(&self, id: OwnerId) -> Result<Option<Owner>> {
        self.db.run(move |conn| find_owner(conn, id)).await
    }

    async fn list(&self) -> Result<Vec<Owner>> {
        self.db
            .run(|conn| query_owners(conn, &format!("SELECT {OWNER_COLUMNS} FROM owners ORDER BY id")))
            .await
    }

    async fn list_active(&self) -> Result<Vec<Owner>> {
        self.db
            .run(|conn| {
                query_owners(
                    conn,
                    &format!("SELECT {OWNER_COLUMNS} FROM owners WHERE is_active = 1 ORDER BY id"),
                )
            })
            .await
    }

    #[instrument(skip(self, registration), fields(character_id = registration.character.character_id))]
    async fn upsert(&self, registration: &OwnerRegistration) -> Result<Owner> {
        let registration = registration.clone();
        self.db.run(move |conn| upsert_owner(conn, &registration)).await
    }

    async fn set_active(&self, id: OwnerId, active: bool) -> Result<()> {
        self.db
            .run(move |conn| {
                let active = bool_to_int(active);
                let changed = conn
                    .execute(
                        "UPDATE owners SET is_active = ?1 WHERE id = ?2",
                        [&active as &dyn ToSql, &id].as_ref(),
                    )
                    .map_err(map_storage_error)?;
                require_changed(changed, id)
            })
            .await
    }

    #[instrument(skip(self), fields(error_state = state.label()))]
    async fn record_sync_outcome(
        &self,
        id: OwnerId,
        state: OwnerErrorState,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.db
            .run(move |conn| {
                let code = state.code();
                let at = at.timestamp();
                let changed = conn
                    .execute(
                        "UPDATE owners SET last_error = ?1, last_sync_at = ?2 WHERE id = ?3",
                        [&code as &dyn ToSql, &at, &id].as_ref(),
                    )
                    .map_err(map_storage_error)?;
                require_changed(changed, id)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: OwnerId) -> Result<()> {
        self.db
            .run(move |conn| {
                let deleted = conn
                    .execute("DELETE FROM owners WHERE id = ?1", [&id as &dyn ToSql].as_ref())
                    .map_err(map_storage_error)?;
                debug!(owner_id = id, deleted, "owner row deleted");
                Ok(())
            })
            .await
    }
}

fn upsert_owner(conn: &mut SqlCipherConnection, registration: &OwnerRegistration) -> Result<Owner> {
    let character = &registration.character;
    let corporation_id = registration.corporation.as_ref().map(|c| c.corporation_id);
    let corporation_name = registration.corporation.as_ref().map(|c| c.corporation_name.clone());

    let tx = conn.transaction().map_err(map_sql_error)?;

    let existing: Option<OwnerId> = match corporation_id {
        Some(corp) => tx
            .query_row("SELECT id FROM owners WHERE corporation_id = ?1", [corp], |row| row.get(0))
            .optional(),
        None => tx
            .query_row(
                "SELECT id FROM owners WHERE corporation_id IS NULL AND character_id = ?1",
                [character.character_id],
                |row| row.get(0),
            )
            .optional(),
    }
    .map_err(map_sql_error)?;

    let id = match existing {
        Some(id) => {
            tx.execute(
                "UPDATE owners SET corporation_name = ?1, character_id = ?2, character_name = ?3,
                        user_id = ?4, is_active = 1
                 WHERE id = ?5",
                [
                    &corporation_name as &dyn ToSql,
                    &character.character_id,
                    &character.character_name,
                    &character.user_id,
                    &id,
                ]
                .as_ref(),
            )
            .map_err(map_sql_error)?;
            debug!(owner_id = id, "owner re-authorized");
            id
        }
        None => {
            tx.execute(
                "INSERT INTO owners (corporation_id, corporation_name, character_id,
                                     character_name, user_id, is_active, last_error)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, 0)",
                [
                    &corporation_id as &dyn ToSql,
                    &corporation_name,
                    &character.character_id,
                    &character.character_name,
                    &character.user_id,
                ]
                .as_ref(),
            )
            .map_err(map_sql_error)?;
            tx.last_insert_rowid()
        }
    };

    tx.commit().map_err(map_sql_error)?;

    find_owner(conn, id)?.ok_or_else(|| OpCalError::NotFound(format!("owner {id}")))
}

fn find_owner(conn: &SqlCipherConnection, id: OwnerId) -> Result<Option<Owner>> {
    conn.inner()
        .query_row(&format!("SELECT {OWNER_COLUMNS} FROM owners WHERE id = ?1"), [id], map_owner)
        .optional()
        .map_err(map_sql_error)
}

fn query_owners(conn: &SqlCipherConnection, sql: &str) -> Result<Vec<Owner>> {
    let mut stmt = conn.prepare(sql).map_err(map_storage_error)?;
    stmt.query_map(&[], map_owner).map_err(map_storage_error)
}

fn map_owner(row: &Row<'_>) -> rusqlite::Result<Owner> {
    let id: OwnerId = row.get(0)?;
    let corporation_id: Option<i64> = row.get(1)?;
    let corporation_name: Option<String> = row.get(2)?;
    let character_id: Option<i64> = row.get(3)?;
    let character_name: Option<String> = row.get(4)?;
    let user_id: Option<i64> = row.get(5)?;

    let corporation = corporation_id.map(|corporation_id| Corporation {
        corporation_id,
        corporation_name: corporation_name.unwrap_or_default(),
    });
    let character = character_id.zip(user_id).map(|(character_id, user_id)| CharacterBinding {
        character_id,
        character_name: character_name.unwrap_or_default(),
        user_id,
    });

    Ok(Owner {
        id,
        corporation,
        character,
        is_active: row.get::<_, i64>(6)? != 0,
        last_sync_at: read_optional_timestamp(row, 7)?,
        last_error: OwnerErrorState::from_code(row.get(8)?),
    })
}

fn require_changed(changed: usize, id: OwnerId) -> Result<()> {
    if changed == 0 {
        Err(OpCalError::NotFound(format!("owner {id}")))
    } else {
        Ok(())
    }
}
