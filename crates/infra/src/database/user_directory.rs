//! SQLCipher-backed view of platform users, groups, tiers and permissions.
//!
//! The platform owns these tables; the calendar only reads them. The write
//! helpers exist for bootstrapping and tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use opcal_core::UserDirectory;
use opcal_domain::{CharacterId, GroupId, Permission, Result, StateId, UserId, Viewer};
use rusqlite::{OptionalExtension, ToSql};
use tracing::{debug, instrument};

use super::manager::DbManager;
use crate::errors::conversions::{map_sql_error, map_storage_error};

pub struct SqliteUserDirectory {
    db: Arc<DbManager>,
}

impl SqliteUserDirectory {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    pub async fn upsert_user(
        &self,
        user_id: UserId,
        username: &str,
        state: Option<StateId>,
    ) -> Result<()> {
        let username = username.to_string();
        self.db
            .run(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, username, state_id) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id) DO UPDATE SET username = excluded.username,
                                                   state_id = excluded.state_id",
                    [&user_id as &dyn ToSql, &username, &state].as_ref(),
                )
                .map_err(map_storage_error)?;
                Ok(())
            })
            .await
    }

    pub async fn add_to_group(&self, user_id: UserId, group_id: GroupId) -> Result<()> {
        self.db
            .run(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?1, ?2)",
                    [&user_id as &dyn ToSql, &group_id].as_ref(),
                )
                .map_err(map_storage_error)?;
                Ok(())
            })
            .await
    }

    pub async fn grant(&self, user_id: UserId, permission: Permission) -> Result<()> {
        self.db
            .run(move |conn| {
                let codename = permission.to_string();
                conn.execute(
                    "INSERT OR IGNORE INTO user_permissions (user_id, codename) VALUES (?1, ?2)",
                    [&user_id as &dyn ToSql, &codename].as_ref(),
                )
                .map_err(map_storage_error)?;
                Ok(())
            })
            .await
    }

    pub async fn revoke(&self, user_id: UserId, permission: Permission) -> Result<()> {
        self.db
            .run(move |conn| {
                let codename = permission.to_string();
                conn.execute(
                    "DELETE FROM user_permissions WHERE user_id = ?1 AND codename = ?2",
                    [&user_id as &dyn ToSql, &codename].as_ref(),
                )
                .map_err(map_storage_error)?;
                Ok(())
            })
            .await
    }

    /// Record that `character_id` belongs to `user_id`.
    pub async fn link_character(
        &self,
        character_id: CharacterId,
        character_name: &str,
        user_id: UserId,
    ) -> Result<()> {
        let character_name = character_name.to_string();
        self.db
            .run(move |conn| {
                conn.execute(
                    "INSERT INTO characters (character_id, character_name, user_id) VALUES (?1, ?2, ?3)
                     ON CONFLICT(character_id) DO UPDATE SET character_name = excluded.character_name,
                                                             user_id = excluded.user_id",
                    [&character_id as &dyn ToSql, &character_name, &user_id].as_ref(),
                )
                .map_err(map_storage_error)?;
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn has_permission(&self, user_id: UserId, permission: Permission) -> Result<bool> {
        self.db
            .run(move |conn| {
                let codename = permission.to_string();
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM user_permissions WHERE user_id = ?1 AND codename = ?2)",
                    [&user_id as &dyn ToSql, &codename].as_ref(),
                    |row| row.get::<_, bool>(0),
                )
                .map_err(map_storage_error)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn load_viewer(&self, user_id: UserId) -> Result<Option<Viewer>> {
        self.db
            .run(move |conn| {
                let state: Option<Option<StateId>> = conn
                    .inner()
                    .query_row("SELECT state_id FROM users WHERE id = ?1", [user_id], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(map_sql_error)?;
                let Some(state) = state else {
                    return Ok(None);
                };

                let groups: BTreeSet<GroupId> = {
                    let mut stmt = conn
                        .prepare("SELECT group_id FROM user_groups WHERE user_id = ?1")
                        .map_err(map_storage_error)?;
                    stmt.query_map(&[&user_id], |row| row.get(0))
                        .map_err(map_storage_error)?
                        .into_iter()
                        .collect()
                };

                let codenames: Vec<String> = {
                    let mut stmt = conn
                        .prepare("SELECT codename FROM user_permissions WHERE user_id = ?1")
                        .map_err(map_storage_error)?;
                    stmt.query_map(&[&user_id], |row| row.get(0)).map_err(map_storage_error)?
                };
                let permissions = codenames.iter().filter_map(|codename| {
                    let parsed = codename.parse::<Permission>().ok();
                    if parsed.is_none() {
                        debug!(user_id, %codename, "ignoring unrelated permission");
                    }
                    parsed
                });

                let mut viewer = Viewer::new(user_id).with_groups(groups).with_permissions(permissions);
                viewer.state = state;
                Ok(Some(viewer))
            })
            .await
    }

    async fn character_owner(&self, character_id: CharacterId) -> Result<Option<UserId>> {
        self.db
            .run(move |conn| {
                let owner: Option<Option<UserId>> = conn
                    .inner()
                    .query_row(
                        "SELECT user_id FROM characters WHERE character_id = ?1",
                        [character_id],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(map_sql_error)?;
                Ok(owner.flatten())
            })
            .await
    }
}
