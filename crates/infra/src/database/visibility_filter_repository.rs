//! Visibility filters, their group/tier sets and webhooks.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use opcal_common::storage::SqlCipherConnection;
use opcal_core::VisibilityFilterRepository;
use opcal_domain::{
    OpCalError, Result, VisibilityFilter, VisibilityFilterId, WebHook, WebHookId,
};
use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use tracing::{debug, instrument};

use super::convert::bool_to_int;
use super::manager::DbManager;
use crate::errors::conversions::{map_sql_error, map_storage_error};

pub struct SqliteVisibilityFilterRepository {
    db: Arc<DbManager>,
}

impl SqliteVisibilityFilterRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VisibilityFilterRepository for SqliteVisibilityFilterRepository {
    async fn get(&self, id: VisibilityFilterId) -> Result<Option<VisibilityFilter>> {
        self.db.run(move |conn| load_filter(conn.inner(), id)).await
    }

    async fn list(&self) -> Result<Vec<VisibilityFilter>> {
        self.db
            .run(|conn| {
                let ids: Vec<VisibilityFilterId> = {
                    let mut stmt = conn
                        .prepare("SELECT id FROM visibility_filters ORDER BY name")
                        .map_err(map_storage_error)?;
                    stmt.query_map(&[], |row| row.get(0)).map_err(map_storage_error)?
                };
                let mut filters = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Some(filter) = load_filter(conn.inner(), id)? {
                        filters.push(filter);
                    }
                }
                Ok(filters)
            })
            .await
    }

    #[instrument(skip(self, filter), fields(filter_id = filter.id, name = %filter.name))]
    async fn save(&self, filter: &VisibilityFilter) -> Result<VisibilityFilter> {
        let filter = filter.clone();
        self.db.run(move |conn| save_filter(conn, &filter)).await
    }

    async fn get_webhook(&self, id: WebHookId) -> Result<Option<WebHook>> {
        self.db
            .run(move |conn| {
                conn.inner()
                    .query_row(
                        "SELECT id, name, url, enabled FROM webhooks WHERE id = ?1",
                        [id],
                        map_webhook,
                    )
                    .optional()
                    .map_err(map_sql_error)
            })
            .await
    }

    async fn save_webhook(&self, webhook: &WebHook) -> Result<WebHook> {
        let mut webhook = webhook.clone();
        self.db
            .run(move |conn| {
                let enabled = bool_to_int(webhook.enabled);
                if webhook.id == 0 {
                    conn.execute(
                        "INSERT INTO webhooks (name, url, enabled) VALUES (?1, ?2, ?3)",
                        [&webhook.name as &dyn ToSql, &webhook.url, &enabled].as_ref(),
                    )
                    .map_err(map_storage_error)?;
                    webhook.id = conn.last_insert_rowid();
                } else {
                    let changed = conn
                        .execute(
                            "UPDATE webhooks SET name = ?1, url = ?2, enabled = ?3 WHERE id = ?4",
                            [&webhook.name as &dyn ToSql, &webhook.url, &enabled, &webhook.id]
                                .as_ref(),
                        )
                        .map_err(map_storage_error)?;
                    if changed == 0 {
                        return Err(OpCalError::NotFound(format!("webhook {}", webhook.id)));
                    }
                }
                Ok(webhook)
            })
            .await
    }
}

/// Load a filter with its group and tier sets.
pub(crate) fn load_filter(
    conn: &Connection,
    id: VisibilityFilterId,
) -> Result<Option<VisibilityFilter>> {
    let filter = conn
        .query_row(
            "SELECT id, name, webhook_id, ignore_past, is_active FROM visibility_filters WHERE id = ?1",
            [id],
            |row| {
                Ok(VisibilityFilter {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    webhook_id: row.get(2)?,
                    ignore_past: row.get::<_, i64>(3)? != 0,
                    is_active: row.get::<_, i64>(4)? != 0,
                    groups: BTreeSet::new(),
                    states: BTreeSet::new(),
                })
            },
        )
        .optional()
        .map_err(map_sql_error)?;

    let Some(mut filter) = filter else {
        return Ok(None);
    };
    filter.groups =
        id_set(conn, "SELECT group_id FROM visibility_filter_groups WHERE filter_id = ?1", id)?;
    filter.states =
        id_set(conn, "SELECT state_id FROM visibility_filter_states WHERE filter_id = ?1", id)?;
    Ok(Some(filter))
}

fn id_set(conn: &Connection, sql: &str, id: i64) -> Result<BTreeSet<i64>> {
    let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
    let rows = stmt.query_map([id], |row| row.get::<_, i64>(0)).map_err(map_sql_error)?;
    rows.collect::<rusqlite::Result<BTreeSet<i64>>>().map_err(map_sql_error)
}

fn save_filter(conn: &mut SqlCipherConnection, filter: &VisibilityFilter) -> Result<VisibilityFilter> {
    let tx = conn.transaction().map_err(map_sql_error)?;
    let ignore_past = bool_to_int(filter.ignore_past);
    let is_active = bool_to_int(filter.is_active);

    let id = if filter.id == 0 {
        tx.execute(
            "INSERT INTO visibility_filters (name, webhook_id, ignore_past, is_active)
             VALUES (?1, ?2, ?3, ?4)",
            [&filter.name as &dyn ToSql, &filter.webhook_id, &ignore_past, &is_active].as_ref(),
        )
        .map_err(map_sql_error)?;
        tx.last_insert_rowid()
    } else {
        let changed = tx
            .execute(
                "UPDATE visibility_filters
                 SET name = ?1, webhook_id = ?2, ignore_past = ?3, is_active = ?4
                 WHERE id = ?5",
                [&filter.name as &dyn ToSql, &filter.webhook_id, &ignore_past, &is_active, &filter.id]
                    .as_ref(),
            )
            .map_err(map_sql_error)?;
        if changed == 0 {
            return Err(OpCalError::NotFound(format!("visibility filter {}", filter.id)));
        }
        filter.id
    };

    tx.execute("DELETE FROM visibility_filter_groups WHERE filter_id = ?1", [id])
        .map_err(map_sql_error)?;
    tx.execute("DELETE FROM visibility_filter_states WHERE filter_id = ?1", [id])
        .map_err(map_sql_error)?;
    for group in &filter.groups {
        tx.execute(
            "INSERT INTO visibility_filter_groups (filter_id, group_id) VALUES (?1, ?2)",
            [id, *group],
        )
        .map_err(map_sql_error)?;
    }
    for state in &filter.states {
        tx.execute(
            "INSERT INTO visibility_filter_states (filter_id, state_id) VALUES (?1, ?2)",
            [id, *state],
        )
        .map_err(map_sql_error)?;
    }

    tx.commit().map_err(map_sql_error)?;
    debug!(filter_id = id, groups = filter.groups.len(), states = filter.states.len(), "visibility filter saved");

    load_filter(conn.inner(), id)?
        .ok_or_else(|| OpCalError::NotFound(format!("visibility filter {id}")))
}

fn map_webhook(row: &Row<'_>) -> rusqlite::Result<WebHook> {
    Ok(WebHook {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        enabled: row.get::<_, i64>(3)? != 0,
    })
}
