//! SQLCipher-backed cache of events mirrored from in-game calendars.
//!
//! Rows are keyed by `(owner_id, event_id)`; two owners mirroring the same
//! remote event each keep their own copy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcal_common::storage::SqlCipherConnection;
use opcal_core::ImportedEventRepository;
use opcal_domain::{ImportedEvent, OwnerId, Result};
use rusqlite::{OptionalExtension, Row, ToSql};
use tracing::{debug, instrument};

use super::convert::{placeholders, read_optional_timestamp, read_timestamp};
use super::manager::DbManager;
use crate::errors::conversions::{map_sql_error, map_storage_error};

const EVENT_COLUMNS: &str = "event_id, owner_id, start_ts, end_ts, title, text, owner_type, \
                             owner_name, importance, duration_minutes";

// SQLite's default host parameter limit is well above this.
const DELETE_CHUNK: usize = 500;

pub struct SqliteImportedEventRepository {
    db: Arc<DbManager>,
}

impl SqliteImportedEventRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImportedEventRepository for SqliteImportedEventRepository {
    async fn list_event_ids(&self, owner_id: OwnerId) -> Result<Vec<i64>> {
        self.db
            .run(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT event_id FROM imported_events WHERE owner_id = ?1")
                    .map_err(map_storage_error)?;
                stmt.query_map(&[&owner_id], |row| row.get(0)).map_err(map_storage_error)
            })
            .await
    }

    #[instrument(skip(self, event), fields(owner_id = event.owner_id, event_id = event.event_id))]
    async fn create(&self, event: &ImportedEvent) -> Result<()> {
        let event = event.clone();
        self.db.run(move |conn| insert_event(conn, &event)).await
    }

    #[instrument(skip(self, event_ids), fields(count = event_ids.len()))]
    async fn delete_many(&self, owner_id: OwnerId, event_ids: &[i64]) -> Result<usize> {
        if event_ids.is_empty() {
            return Ok(0);
        }
        let event_ids = event_ids.to_vec();
        self.db
            .run(move |conn| {
                let tx = conn.transaction().map_err(map_sql_error)?;
                let mut deleted = 0;
                for chunk in event_ids.chunks(DELETE_CHUNK) {
                    let sql = format!(
                        "DELETE FROM imported_events WHERE owner_id = ? AND event_id IN ({})",
                        placeholders(chunk.len())
                    );
                    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() + 1);
                    params.push(&owner_id);
                    params.extend(chunk.iter().map(|id| id as &dyn ToSql));
                    deleted += tx.execute(&sql, params.as_slice()).map_err(map_sql_error)?;
                }
                tx.commit().map_err(map_sql_error)?;
                debug!(owner_id, deleted, "stale imported events purged");
                Ok(deleted)
            })
            .await
    }

    async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<ImportedEvent>> {
        self.db
            .run(move |conn| {
                query_events(
                    conn,
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM imported_events WHERE owner_id = ?1 \
                         ORDER BY start_ts, event_id"
                    ),
                    &[&owner_id],
                )
            })
            .await
    }

    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ImportedEvent>> {
        let (from, to) = (from.timestamp(), to.timestamp());
        self.db
            .run(move |conn| {
                query_events(
                    conn,
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM imported_events \
                         WHERE start_ts >= ?1 AND start_ts < ?2 ORDER BY start_ts, event_id"
                    ),
                    &[&from, &to],
                )
            })
            .await
    }

    async fn find_by_event_id(&self, event_id: i64) -> Result<Option<ImportedEvent>> {
        self.db
            .run(move |conn| {
                conn.inner()
                    .query_row(
                        &format!(
                            "SELECT {EVENT_COLUMNS} FROM imported_events WHERE event_id = ?1 \
                             ORDER BY owner_id LIMIT 1"
                        ),
                        [event_id],
                        map_event,
                    )
                    .optional()
                    .map_err(map_sql_error)
            })
            .await
    }
}

fn insert_event(conn: &SqlCipherConnection, event: &ImportedEvent) -> Result<()> {
    let start = event.start.timestamp();
    let end = event.end.map(|end| end.timestamp());
    let params: [&dyn ToSql; 10] = [
        &event.owner_id,
        &event.event_id,
        &start,
        &end,
        &event.title,
        &event.text,
        &event.owner_type,
        &event.owner_name,
        &event.importance,
        &event.duration_minutes,
    ];

    // Re-importing a cached id is a no-op.
    conn.execute(
        "INSERT OR IGNORE INTO imported_events (
            owner_id, event_id, start_ts, end_ts, title, text,
            owner_type, owner_name, importance, duration_minutes
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params.as_slice(),
    )
    .map_err(map_storage_error)?;
    Ok(())
}

fn query_events(
    conn: &SqlCipherConnection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<ImportedEvent>> {
    let mut stmt = conn.prepare(sql).map_err(map_storage_error)?;
    stmt.query_map(params, map_event).map_err(map_storage_error)
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<ImportedEvent> {
    Ok(ImportedEvent {
        event_id: row.get(0)?,
        owner_id: row.get(1)?,
        start: read_timestamp(row, 2)?,
        end: read_optional_timestamp(row, 3)?,
        title: row.get(4)?,
        text: row.get(5)?,
        owner_type: row.get(6)?,
        owner_name: row.get(7)?,
        importance: row.get(8)?,
        duration_minutes: row.get(9)?,
    })
}
