//! Locally created events and their sign-ups.
//!
//! Events carry their visibility filter resolved at read time, so a filter
//! edit applies to every event it is attached to.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcal_core::LocalEventRepository;
use opcal_domain::{
    EventCategory, EventDraft, EventMember, LocalEvent, LocalEventId, NewLocalEvent, OpCalError,
    Result, VisibilityFilter, VisibilityFilterId,
};
use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use tracing::{debug, instrument};

use super::convert::{bool_to_int, read_timestamp};
use super::manager::DbManager;
use super::visibility_filter_repository::load_filter;
use crate::errors::conversions::{map_sql_error, map_storage_error};

const EVENT_COLUMNS: &str = "id, category_name, category_ticker, title, host, doctrine, \
                             formup_system, description, start_ts, end_ts, fc, visibility_id, \
                             external, created_by, created_character, created_at";

pub struct SqliteLocalEventRepository {
    db: Arc<DbManager>,
}

impl SqliteLocalEventRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LocalEventRepository for SqliteLocalEventRepository {
    async fn get(&self, id: LocalEventId) -> Result<Option<LocalEvent>> {
        self.db.run(move |conn| find_event(conn.inner(), id)).await
    }

    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LocalEvent>> {
        let (from, to) = (from.timestamp(), to.timestamp());
        self.db
            .run(move |conn| {
                let rows = {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT {EVENT_COLUMNS} FROM local_events \
                             WHERE start_ts >= ?1 AND start_ts < ?2 ORDER BY start_ts, id"
                        ))
                        .map_err(map_storage_error)?;
                    stmt.query_map(&[&from, &to], map_event_row).map_err(map_storage_error)?
                };
                attach_filters(conn.inner(), rows)
            })
            .await
    }

    async fn title_taken(
        &self,
        title: &str,
        start: DateTime<Utc>,
        excluding: Option<LocalEventId>,
    ) -> Result<bool> {
        let title = title.to_string();
        let start = start.timestamp();
        self.db
            .run(move |conn| {
                conn.query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM local_events
                        WHERE title = ?1 AND start_ts = ?2 AND (?3 IS NULL OR id != ?3)
                    )",
                    [&title as &dyn ToSql, &start, &excluding].as_ref(),
                    |row| row.get::<_, bool>(0),
                )
                .map_err(map_storage_error)
            })
            .await
    }

    #[instrument(skip(self, event), fields(title = %event.draft.title))]
    async fn create(&self, event: &NewLocalEvent) -> Result<LocalEvent> {
        let event = event.clone();
        self.db
            .run(move |conn| {
                let draft = &event.draft;
                let fields = DraftColumns::from(draft);
                let created_at = event.created_at.timestamp();
                let params: [&dyn ToSql; 15] = [
                    &fields.category_name,
                    &fields.category_ticker,
                    &draft.title,
                    &draft.host,
                    &draft.doctrine,
                    &draft.formup_system,
                    &draft.description,
                    &fields.start,
                    &fields.end,
                    &draft.fc,
                    &draft.visibility_id,
                    &fields.external,
                    &event.created_by,
                    &event.created_character,
                    &created_at,
                ];
                conn.execute(
                    "INSERT INTO local_events (
                        category_name, category_ticker, title, host, doctrine, formup_system,
                        description, start_ts, end_ts, fc, visibility_id, external,
                        created_by, created_character, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    params.as_slice(),
                )
                .map_err(map_storage_error)?;

                let id = conn.last_insert_rowid();
                debug!(event_id = id, "local event row inserted");
                find_event(conn.inner(), id)?
                    .ok_or_else(|| OpCalError::NotFound(format!("event {id}")))
            })
            .await
    }

    #[instrument(skip(self, draft))]
    async fn update(&self, id: LocalEventId, draft: &EventDraft) -> Result<LocalEvent> {
        let draft = draft.clone();
        self.db
            .run(move |conn| {
                let fields = DraftColumns::from(&draft);
                let params: [&dyn ToSql; 13] = [
                    &fields.category_name,
                    &fields.category_ticker,
                    &draft.title,
                    &draft.host,
                    &draft.doctrine,
                    &draft.formup_system,
                    &draft.description,
                    &fields.start,
                    &fields.end,
                    &draft.fc,
                    &draft.visibility_id,
                    &fields.external,
                    &id,
                ];
                let changed = conn
                    .execute(
                        "UPDATE local_events SET
                            category_name = ?1, category_ticker = ?2, title = ?3, host = ?4,
                            doctrine = ?5, formup_system = ?6, description = ?7, start_ts = ?8,
                            end_ts = ?9, fc = ?10, visibility_id = ?11, external = ?12
                         WHERE id = ?13",
                        params.as_slice(),
                    )
                    .map_err(map_storage_error)?;
                if changed == 0 {
                    return Err(OpCalError::NotFound(format!("event {id}")));
                }
                find_event(conn.inner(), id)?
                    .ok_or_else(|| OpCalError::NotFound(format!("event {id}")))
            })
            .await
    }

    async fn delete(&self, id: LocalEventId) -> Result<bool> {
        self.db
            .run(move |conn| {
                let deleted = conn
                    .execute("DELETE FROM local_events WHERE id = ?1", [&id as &dyn ToSql].as_ref())
                    .map_err(map_storage_error)?;
                Ok(deleted > 0)
            })
            .await
    }

    async fn list_members(&self, event_id: LocalEventId) -> Result<Vec<EventMember>> {
        self.db
            .run(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT event_id, user_id, character_id, joined_at FROM event_members
                         WHERE event_id = ?1 ORDER BY joined_at, user_id",
                    )
                    .map_err(map_storage_error)?;
                stmt.query_map(&[&event_id], |row| {
                    Ok(EventMember {
                        event_id: row.get(0)?,
                        user_id: row.get(1)?,
                        character_id: row.get(2)?,
                        joined_at: read_timestamp(row, 3)?,
                    })
                })
                .map_err(map_storage_error)
            })
            .await
    }

    #[instrument(skip(self, member), fields(event_id = member.event_id, user_id = member.user_id))]
    async fn add_member(&self, member: &EventMember) -> Result<()> {
        let member = member.clone();
        self.db
            .run(move |conn| {
                let joined_at = member.joined_at.timestamp();
                conn.execute(
                    "INSERT INTO event_members (event_id, user_id, character_id, joined_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    [&member.event_id as &dyn ToSql, &member.user_id, &member.character_id, &joined_at]
                        .as_ref(),
                )
                .map_err(map_storage_error)?;
                Ok(())
            })
            .await
    }
}

struct DraftColumns {
    category_name: Option<String>,
    category_ticker: Option<String>,
    start: i64,
    end: i64,
    external: i64,
}

impl From<&EventDraft> for DraftColumns {
    fn from(draft: &EventDraft) -> Self {
        Self {
            category_name: draft.category.as_ref().map(|c| c.name.clone()),
            category_ticker: draft.category.as_ref().map(|c| c.ticker.clone()),
            start: draft.start.timestamp(),
            end: draft.end.timestamp(),
            external: bool_to_int(draft.external),
        }
    }
}

fn find_event(conn: &Connection, id: LocalEventId) -> Result<Option<LocalEvent>> {
    let row = conn
        .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM local_events WHERE id = ?1"),
            [id],
            map_event_row,
        )
        .optional()
        .map_err(map_sql_error)?;

    match row {
        Some(row) => Ok(attach_filters(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

/// Resolve each row's filter id, loading every distinct filter once.
fn attach_filters(
    conn: &Connection,
    rows: Vec<(LocalEvent, Option<VisibilityFilterId>)>,
) -> Result<Vec<LocalEvent>> {
    let mut filters: HashMap<VisibilityFilterId, Option<VisibilityFilter>> = HashMap::new();
    let mut events = Vec::with_capacity(rows.len());

    for (mut event, filter_id) in rows {
        if let Some(filter_id) = filter_id {
            if !filters.contains_key(&filter_id) {
                filters.insert(filter_id, load_filter(conn, filter_id)?);
            }
            event.visibility = filters.get(&filter_id).cloned().flatten();
        }
        events.push(event);
    }
    Ok(events)
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<(LocalEvent, Option<VisibilityFilterId>)> {
    let category_name: Option<String> = row.get(1)?;
    let category_ticker: Option<String> = row.get(2)?;
    let category = category_name.map(|name| EventCategory {
        name,
        ticker: category_ticker.unwrap_or_default(),
    });

    let event = LocalEvent {
        id: row.get(0)?,
        category,
        title: row.get(3)?,
        host: row.get(4)?,
        doctrine: row.get(5)?,
        formup_system: row.get(6)?,
        description: row.get(7)?,
        start: read_timestamp(row, 8)?,
        end: read_timestamp(row, 9)?,
        fc: row.get(10)?,
        visibility: None,
        external: row.get::<_, i64>(12)? != 0,
        created_by: row.get(13)?,
        created_character: row.get(14)?,
        created_at: read_timestamp(row, 15)?,
    };
    Ok((event, row.get(11)?))
}
