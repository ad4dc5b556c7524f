use crate::util::{decode_json, encode_json, from_rfc3339, sql_err, to_rfc3339};
use aw_core::error::EventError;
use aw_core::events::EventRepository;
use aw_core::WatchError;
use aw_events::types::{EventRecord, FilterOptions, HumanInTheLoop, NewEvent};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

pub struct EventRepo<'a> {
    conn: &'a Connection,
}

impl<'a> EventRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl<'a> EventRepository for EventRepo<'a> {
    fn insert(
        &self,
        event: NewEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<EventRecord, WatchError> {
        let hitl_json = match &event.human_in_the_loop {
            Some(hitl) => Some(encode_json(hitl)?),
            None => None,
        };
        self.conn
            .execute(
                "INSERT INTO events (source_app, session_id, hook_event_type, payload_json, hitl_json, timestamp) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.source_app,
                    event.session_id,
                    event.hook_event_type,
                    encode_json(&event.payload)?,
                    hitl_json,
                    to_rfc3339(&timestamp),
                ],
            )
            .map_err(sql_err)?;
        let id = self.conn.last_insert_rowid();
        Ok(EventRecord {
            id,
            source_app: event.source_app,
            session_id: event.session_id,
            hook_event_type: event.hook_event_type,
            payload: event.payload,
            human_in_the_loop: event.human_in_the_loop,
            timestamp,
        })
    }

    fn get(&self, id: i64) -> Result<Option<EventRecord>, WatchError> {
        self.conn
            .query_row(
                "SELECT id, source_app, session_id, hook_event_type, payload_json, hitl_json, timestamp \
                 FROM events WHERE id = ?1",
                params![id],
                map_event_row,
            )
            .optional()
            .map_err(sql_err)?
            .transpose()
    }

    fn recent(&self, limit: u32) -> Result<Vec<EventRecord>, WatchError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, source_app, session_id, hook_event_type, payload_json, hitl_json, timestamp \
                 FROM events ORDER BY id DESC LIMIT ?1",
            )
            .map_err(sql_err)?;
        let rows = stmt.query_map(params![limit], map_event_row).map_err(sql_err)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(sql_err)??);
        }
        Ok(events)
    }

    fn filter_options(&self) -> Result<FilterOptions, WatchError> {
        Ok(FilterOptions {
            source_apps: distinct(self.conn, "source_app")?,
            session_ids: distinct(self.conn, "session_id")?,
            hook_event_types: distinct(self.conn, "hook_event_type")?,
        })
    }

    fn update_hitl_response(
        &self,
        id: i64,
        response: Value,
        responded_at: DateTime<Utc>,
    ) -> Result<EventRecord, WatchError> {
        let existing = self.get(id)?.ok_or(EventError::NotFound)?;
        let mut hitl = existing.human_in_the_loop.clone().unwrap_or_default();
        if hitl.is_responded() {
            return Err(EventError::AlreadyResponded.into());
        }
        hitl.response = Some(response);
        hitl.responded_at = Some(responded_at);
        self.conn
            .execute(
                "UPDATE events SET hitl_json = ?1 WHERE id = ?2",
                params![encode_json(&hitl)?, id],
            )
            .map_err(sql_err)?;
        Ok(EventRecord {
            human_in_the_loop: Some(hitl),
            ..existing
        })
    }

    fn count(&self) -> Result<i64, WatchError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .map_err(sql_err)
    }
}

fn distinct(conn: &Connection, column: &str) -> Result<Vec<String>, WatchError> {
    let sql = format!("SELECT DISTINCT {column} FROM events ORDER BY {column} ASC");
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(sql_err)?;
    let mut values = Vec::new();
    for row in rows {
        values.push(row.map_err(sql_err)?);
    }
    Ok(values)
}

fn map_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<EventRecord, WatchError>> {
    let id: i64 = row.get(0)?;
    let source_app: String = row.get(1)?;
    let session_id: String = row.get(2)?;
    let hook_event_type: String = row.get(3)?;
    let payload_json: String = row.get(4)?;
    let hitl_json: Option<String> = row.get(5)?;
    let timestamp: String = row.get(6)?;

    Ok(decode_event(
        id,
        source_app,
        session_id,
        hook_event_type,
        &payload_json,
        hitl_json.as_deref(),
        &timestamp,
    ))
}

fn decode_event(
    id: i64,
    source_app: String,
    session_id: String,
    hook_event_type: String,
    payload_json: &str,
    hitl_json: Option<&str>,
    timestamp: &str,
) -> Result<EventRecord, WatchError> {
    let human_in_the_loop = match hitl_json {
        Some(raw) => Some(decode_json::<HumanInTheLoop>(raw)?),
        None => None,
    };
    Ok(EventRecord {
        id,
        source_app,
        session_id,
        hook_event_type,
        payload: decode_json(payload_json)?,
        human_in_the_loop,
        timestamp: from_rfc3339(timestamp)?,
    })
}
