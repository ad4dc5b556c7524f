use crate::error::WatchError;
use aw_events::types::{EventRecord, FilterOptions, NewEvent};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub trait EventRepository {
    /// Append a new event, assigning the next monotonic id. Ids are never
    /// reused, even across deletes.
    fn insert(
        &self,
        event: NewEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<EventRecord, WatchError>;

    fn get(&self, id: i64) -> Result<Option<EventRecord>, WatchError>;

    /// Most recent `limit` events, newest first.
    fn recent(&self, limit: u32) -> Result<Vec<EventRecord>, WatchError>;

    fn filter_options(&self) -> Result<FilterOptions, WatchError>;

    /// Attach the operator response to a pending HITL event. Fails with
    /// `EventError::NotFound` for unknown ids and
    /// `EventError::AlreadyResponded` if a response is already recorded.
    fn update_hitl_response(
        &self,
        id: i64,
        response: Value,
        responded_at: DateTime<Utc>,
    ) -> Result<EventRecord, WatchError>;

    fn count(&self) -> Result<i64, WatchError>;
}
