use crate::alerts::Alert;
use crate::error::{EventError, ThemeError, WatchError};
use crate::events::EventRepository;
use crate::store::Store;
use crate::themes::{
    CreateThemeInput, Theme, ThemeExport, ThemeFilter, ThemeRepository, UpdateThemeInput,
};
use aw_events::bus::EventBus;
use aw_events::types::{EventRecord, FilterOptions, NewEvent, StreamMessage};
use chrono::Utc;
use serde_json::Value;
use ulid::Ulid;

pub const ALERT_EVENT_TYPE: &str = "Alert";
pub const POLLING_ALERT_EVENT_TYPE: &str = "PollingAlert";

/// Service layer over the store and the broadcast bus.
///
/// Every mutation persists first and publishes the stored record second, so
/// broadcast payloads always carry the assigned id and timestamp.
pub struct AgentWatch<S: Store> {
    store: S,
    bus: EventBus,
}

impl<S: Store> AgentWatch<S> {
    pub fn new(store: S, bus: EventBus) -> Self {
        Self { store, bus }
    }

    pub fn events(&self) -> EventsApi<'_, S> {
        EventsApi { core: self }
    }

    pub fn alerts(&self) -> AlertsApi<'_, S> {
        AlertsApi { core: self }
    }

    pub fn themes(&self) -> ThemesApi<'_, S> {
        ThemesApi { core: self }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

pub struct EventsApi<'a, S: Store> {
    core: &'a AgentWatch<S>,
}

impl<'a, S: Store> EventsApi<'a, S> {
    /// Persist one ingested event and broadcast the stored record.
    pub fn ingest(&self, mut event: NewEvent) -> Result<EventRecord, WatchError> {
        validate_new_event(&event)?;
        // A client cannot pre-fill the response half of a HITL request.
        if let Some(hitl) = event.human_in_the_loop.as_mut() {
            hitl.response = None;
            hitl.responded_at = None;
        }
        let record = self.core.store.events().insert(event, Utc::now())?;
        let _ = self.core.bus.publish(StreamMessage::Event(record.clone()));
        Ok(record)
    }

    pub fn get(&self, id: i64) -> Result<Option<EventRecord>, WatchError> {
        self.core.store.events().get(id)
    }

    pub fn recent(&self, limit: u32) -> Result<Vec<EventRecord>, WatchError> {
        self.core.store.events().recent(limit)
    }

    pub fn filter_options(&self) -> Result<FilterOptions, WatchError> {
        self.core.store.events().filter_options()
    }

    pub fn count(&self) -> Result<i64, WatchError> {
        self.core.store.events().count()
    }

    /// Attach the operator response to a pending HITL event, stamping
    /// `responded_at` server-side, and rebroadcast the updated record.
    ///
    /// A second response to the same event is rejected; the first stored
    /// response is what the agent was notified with.
    pub fn respond(&self, id: i64, response: Value) -> Result<EventRecord, WatchError> {
        let updated = self
            .core
            .store
            .events()
            .update_hitl_response(id, response, Utc::now())?;
        let _ = self.core.bus.publish(StreamMessage::Event(updated.clone()));
        Ok(updated)
    }
}

pub struct AlertsApi<'a, S: Store> {
    core: &'a AgentWatch<S>,
}

impl<'a, S: Store> AlertsApi<'a, S> {
    /// Store an external webhook alert as an event (full body preserved as
    /// the payload) and broadcast it. The analysis decision is the caller's.
    pub fn ingest_external(&self, body: &Value) -> Result<(EventRecord, Alert), WatchError> {
        let alert = Alert::from_webhook(body, Utc::now());
        let record = self.core.store.events().insert(
            NewEvent {
                source_app: alert.service.clone(),
                session_id: alert.alert_id.clone(),
                hook_event_type: ALERT_EVENT_TYPE.to_string(),
                payload: body.clone(),
                human_in_the_loop: None,
            },
            Utc::now(),
        )?;
        let _ = self.core.bus.publish(StreamMessage::Alert(record.clone()));
        Ok((record, alert))
    }

    /// Store a poller-raised alert as an event and broadcast it.
    pub fn ingest_polling(&self, alert: &Alert) -> Result<EventRecord, WatchError> {
        let payload = serde_json::to_value(alert).map_err(|err| WatchError::Internal {
            message: err.to_string(),
        })?;
        let record = self.core.store.events().insert(
            NewEvent {
                source_app: alert.service.clone(),
                session_id: alert.alert_id.clone(),
                hook_event_type: POLLING_ALERT_EVENT_TYPE.to_string(),
                payload,
                human_in_the_loop: None,
            },
            Utc::now(),
        )?;
        let _ = self
            .core
            .bus
            .publish(StreamMessage::PollingAlert(record.clone()));
        Ok(record)
    }
}

pub struct ThemesApi<'a, S: Store> {
    core: &'a AgentWatch<S>,
}

impl<'a, S: Store> ThemesApi<'a, S> {
    pub fn create(&self, input: CreateThemeInput) -> Result<Theme, WatchError> {
        if input.name.trim().is_empty() {
            return Err(ThemeError::InvalidInput {
                message: "theme name must not be empty".to_string(),
            }
            .into());
        }
        let now = Utc::now();
        let theme = Theme {
            id: format!("thm_{}", Ulid::new()),
            name: input.name,
            description: input.description,
            colors: input.colors,
            is_public: input.is_public,
            author_id: input.author_id,
            created_at: now,
            updated_at: now,
        };
        self.core.store.themes().create(theme)
    }

    pub fn get(&self, id: &str) -> Result<Theme, WatchError> {
        self.core
            .store
            .themes()
            .get(id)?
            .ok_or_else(|| ThemeError::NotFound.into())
    }

    pub fn search(&self, filter: &ThemeFilter) -> Result<Vec<Theme>, WatchError> {
        self.core.store.themes().search(filter)
    }

    pub fn update(
        &self,
        id: &str,
        input: UpdateThemeInput,
        requester: Option<&str>,
    ) -> Result<Theme, WatchError> {
        let mut theme = self.get(id)?;
        check_ownership(&theme, requester)?;
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ThemeError::InvalidInput {
                    message: "theme name must not be empty".to_string(),
                }
                .into());
            }
            theme.name = name;
        }
        if let Some(description) = input.description {
            theme.description = Some(description);
        }
        if let Some(colors) = input.colors {
            theme.colors = colors;
        }
        if let Some(is_public) = input.is_public {
            theme.is_public = is_public;
        }
        theme.updated_at = Utc::now();
        self.core.store.themes().update(&theme)
    }

    pub fn delete(&self, id: &str, requester: Option<&str>) -> Result<(), WatchError> {
        let theme = self.get(id)?;
        check_ownership(&theme, requester)?;
        self.core.store.themes().delete(id)
    }

    pub fn export(&self, id: &str) -> Result<ThemeExport, WatchError> {
        let theme = self.get(id)?;
        Ok(ThemeExport {
            name: theme.name,
            description: theme.description,
            colors: theme.colors,
            exported_at: Utc::now(),
        })
    }

    pub fn import(
        &self,
        export: ThemeExport,
        author_id: Option<String>,
    ) -> Result<Theme, WatchError> {
        self.create(CreateThemeInput {
            name: export.name,
            description: export.description,
            colors: export.colors,
            is_public: false,
            author_id,
        })
    }
}

fn validate_new_event(event: &NewEvent) -> Result<(), WatchError> {
    if event.source_app.trim().is_empty()
        || event.session_id.trim().is_empty()
        || event.hook_event_type.trim().is_empty()
    {
        return Err(EventError::InvalidInput {
            message: "Missing required fields".to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_ownership(theme: &Theme, requester: Option<&str>) -> Result<(), WatchError> {
    match theme.author_id.as_deref() {
        Some(author) if requester != Some(author) => Err(ThemeError::Forbidden.into()),
        _ => Ok(()),
    }
}
