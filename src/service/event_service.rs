//! Event CRUD.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{BackupStore, Event, EventId, EventPatch};
use crate::error::AppError;
use crate::store::{AttendanceFilter, NoShowFilter, Store};

/// Fields accepted when an event is created.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewEvent {
    /// Display name.
    pub name: String,
    /// Calendar date (`YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Venue.
    #[serde(default)]
    pub location: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Event operations over the store.
///
/// Holds the backup store too: deleting an event drops its pending undo.
#[derive(Debug, Clone)]
pub struct EventService {
    store: Arc<dyn Store>,
    backups: Arc<dyn BackupStore>,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, backups: Arc<dyn BackupStore>) -> Self {
        Self { store, backups }
    }

    /// Creates an event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] for a blank name.
    pub async fn create(&self, input: NewEvent) -> Result<Event, AppError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest("event name is required".to_string()));
        }
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: name.to_string(),
            date: input.date,
            location: input.location,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        let event = self.store.insert_event(&event).await?;
        tracing::info!(event_id = %event.id, "event created");
        Ok(event)
    }

    /// Lists events, latest date first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self) -> Result<Vec<Event>, AppError> {
        Ok(self.store.list_events().await?)
    }

    /// Fetches one event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if absent.
    pub async fn get(&self, id: EventId) -> Result<Event, AppError> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::not_found("Event"))
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if absent.
    pub async fn update(&self, id: EventId, patch: EventPatch) -> Result<Event, AppError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::InvalidRequest("event name cannot be empty".to_string()));
        }
        self.store
            .update_event(id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found("Event"))
    }

    /// Deletes an event together with its attendance and no-show rows and
    /// any delete backup still waiting for an undo.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if absent.
    pub async fn delete(&self, id: EventId) -> Result<(), AppError> {
        self.get(id).await?;
        let backup_dropped = self.backups.remove(id).await;
        let attendance = self
            .store
            .delete_attendance(&AttendanceFilter::for_event(id))
            .await?;
        let no_shows = self.store.delete_no_shows(&NoShowFilter::for_event(id)).await?;
        self.store.delete_event(id).await?;
        tracing::info!(event_id = %id, attendance, no_shows, backup_dropped, "event deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{AttendanceRecord, AttendanceStatus, BackupKind, MemoryBackupStore, Participant};
    use crate::service::RosterService;
    use crate::store::MemoryStore;

    fn service(store: Arc<MemoryStore>) -> EventService {
        EventService::new(store, Arc::new(MemoryBackupStore::new()))
    }

    fn new_event(name: &str) -> NewEvent {
        NewEvent {
            name: name.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default(),
            location: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn create_get_update() {
        let svc = service(Arc::new(MemoryStore::new()));
        let Ok(event) = svc.create(new_event("Meetup")).await else {
            panic!("create failed");
        };
        let patch = EventPatch {
            location: Some("Hall A".to_string()),
            ..EventPatch::default()
        };
        let Ok(updated) = svc.update(event.id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.location.as_deref(), Some("Hall A"));
        assert_eq!(updated.name, "Meetup");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let svc = service(Arc::new(MemoryStore::new()));
        let result = svc.create(new_event("  ")).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn delete_removes_attendance_first() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(Arc::clone(&store));
        let Ok(event) = svc.create(new_event("Meetup")).await else {
            panic!("create failed");
        };
        let participant = Participant::new("Ann", "ann@x.com");
        let row = AttendanceRecord::new(event.id, participant.id, AttendanceStatus::Attended);
        let (Ok(_), Ok(_)) = (
            store.insert_participants(&[participant]).await,
            store.insert_attendance(&[row]).await,
        ) else {
            panic!("seed failed");
        };

        let Ok(()) = svc.delete(event.id).await else {
            panic!("delete failed");
        };
        assert!(matches!(svc.get(event.id).await, Err(AppError::NotFound(_))));
        assert_eq!(store.count_attendance(&AttendanceFilter::all()).await, Ok(0));
    }

    #[tokio::test]
    async fn delete_drops_pending_undo() {
        let store = Arc::new(MemoryStore::new());
        let backups = Arc::new(MemoryBackupStore::new());
        let svc = EventService::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&backups) as Arc<dyn BackupStore>,
        );
        let roster = RosterService::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&backups) as Arc<dyn BackupStore>,
        );
        let Ok(event) = svc.create(new_event("Meetup")).await else {
            panic!("create failed");
        };
        let participant = Participant::new("Ann", "ann@x.com");
        let row = AttendanceRecord::new(event.id, participant.id, AttendanceStatus::Attended);
        let (Ok(_), Ok(_)) = (
            store.insert_participants(&[participant]).await,
            store.insert_attendance(&[row]).await,
        ) else {
            panic!("seed failed");
        };

        let Ok(outcome) = roster.delete_all_participants(event.id).await else {
            panic!("roster delete failed");
        };
        tokio_test::assert_ok!(svc.delete(event.id).await);
        assert!(backups.get(event.id).await.is_none());

        let undo = roster
            .undo_delete(event.id, BackupKind::Participant, &outcome.undo_token)
            .await;
        assert!(undo.is_err());
        assert_eq!(store.count_attendance(&AttendanceFilter::all()).await, Ok(0));
        assert_eq!(store.count_participants(None).await, Ok(0));
    }
}
