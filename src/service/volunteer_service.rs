//! Volunteer service: CRUD, per-event turnout with history and stats, and
//! work assignments.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::participant::normalize_email;
use crate::domain::{
    Event, EventId, TaskStatus, Volunteer, VolunteerAttendance, VolunteerAttendanceId,
    VolunteerAttendanceStatus, VolunteerId, VolunteerPatch, VolunteerWork, VolunteerWorkId,
};
use crate::error::AppError;
use crate::store::{Store, StoreError};

/// Rows returned by the recent-attendance view when no limit is given.
pub const DEFAULT_RECENT_LIMIT: u64 = 5;
const MAX_RECENT_LIMIT: u64 = 50;
/// Page size of the attendance history when none is given.
pub const DEFAULT_HISTORY_LIMIT: u64 = 20;
const MAX_HISTORY_LIMIT: u64 = 100;

/// Fields accepted when a volunteer signs up.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewVolunteer {
    /// Display name.
    pub name: String,
    /// E-mail address. Normalized before storing.
    pub email: String,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Turnout recorded for one event. Both fields are required; they are
/// optional here so a missing field gets a readable message.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RecordVolunteerAttendance {
    /// Event the turnout is for.
    #[serde(default)]
    pub event_id: Option<EventId>,
    /// One of `attended`, `not_attended`, `no_show`.
    #[serde(default)]
    pub attendance_status: Option<String>,
}

/// Fields accepted when a task is handed out.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewVolunteerWork {
    /// Event the task is for.
    pub event_id: EventId,
    /// Short task description.
    pub task_name: String,
    /// Starting status. Defaults to `assigned`.
    #[serde(default)]
    pub task_status: Option<TaskStatus>,
}

/// An attendance row with the event it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VolunteerAttendanceView {
    /// Record identifier.
    pub id: VolunteerAttendanceId,
    /// Volunteer the record is about.
    pub volunteer_id: VolunteerId,
    /// Event the record belongs to.
    pub event_id: EventId,
    /// Turnout.
    pub attendance_status: VolunteerAttendanceStatus,
    /// When the status was first recorded.
    pub created_at: DateTime<Utc>,
    /// Event name, if the event still exists.
    pub event_name: Option<String>,
    /// Event date, if the event still exists.
    pub event_date: Option<NaiveDate>,
}

impl VolunteerAttendanceView {
    fn new(row: VolunteerAttendance, event: Option<&Event>) -> Self {
        Self {
            id: row.id,
            volunteer_id: row.volunteer_id,
            event_id: row.event_id,
            attendance_status: row.attendance_status,
            created_at: row.created_at,
            event_name: event.map(|e| e.name.clone()),
            event_date: event.map(|e| e.date),
        }
    }
}

/// One page of a volunteer's attendance history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VolunteerAttendancePage {
    /// Rows on this page, newest first.
    pub records: Vec<VolunteerAttendanceView>,
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// Rows across all pages.
    pub total: u64,
    /// Number of pages at this size.
    pub total_pages: u64,
}

/// Turnout counters for one volunteer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct VolunteerAttendanceStats {
    /// All recorded events.
    pub total: u64,
    /// Events attended.
    pub attended: u64,
    /// Excused absences.
    pub not_attended: u64,
    /// No-shows.
    pub no_show: u64,
    /// Attended share of `total` in whole percent, rounded half up. Zero
    /// when nothing is recorded.
    pub attendance_rate: u64,
}

/// A work assignment with its event's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VolunteerWorkView {
    /// The assignment.
    #[serde(flatten)]
    pub work: VolunteerWork,
    /// Event name, if the event still exists.
    pub event_name: Option<String>,
}

/// Volunteer operations over the store.
#[derive(Debug, Clone)]
pub struct VolunteerService {
    store: Arc<dyn Store>,
}

impl VolunteerService {
    /// Creates a new `VolunteerService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Signs up a volunteer, joining now.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] if name or e-mail is blank.
    /// - [`AppError::Conflict`] if the e-mail is already registered.
    pub async fn create(&self, input: NewVolunteer) -> Result<Volunteer, AppError> {
        let name = input.name.trim();
        let email = normalize_email(&input.email);
        if name.is_empty() || email.is_empty() {
            return Err(AppError::InvalidRequest("name and email are required".to_string()));
        }
        if self.store.volunteer_by_email(&email).await?.is_some() {
            return Err(email_taken(&email));
        }

        let mut volunteer = Volunteer::new(name, email);
        volunteer.phone = input.phone.filter(|p| !p.trim().is_empty());
        let volunteer = self
            .store
            .insert_volunteer(&volunteer)
            .await
            .map_err(|e| unique_to_conflict(e, &volunteer.email))?;

        tracing::info!(volunteer_id = %volunteer.id, "volunteer created");
        Ok(volunteer)
    }

    /// Lists volunteers by join date, newest first unless `oldest_first`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self, oldest_first: bool) -> Result<Vec<Volunteer>, AppError> {
        Ok(self.store.list_volunteers(oldest_first).await?)
    }

    /// Fetches one volunteer.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if absent.
    pub async fn get(&self, id: VolunteerId) -> Result<Volunteer, AppError> {
        self.store
            .get_volunteer(id)
            .await?
            .ok_or_else(|| AppError::not_found("Volunteer"))
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] if the patch blanks name or e-mail.
    /// - [`AppError::Conflict`] if the new e-mail belongs to someone else.
    /// - [`AppError::NotFound`] if absent.
    pub async fn update(
        &self,
        id: VolunteerId,
        mut patch: VolunteerPatch,
    ) -> Result<Volunteer, AppError> {
        if let Some(email) = patch.email.as_mut() {
            *email = normalize_email(email);
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty())
            || patch.email.as_deref().is_some_and(str::is_empty)
        {
            return Err(AppError::InvalidRequest("name and email cannot be empty".to_string()));
        }
        let email = patch.email.clone().unwrap_or_default();
        self.store
            .update_volunteer(id, &patch)
            .await
            .map_err(|e| unique_to_conflict(e, &email))?
            .ok_or_else(|| AppError::not_found("Volunteer"))
    }

    /// Deletes a volunteer with their attendance and work rows.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if absent.
    pub async fn delete(&self, id: VolunteerId) -> Result<(), AppError> {
        if !self.store.delete_volunteer(id).await? {
            return Err(AppError::not_found("Volunteer"));
        }
        tracing::info!(volunteer_id = %id, "volunteer deleted");
        Ok(())
    }

    /// Records turnout for one event. Recording again for the same event
    /// replaces the status.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] if a field is missing or the status
    ///   is not one of the three known values.
    /// - [`AppError::NotFound`] if the volunteer or the event is absent.
    pub async fn record_attendance(
        &self,
        id: VolunteerId,
        input: RecordVolunteerAttendance,
    ) -> Result<VolunteerAttendance, AppError> {
        let Some(event_id) = input.event_id else {
            return Err(AppError::InvalidRequest("event_id is required".to_string()));
        };
        let status: VolunteerAttendanceStatus = input
            .attendance_status
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|_| {
                AppError::InvalidRequest(
                    "attendance_status must be one of: attended, not_attended, no_show"
                        .to_string(),
                )
            })?;
        self.get(id).await?;
        self.require_event(event_id).await?;

        let row = self
            .store
            .upsert_volunteer_attendance(&VolunteerAttendance::new(id, event_id, status))
            .await?;
        tracing::info!(volunteer_id = %id, event_id = %event_id, status = %status, "volunteer attendance recorded");
        Ok(row)
    }

    /// The most recent attendance rows. `limit` defaults to 5 and is
    /// clamped to `1..=50`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the volunteer is absent.
    pub async fn recent_attendance(
        &self,
        id: VolunteerId,
        limit: Option<u64>,
    ) -> Result<Vec<VolunteerAttendanceView>, AppError> {
        self.get(id).await?;
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT);
        let rows = self.store.list_volunteer_attendance(id, 0, limit).await?;
        self.with_events(rows).await
    }

    /// One page of attendance history. `page` starts at 1; `limit`
    /// defaults to 20 and is clamped to `1..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the volunteer is absent.
    pub async fn history(
        &self,
        id: VolunteerId,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<VolunteerAttendancePage, AppError> {
        self.get(id).await?;
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
        let offset = (page - 1).saturating_mul(limit);

        let total = self.store.count_volunteer_attendance(id, None).await?;
        let rows = self.store.list_volunteer_attendance(id, offset, limit).await?;
        Ok(VolunteerAttendancePage {
            records: self.with_events(rows).await?,
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        })
    }

    /// Turnout counters.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the volunteer is absent.
    pub async fn stats(&self, id: VolunteerId) -> Result<VolunteerAttendanceStats, AppError> {
        self.get(id).await?;
        let by_status = |status| self.store.count_volunteer_attendance(id, Some(status));
        let attended = by_status(VolunteerAttendanceStatus::Attended).await?;
        let not_attended = by_status(VolunteerAttendanceStatus::NotAttended).await?;
        let no_show = by_status(VolunteerAttendanceStatus::NoShow).await?;
        let total = attended + not_attended + no_show;
        Ok(VolunteerAttendanceStats {
            total,
            attended,
            not_attended,
            no_show,
            attendance_rate: percent(attended, total),
        })
    }

    /// Hands a task to a volunteer.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] if the task name is blank.
    /// - [`AppError::NotFound`] if the volunteer or the event is absent.
    pub async fn assign_work(
        &self,
        id: VolunteerId,
        input: NewVolunteerWork,
    ) -> Result<VolunteerWork, AppError> {
        let task_name = input.task_name.trim();
        if task_name.is_empty() {
            return Err(AppError::InvalidRequest("task_name is required".to_string()));
        }
        self.get(id).await?;
        self.require_event(input.event_id).await?;

        let work = VolunteerWork::new(
            id,
            input.event_id,
            task_name,
            input.task_status.unwrap_or_default(),
        );
        let work = self.store.insert_volunteer_work(&work).await?;
        tracing::info!(volunteer_id = %id, work_id = %work.id, "volunteer work assigned");
        Ok(work)
    }

    /// A volunteer's assignments, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the volunteer is absent.
    pub async fn list_work(&self, id: VolunteerId) -> Result<Vec<VolunteerWorkView>, AppError> {
        self.get(id).await?;
        let rows = self.store.list_volunteer_work(id).await?;
        let events = self.events_for(rows.iter().map(|w| w.event_id)).await?;
        Ok(rows
            .into_iter()
            .map(|work| VolunteerWorkView {
                event_name: events.get(&work.event_id).map(|e| e.name.clone()),
                work,
            })
            .collect())
    }

    /// Moves an assignment to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the assignment is absent or
    /// belongs to another volunteer.
    pub async fn update_work_status(
        &self,
        id: VolunteerId,
        work_id: VolunteerWorkId,
        status: TaskStatus,
    ) -> Result<VolunteerWork, AppError> {
        self.require_work(id, work_id).await?;
        self.store
            .update_volunteer_work_status(work_id, status)
            .await?
            .ok_or_else(|| AppError::not_found("Work assignment"))
    }

    /// Removes an assignment.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the assignment is absent or
    /// belongs to another volunteer.
    pub async fn delete_work(&self, id: VolunteerId, work_id: VolunteerWorkId) -> Result<(), AppError> {
        self.require_work(id, work_id).await?;
        if !self.store.delete_volunteer_work(work_id).await? {
            return Err(AppError::not_found("Work assignment"));
        }
        Ok(())
    }

    async fn require_event(&self, id: EventId) -> Result<(), AppError> {
        self.store
            .get_event(id)
            .await?
            .map(drop)
            .ok_or_else(|| AppError::not_found("Event"))
    }

    async fn require_work(&self, id: VolunteerId, work_id: VolunteerWorkId) -> Result<(), AppError> {
        match self.store.get_volunteer_work(work_id).await? {
            Some(work) if work.volunteer_id == id => Ok(()),
            _ => Err(AppError::not_found("Work assignment")),
        }
    }

    async fn events_for(
        &self,
        ids: impl Iterator<Item = EventId>,
    ) -> Result<HashMap<EventId, Event>, AppError> {
        let mut events = HashMap::new();
        for id in ids {
            if events.contains_key(&id) {
                continue;
            }
            if let Some(event) = self.store.get_event(id).await? {
                events.insert(id, event);
            }
        }
        Ok(events)
    }

    async fn with_events(
        &self,
        rows: Vec<VolunteerAttendance>,
    ) -> Result<Vec<VolunteerAttendanceView>, AppError> {
        let events = self.events_for(rows.iter().map(|r| r.event_id)).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let event = events.get(&row.event_id);
                VolunteerAttendanceView::new(row, event)
            })
            .collect())
    }
}

fn email_taken(email: &str) -> AppError {
    AppError::Conflict(format!("Volunteer with email {email} already exists"))
}

fn unique_to_conflict(e: StoreError, email: &str) -> AppError {
    match e {
        StoreError::UniqueViolation(_) => email_taken(email),
        other => other.into(),
    }
}

fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    part.saturating_mul(100).saturating_add(whole / 2) / whole
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        svc: VolunteerService,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let svc = VolunteerService::new(Arc::clone(&store) as Arc<dyn Store>);
            Self { store, svc }
        }

        async fn volunteer(&self, name: &str, email: &str) -> Volunteer {
            let input = NewVolunteer {
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
            };
            let Ok(volunteer) = self.svc.create(input).await else {
                panic!("create failed");
            };
            volunteer
        }

        async fn event(&self, name: &str) -> EventId {
            let now = Utc::now();
            let event = Event {
                id: EventId::new(),
                name: name.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default(),
                location: None,
                description: None,
                created_at: now,
                updated_at: now,
            };
            let Ok(event) = self.store.insert_event(&event).await else {
                panic!("insert failed");
            };
            event.id
        }

        async fn record(&self, id: VolunteerId, event: EventId, status: &str) {
            let input = RecordVolunteerAttendance {
                event_id: Some(event),
                attendance_status: Some(status.to_string()),
            };
            let Ok(_) = self.svc.record_attendance(id, input).await else {
                panic!("record failed");
            };
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let f = Fixture::new();
        f.volunteer("Vic", "vic@x.com").await;
        let again = NewVolunteer {
            name: "Val".to_string(),
            email: " VIC@x.com".to_string(),
            phone: None,
        };
        assert!(matches!(f.svc.create(again).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_rejects_taken_email() {
        let f = Fixture::new();
        f.volunteer("Vic", "vic@x.com").await;
        let val = f.volunteer("Val", "val@x.com").await;
        let patch = VolunteerPatch {
            email: Some("vic@x.com".to_string()),
            ..VolunteerPatch::default()
        };
        assert!(matches!(f.svc.update(val.id, patch).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_with_choices() {
        let f = Fixture::new();
        let vic = f.volunteer("Vic", "vic@x.com").await;
        let event = f.event("Gala").await;
        let input = RecordVolunteerAttendance {
            event_id: Some(event),
            attendance_status: Some("late".to_string()),
        };
        let Err(AppError::InvalidRequest(message)) = f.svc.record_attendance(vic.id, input).await
        else {
            panic!("expected a validation error");
        };
        assert!(message.contains("not_attended"));

        let missing = RecordVolunteerAttendance::default();
        let Err(AppError::InvalidRequest(message)) = f.svc.record_attendance(vic.id, missing).await
        else {
            panic!("expected a validation error");
        };
        assert_eq!(message, "event_id is required");
    }

    #[tokio::test]
    async fn recording_twice_replaces_the_status() {
        let f = Fixture::new();
        let vic = f.volunteer("Vic", "vic@x.com").await;
        let event = f.event("Gala").await;
        f.record(vic.id, event, "no_show").await;
        f.record(vic.id, event, "attended").await;

        let Ok(recent) = f.svc.recent_attendance(vic.id, None).await else {
            panic!("recent failed");
        };
        assert_eq!(recent.len(), 1);
        let Some(row) = recent.first() else {
            panic!("expected a row");
        };
        assert_eq!(row.attendance_status, VolunteerAttendanceStatus::Attended);
        assert_eq!(row.event_name.as_deref(), Some("Gala"));
    }

    #[tokio::test]
    async fn history_pages_and_stats_count() {
        let f = Fixture::new();
        let vic = f.volunteer("Vic", "vic@x.com").await;
        for (name, status) in [("A", "attended"), ("B", "attended"), ("C", "no_show")] {
            let event = f.event(name).await;
            f.record(vic.id, event, status).await;
        }

        let Ok(page) = f.svc.history(vic.id, Some(2), Some(2)).await else {
            panic!("history failed");
        };
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.records.len(), 1);

        let Ok(stats) = f.svc.stats(vic.id).await else {
            panic!("stats failed");
        };
        assert_eq!((stats.attended, stats.not_attended, stats.no_show), (2, 0, 1));
        assert_eq!(stats.total, 3);
        assert_eq!(stats.attendance_rate, 67);
    }

    #[tokio::test]
    async fn work_is_scoped_to_its_volunteer() {
        let f = Fixture::new();
        let vic = f.volunteer("Vic", "vic@x.com").await;
        let val = f.volunteer("Val", "val@x.com").await;
        let event = f.event("Gala").await;
        let input = NewVolunteerWork {
            event_id: event,
            task_name: " Doors ".to_string(),
            task_status: None,
        };
        let Ok(work) = f.svc.assign_work(vic.id, input).await else {
            panic!("assign failed");
        };
        assert_eq!(work.task_name, "Doors");
        assert_eq!(work.task_status, TaskStatus::Assigned);

        let other = f.svc.update_work_status(val.id, work.id, TaskStatus::Completed).await;
        assert!(matches!(other, Err(AppError::NotFound(_))));

        let Ok(done) = f.svc.update_work_status(vic.id, work.id, TaskStatus::Completed).await else {
            panic!("update failed");
        };
        assert_eq!(done.task_status, TaskStatus::Completed);

        let Ok(listed) = f.svc.list_work(vic.id).await else {
            panic!("list failed");
        };
        let Some(view) = listed.first() else {
            panic!("expected an assignment");
        };
        assert_eq!(view.event_name.as_deref(), Some("Gala"));
    }

    #[tokio::test]
    async fn delete_removes_rows_and_then_is_not_found() {
        let f = Fixture::new();
        let vic = f.volunteer("Vic", "vic@x.com").await;
        let event = f.event("Gala").await;
        f.record(vic.id, event, "attended").await;

        let Ok(()) = f.svc.delete(vic.id).await else {
            panic!("delete failed");
        };
        assert_eq!(f.store.count_volunteer_attendance(vic.id, None).await, Ok(0));
        assert!(matches!(f.svc.delete(vic.id).await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn percent_rounds_half_up_and_handles_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 3), 33);
    }
}
