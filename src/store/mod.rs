//! Relational store: the typed query API every service talks to.
//!
//! [`Store`] exposes table-scoped insert / select / update / delete / count
//! operations over the application's tables. Calls are
//! independent; there are no multi-statement transactions, so a failure
//! between two calls leaves whatever the first call wrote.
//!
//! Two implementations ship:
//!
//! - [`postgres::PostgresStore`] backed by `sqlx::PgPool`.
//! - [`memory::MemoryStore`] kept in process memory, used by tests and by
//!   deployments with persistence disabled. It emulates the foreign-key
//!   rejection on participant deletion and the unique constraints on user
//!   and volunteer e-mail so both backends fail the same way.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AttendanceId, AttendanceRecord, AttendanceSnapshot, AttendanceStatus, AuditEntry,
    BlocklistEntry, Event, EventId, EventPatch, ImportSession, ImportSessionId, ImportStatus,
    NoShowId, NoShowRecord, Participant, ParticipantId, ParticipantPatch, Role, User, UserId,
    TaskStatus, UserStatus, Volunteer, VolunteerAttendance, VolunteerAttendanceStatus, VolunteerId,
    VolunteerPatch, VolunteerWork, VolunteerWorkId,
};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Failure reported by a [`Store`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A row could not be deleted because another row still references it.
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// An insert collided with a unique constraint.
    #[error("unique violation: {0}")]
    UniqueViolation(String),

    /// A delete was issued without any filter condition.
    #[error("refusing to delete from {0} without a filter")]
    UnscopedDelete(&'static str),

    /// A stored value could not be mapped back into a domain type.
    #[error("corrupt row in {table}: {message}")]
    CorruptRow {
        /// Table the row came from.
        table: &'static str,
        /// What failed to decode.
        message: String,
    },

    /// Any other backend failure, carrying the backend's message.
    #[error("{0}")]
    Backend(String),
}

/// Row selection for the `attendance` table. Unset fields do not filter.
///
/// An empty id list matches no rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    /// Restrict to one event.
    pub event_id: Option<EventId>,
    /// Restrict to these participants.
    pub participant_ids: Option<Vec<ParticipantId>>,
    /// Restrict to these rows.
    pub ids: Option<Vec<AttendanceId>>,
    /// Restrict to one status.
    pub status: Option<AttendanceStatus>,
    /// Restrict to rows inserted by one import.
    pub import_session_id: Option<ImportSessionId>,
}

impl AttendanceFilter {
    /// Every row of the table.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Rows of one event.
    #[must_use]
    pub fn for_event(event_id: EventId) -> Self {
        Self {
            event_id: Some(event_id),
            ..Self::default()
        }
    }

    /// Rows inserted by one import session.
    #[must_use]
    pub fn for_import(import_session_id: ImportSessionId) -> Self {
        Self {
            import_session_id: Some(import_session_id),
            ..Self::default()
        }
    }

    /// Further restricts to the given participants.
    #[must_use]
    pub fn participants(mut self, ids: &[ParticipantId]) -> Self {
        self.participant_ids = Some(ids.to_vec());
        self
    }

    /// Further restricts to the given rows.
    #[must_use]
    pub fn ids(mut self, ids: &[AttendanceId]) -> Self {
        self.ids = Some(ids.to_vec());
        self
    }

    /// Further restricts to one status.
    #[must_use]
    pub fn status(mut self, status: AttendanceStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns `true` when no condition is set.
    #[must_use]
    pub fn is_unscoped(&self) -> bool {
        self.event_id.is_none()
            && self.participant_ids.is_none()
            && self.ids.is_none()
            && self.status.is_none()
            && self.import_session_id.is_none()
    }

    /// In-memory evaluation of the filter.
    #[must_use]
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.event_id.is_none_or(|e| record.event_id == e)
            && self
                .participant_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&record.participant_id))
            && self.ids.as_ref().is_none_or(|ids| ids.contains(&record.id))
            && self.status.is_none_or(|s| record.status == s)
            && self
                .import_session_id
                .is_none_or(|s| record.import_session_id == Some(s))
    }
}

/// Row selection for the `no_shows` table. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoShowFilter {
    /// Restrict to one event.
    pub event_id: Option<EventId>,
    /// Restrict to these participants.
    pub participant_ids: Option<Vec<ParticipantId>>,
    /// Restrict to these rows.
    pub ids: Option<Vec<NoShowId>>,
}

impl NoShowFilter {
    /// Every row of the table.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Rows of one event.
    #[must_use]
    pub fn for_event(event_id: EventId) -> Self {
        Self {
            event_id: Some(event_id),
            ..Self::default()
        }
    }

    /// Further restricts to the given participants.
    #[must_use]
    pub fn participants(mut self, ids: &[ParticipantId]) -> Self {
        self.participant_ids = Some(ids.to_vec());
        self
    }

    /// Further restricts to the given rows.
    #[must_use]
    pub fn ids(mut self, ids: &[NoShowId]) -> Self {
        self.ids = Some(ids.to_vec());
        self
    }

    /// Returns `true` when no condition is set.
    #[must_use]
    pub fn is_unscoped(&self) -> bool {
        self.event_id.is_none() && self.participant_ids.is_none() && self.ids.is_none()
    }

    /// In-memory evaluation of the filter.
    #[must_use]
    pub fn matches(&self, record: &NoShowRecord) -> bool {
        self.event_id.is_none_or(|e| record.event_id == e)
            && self
                .participant_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&record.participant_id))
            && self.ids.as_ref().is_none_or(|ids| ids.contains(&record.id))
    }
}

/// Typed access to the application's tables.
///
/// Ordering contracts are part of each method's documentation; both
/// implementations honour them.
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    // ── participants ───────────────────────────────────────────────────

    /// Inserts participants and returns them as stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_participants(&self, rows: &[Participant]) -> Result<Vec<Participant>, StoreError>;

    /// Fetches one participant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError>;

    /// Lists participants, newest first, optionally including blocklisted ones.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_participants(&self, include_blocklisted: bool) -> Result<Vec<Participant>, StoreError>;

    /// Fetches the given participants ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn participants_by_ids(&self, ids: &[ParticipantId]) -> Result<Vec<Participant>, StoreError>;

    /// Fetches participants whose e-mail matches any of `emails`,
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn participants_by_emails(&self, emails: &[String]) -> Result<Vec<Participant>, StoreError>;

    /// Oldest participant with this e-mail (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn participant_by_email(&self, email: &str) -> Result<Option<Participant>, StoreError>;

    /// Oldest participant with exactly this name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn participant_by_name(&self, name: &str) -> Result<Option<Participant>, StoreError>;

    /// Participants created by one import session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn participants_by_import(
        &self,
        session: ImportSessionId,
    ) -> Result<Vec<Participant>, StoreError>;

    /// Applies a patch and returns the updated row, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn update_participant(
        &self,
        id: ParticipantId,
        patch: &ParticipantPatch,
    ) -> Result<Option<Participant>, StoreError>;

    /// Deletes the given participants and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ForeignKeyViolation`] if any of them is still
    /// referenced by attendance, no-show or blocklist rows; nothing is
    /// deleted in that case.
    async fn delete_participants(&self, ids: &[ParticipantId]) -> Result<u64, StoreError>;

    /// Counts participants, optionally by blocklist flag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn count_participants(&self, blocklisted: Option<bool>) -> Result<u64, StoreError>;

    // ── events ─────────────────────────────────────────────────────────

    /// Inserts an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_event(&self, event: &Event) -> Result<Event, StoreError>;

    /// Fetches one event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Lists events, latest date first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Applies a patch and returns the updated row, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn update_event(&self, id: EventId, patch: &EventPatch) -> Result<Option<Event>, StoreError>;

    /// Deletes one event with its volunteer attendance and work rows.
    /// Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError>;

    /// Counts events.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn count_events(&self) -> Result<u64, StoreError>;

    // ── attendance ─────────────────────────────────────────────────────

    /// Inserts attendance rows and returns them as stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_attendance(
        &self,
        rows: &[AttendanceRecord],
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Fetches one attendance row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_attendance(&self, id: AttendanceId) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Lists matching attendance rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Sets the status and `marked_at` of one row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn update_attendance_status(
        &self,
        id: AttendanceId,
        status: AttendanceStatus,
        marked_at: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Deletes matching attendance rows and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnscopedDelete`] for an empty filter.
    async fn delete_attendance(&self, filter: &AttendanceFilter) -> Result<u64, StoreError>;

    /// Counts matching attendance rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn count_attendance(&self, filter: &AttendanceFilter) -> Result<u64, StoreError>;

    // ── no-shows ───────────────────────────────────────────────────────

    /// Inserts no-show rows and returns them as stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_no_shows(&self, rows: &[NoShowRecord]) -> Result<Vec<NoShowRecord>, StoreError>;

    /// Fetches one no-show row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_no_show(&self, id: NoShowId) -> Result<Option<NoShowRecord>, StoreError>;

    /// Lists matching no-show rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_no_shows(&self, filter: &NoShowFilter) -> Result<Vec<NoShowRecord>, StoreError>;

    /// Deletes matching no-show rows and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnscopedDelete`] for an empty filter.
    async fn delete_no_shows(&self, filter: &NoShowFilter) -> Result<u64, StoreError>;

    /// Counts matching no-show rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn count_no_shows(&self, filter: &NoShowFilter) -> Result<u64, StoreError>;

    // ── blocklist ──────────────────────────────────────────────────────

    /// Inserts a blocklist entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_blocklist_entry(&self, entry: &BlocklistEntry) -> Result<BlocklistEntry, StoreError>;

    /// Lists blocklist entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_blocklist(&self) -> Result<Vec<BlocklistEntry>, StoreError>;

    /// Deletes entries for the given participants.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn delete_blocklist_entries(&self, participants: &[ParticipantId]) -> Result<u64, StoreError>;

    /// Counts blocklist entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn count_blocklist(&self) -> Result<u64, StoreError>;

    // ── import sessions, audit logs, snapshots ─────────────────────────

    /// Inserts an import session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_import_session(&self, session: &ImportSession) -> Result<ImportSession, StoreError>;

    /// Fetches one import session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_import_session(&self, id: ImportSessionId) -> Result<Option<ImportSession>, StoreError>;

    /// Sessions of one event created at or after `since`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_import_sessions(
        &self,
        event_id: EventId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ImportSession>, StoreError>;

    /// Sets a session's status. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn set_import_session_status(
        &self,
        id: ImportSessionId,
        status: ImportStatus,
    ) -> Result<bool, StoreError>;

    /// Appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Audit entries of one session, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_audit_entries(&self, session: ImportSessionId) -> Result<Vec<AuditEntry>, StoreError>;

    /// Inserts attendance snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_snapshots(&self, rows: &[AttendanceSnapshot]) -> Result<(), StoreError>;

    /// Snapshots captured by one session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_snapshots(
        &self,
        session: ImportSessionId,
    ) -> Result<Vec<AttendanceSnapshot>, StoreError>;

    /// Deletes the snapshots of one session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn delete_snapshots(&self, session: ImportSessionId) -> Result<u64, StoreError>;

    // ── users ──────────────────────────────────────────────────────────

    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if the e-mail is taken.
    async fn insert_user(&self, user: &User) -> Result<User, StoreError>;

    /// Fetches one user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Fetches a user by normalized e-mail.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Users with the given role and status, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_users(&self, role: Role, status: UserStatus) -> Result<Vec<User>, StoreError>;

    /// Marks a user approved by `approver` at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn approve_user(
        &self,
        id: UserId,
        approver: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    // ── volunteers ─────────────────────────────────────────────────────

    /// Inserts a volunteer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if the e-mail is taken.
    async fn insert_volunteer(&self, volunteer: &Volunteer) -> Result<Volunteer, StoreError>;

    /// Fetches one volunteer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_volunteer(&self, id: VolunteerId) -> Result<Option<Volunteer>, StoreError>;

    /// Finds a volunteer by exact (already normalized) e-mail.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn volunteer_by_email(&self, email: &str) -> Result<Option<Volunteer>, StoreError>;

    /// Lists volunteers by join date, newest first unless `oldest_first`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_volunteers(&self, oldest_first: bool) -> Result<Vec<Volunteer>, StoreError>;

    /// Applies a patch and returns the updated row, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if the new e-mail is taken.
    async fn update_volunteer(
        &self,
        id: VolunteerId,
        patch: &VolunteerPatch,
    ) -> Result<Option<Volunteer>, StoreError>;

    /// Deletes a volunteer together with their attendance and work rows.
    /// Returns `true` if the volunteer existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn delete_volunteer(&self, id: VolunteerId) -> Result<bool, StoreError>;

    /// Records a volunteer's turnout for an event. An existing row for the
    /// same (volunteer, event) keeps its id and takes the new status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn upsert_volunteer_attendance(
        &self,
        row: &VolunteerAttendance,
    ) -> Result<VolunteerAttendance, StoreError>;

    /// One page of a volunteer's attendance, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_volunteer_attendance(
        &self,
        volunteer: VolunteerId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<VolunteerAttendance>, StoreError>;

    /// Counts a volunteer's attendance rows, optionally by status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn count_volunteer_attendance(
        &self,
        volunteer: VolunteerId,
        status: Option<VolunteerAttendanceStatus>,
    ) -> Result<u64, StoreError>;

    /// Inserts a work assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn insert_volunteer_work(&self, work: &VolunteerWork) -> Result<VolunteerWork, StoreError>;

    /// Fetches one work assignment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn get_volunteer_work(&self, id: VolunteerWorkId) -> Result<Option<VolunteerWork>, StoreError>;

    /// Lists a volunteer's assignments, most recently assigned first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn list_volunteer_work(&self, volunteer: VolunteerId) -> Result<Vec<VolunteerWork>, StoreError>;

    /// Sets an assignment's status. Returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn update_volunteer_work_status(
        &self,
        id: VolunteerWorkId,
        status: TaskStatus,
    ) -> Result<Option<VolunteerWork>, StoreError>;

    /// Deletes one assignment. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    async fn delete_volunteer_work(&self, id: VolunteerWorkId) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttendanceRecord;

    #[test]
    fn empty_filters_are_unscoped() {
        assert!(AttendanceFilter::all().is_unscoped());
        assert!(NoShowFilter::all().is_unscoped());
        assert!(!AttendanceFilter::for_event(EventId::new()).is_unscoped());
    }

    #[test]
    fn empty_participant_list_matches_nothing() {
        let event = EventId::new();
        let record = AttendanceRecord::new(event, ParticipantId::new(), AttendanceStatus::Attended);
        assert!(AttendanceFilter::for_event(event).matches(&record));
        assert!(!AttendanceFilter::for_event(event).participants(&[]).matches(&record));
    }

    #[test]
    fn import_filter_requires_tag() {
        let session = ImportSessionId::new();
        let mut record =
            AttendanceRecord::new(EventId::new(), ParticipantId::new(), AttendanceStatus::Attended);
        assert!(!AttendanceFilter::for_import(session).matches(&record));
        record.import_session_id = Some(session);
        assert!(AttendanceFilter::for_import(session).matches(&record));
    }
}
