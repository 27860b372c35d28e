//! In-process [`Store`] backed by `RwLock`-guarded vectors.
//!
//! Mirrors the relational constraints the services rely on: a participant
//! still referenced by attendance, no-show or blocklist rows cannot be
//! deleted, user and volunteer e-mails are unique, and deleting an event
//! or a volunteer cascades to the volunteer attendance and work rows.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AttendanceFilter, NoShowFilter, Store, StoreError};
use crate::domain::participant::normalize_email;
use crate::domain::{
    AttendanceId, AttendanceRecord, AttendanceSnapshot, AttendanceStatus, AuditEntry,
    BlocklistEntry, Event, EventId, EventPatch, ImportSession, ImportSessionId, ImportStatus,
    NoShowId, NoShowRecord, Participant, ParticipantId, ParticipantPatch, Role, User, UserId,
    TaskStatus, UserStatus, Volunteer, VolunteerAttendance, VolunteerAttendanceStatus, VolunteerId,
    VolunteerPatch, VolunteerWork, VolunteerWorkId,
};

#[derive(Debug, Default)]
struct Tables {
    participants: Vec<Participant>,
    events: Vec<Event>,
    attendance: Vec<AttendanceRecord>,
    no_shows: Vec<NoShowRecord>,
    blocklist: Vec<BlocklistEntry>,
    import_sessions: Vec<ImportSession>,
    audit_logs: Vec<AuditEntry>,
    snapshots: Vec<AttendanceSnapshot>,
    users: Vec<User>,
    volunteers: Vec<Volunteer>,
    volunteer_attendance: Vec<VolunteerAttendance>,
    volunteer_work: Vec<VolunteerWork>,
}

impl Tables {
    fn is_referenced(&self, id: ParticipantId) -> bool {
        self.attendance.iter().any(|r| r.participant_id == id)
            || self.no_shows.iter().any(|r| r.participant_id == id)
            || self.blocklist.iter().any(|r| r.participant_id == id)
    }
}

/// Volatile store. Everything is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_participants(&self, rows: &[Participant]) -> Result<Vec<Participant>, StoreError> {
        let mut tables = self.tables.write().await;
        tables.participants.extend_from_slice(rows);
        Ok(rows.to_vec())
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.participants.iter().find(|p| p.id == id).cloned())
    }

    async fn list_participants(&self, include_blocklisted: bool) -> Result<Vec<Participant>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Participant> = tables
            .participants
            .iter()
            .filter(|p| include_blocklisted || !p.is_blocklisted)
            .cloned()
            .collect();
        newest_first(&mut rows, |p| p.created_at);
        Ok(rows)
    }

    async fn participants_by_ids(&self, ids: &[ParticipantId]) -> Result<Vec<Participant>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Participant> = tables
            .participants
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn participants_by_emails(&self, emails: &[String]) -> Result<Vec<Participant>, StoreError> {
        let wanted: HashSet<String> = emails.iter().map(|e| normalize_email(e)).collect();
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .iter()
            .filter(|p| wanted.contains(&normalize_email(&p.email)))
            .cloned()
            .collect())
    }

    async fn participant_by_email(&self, email: &str) -> Result<Option<Participant>, StoreError> {
        let wanted = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .iter()
            .filter(|p| normalize_email(&p.email) == wanted)
            .min_by_key(|p| p.created_at)
            .cloned())
    }

    async fn participant_by_name(&self, name: &str) -> Result<Option<Participant>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .iter()
            .filter(|p| p.name == name)
            .min_by_key(|p| p.created_at)
            .cloned())
    }

    async fn participants_by_import(
        &self,
        session: ImportSessionId,
    ) -> Result<Vec<Participant>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .iter()
            .filter(|p| p.import_session_id == Some(session))
            .cloned()
            .collect())
    }

    async fn update_participant(
        &self,
        id: ParticipantId,
        patch: &ParticipantPatch,
    ) -> Result<Option<Participant>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.participants.iter_mut().find(|p| p.id == id).map(|p| {
            patch.apply(p);
            p.clone()
        }))
    }

    async fn delete_participants(&self, ids: &[ParticipantId]) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(blocked) = ids.iter().find(|id| tables.is_referenced(**id)) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "participant {blocked} is still referenced"
            )));
        }
        let before = tables.participants.len();
        tables.participants.retain(|p| !ids.contains(&p.id));
        Ok(count(before - tables.participants.len()))
    }

    async fn count_participants(&self, blocklisted: Option<bool>) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(count(
            tables
                .participants
                .iter()
                .filter(|p| blocklisted.is_none_or(|b| p.is_blocklisted == b))
                .count(),
        ))
    }

    async fn insert_event(&self, event: &Event) -> Result<Event, StoreError> {
        self.tables.write().await.events.push(event.clone());
        Ok(event.clone())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows = tables.events.clone();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(rows)
    }

    async fn update_event(&self, id: EventId, patch: &EventPatch) -> Result<Option<Event>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.events.iter_mut().find(|e| e.id == id).map(|e| {
            patch.apply(e);
            e.clone()
        }))
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.attendance.iter().any(|r| r.event_id == id)
            || tables.no_shows.iter().any(|r| r.event_id == id)
        {
            return Err(StoreError::ForeignKeyViolation(format!(
                "event {id} is still referenced"
            )));
        }
        let before = tables.events.len();
        tables.events.retain(|e| e.id != id);
        let existed = tables.events.len() < before;
        if existed {
            tables.volunteer_attendance.retain(|r| r.event_id != id);
            tables.volunteer_work.retain(|w| w.event_id != id);
        }
        Ok(existed)
    }

    async fn count_events(&self) -> Result<u64, StoreError> {
        Ok(count(self.tables.read().await.events.len()))
    }

    async fn insert_attendance(
        &self,
        rows: &[AttendanceRecord],
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.tables.write().await.attendance.extend_from_slice(rows);
        Ok(rows.to_vec())
    }

    async fn get_attendance(&self, id: AttendanceId) -> Result<Option<AttendanceRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.attendance.iter().find(|r| r.id == id).cloned())
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<AttendanceRecord> = tables
            .attendance
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut rows, |r| r.created_at);
        Ok(rows)
    }

    async fn update_attendance_status(
        &self,
        id: AttendanceId,
        status: AttendanceStatus,
        marked_at: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.attendance.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status;
            r.marked_at = marked_at;
            r.clone()
        }))
    }

    async fn delete_attendance(&self, filter: &AttendanceFilter) -> Result<u64, StoreError> {
        if filter.is_unscoped() {
            return Err(StoreError::UnscopedDelete("attendance"));
        }
        let mut tables = self.tables.write().await;
        let before = tables.attendance.len();
        tables.attendance.retain(|r| !filter.matches(r));
        Ok(count(before - tables.attendance.len()))
    }

    async fn count_attendance(&self, filter: &AttendanceFilter) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(count(tables.attendance.iter().filter(|r| filter.matches(r)).count()))
    }

    async fn insert_no_shows(&self, rows: &[NoShowRecord]) -> Result<Vec<NoShowRecord>, StoreError> {
        self.tables.write().await.no_shows.extend_from_slice(rows);
        Ok(rows.to_vec())
    }

    async fn get_no_show(&self, id: NoShowId) -> Result<Option<NoShowRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.no_shows.iter().find(|r| r.id == id).cloned())
    }

    async fn list_no_shows(&self, filter: &NoShowFilter) -> Result<Vec<NoShowRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<NoShowRecord> = tables
            .no_shows
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut rows, |r| r.created_at);
        Ok(rows)
    }

    async fn delete_no_shows(&self, filter: &NoShowFilter) -> Result<u64, StoreError> {
        if filter.is_unscoped() {
            return Err(StoreError::UnscopedDelete("no_shows"));
        }
        let mut tables = self.tables.write().await;
        let before = tables.no_shows.len();
        tables.no_shows.retain(|r| !filter.matches(r));
        Ok(count(before - tables.no_shows.len()))
    }

    async fn count_no_shows(&self, filter: &NoShowFilter) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(count(tables.no_shows.iter().filter(|r| filter.matches(r)).count()))
    }

    async fn insert_blocklist_entry(&self, entry: &BlocklistEntry) -> Result<BlocklistEntry, StoreError> {
        self.tables.write().await.blocklist.push(entry.clone());
        Ok(entry.clone())
    }

    async fn list_blocklist(&self) -> Result<Vec<BlocklistEntry>, StoreError> {
        let mut rows = self.tables.read().await.blocklist.clone();
        newest_first(&mut rows, |r| r.created_at);
        Ok(rows)
    }

    async fn delete_blocklist_entries(&self, participants: &[ParticipantId]) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.blocklist.len();
        tables.blocklist.retain(|r| !participants.contains(&r.participant_id));
        Ok(count(before - tables.blocklist.len()))
    }

    async fn count_blocklist(&self) -> Result<u64, StoreError> {
        Ok(count(self.tables.read().await.blocklist.len()))
    }

    async fn insert_import_session(&self, session: &ImportSession) -> Result<ImportSession, StoreError> {
        self.tables.write().await.import_sessions.push(session.clone());
        Ok(session.clone())
    }

    async fn get_import_session(&self, id: ImportSessionId) -> Result<Option<ImportSession>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.import_sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_import_sessions(
        &self,
        event_id: EventId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ImportSession>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ImportSession> = tables
            .import_sessions
            .iter()
            .filter(|s| s.event_id == event_id && s.created_at >= since)
            .cloned()
            .collect();
        newest_first(&mut rows, |s| s.created_at);
        Ok(rows)
    }

    async fn set_import_session_status(
        &self,
        id: ImportSessionId,
        status: ImportStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .import_sessions
            .iter_mut()
            .find(|s| s.id == id)
            .map(|s| s.status = status)
            .is_some())
    }

    async fn insert_audit_entry(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.tables.write().await.audit_logs.push(entry.clone());
        Ok(())
    }

    async fn list_audit_entries(&self, session: ImportSessionId) -> Result<Vec<AuditEntry>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<AuditEntry> = tables
            .audit_logs
            .iter()
            .filter(|e| e.import_session_id == session)
            .cloned()
            .collect();
        newest_first(&mut rows, |e| e.created_at);
        Ok(rows)
    }

    async fn insert_snapshots(&self, rows: &[AttendanceSnapshot]) -> Result<(), StoreError> {
        self.tables.write().await.snapshots.extend_from_slice(rows);
        Ok(())
    }

    async fn list_snapshots(
        &self,
        session: ImportSessionId,
    ) -> Result<Vec<AttendanceSnapshot>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<AttendanceSnapshot> = tables
            .snapshots
            .iter()
            .filter(|s| s.import_session_id == session)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }

    async fn delete_snapshots(&self, session: ImportSessionId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.snapshots.len();
        tables.snapshots.retain(|s| s.import_session_id != session);
        Ok(count(before - tables.snapshots.len()))
    }

    async fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation(format!(
                "email {} already registered",
                user.email
            )));
        }
        tables.users.push(user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, role: Role, status: UserStatus) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<User> = tables
            .users
            .iter()
            .filter(|u| u.role == role && u.status == status)
            .cloned()
            .collect();
        rows.sort_by_key(|u| u.created_at);
        Ok(rows)
    }

    async fn approve_user(
        &self,
        id: UserId,
        approver: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.status = UserStatus::Approved;
            u.approved_at = Some(at);
            u.approved_by = Some(approver);
            u.updated_at = at;
            u.clone()
        }))
    }

    async fn insert_volunteer(&self, volunteer: &Volunteer) -> Result<Volunteer, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.volunteers.iter().any(|v| v.email == volunteer.email) {
            return Err(StoreError::UniqueViolation(format!(
                "volunteer email {} already registered",
                volunteer.email
            )));
        }
        tables.volunteers.push(volunteer.clone());
        Ok(volunteer.clone())
    }

    async fn get_volunteer(&self, id: VolunteerId) -> Result<Option<Volunteer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.volunteers.iter().find(|v| v.id == id).cloned())
    }

    async fn volunteer_by_email(&self, email: &str) -> Result<Option<Volunteer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.volunteers.iter().find(|v| v.email == email).cloned())
    }

    async fn list_volunteers(&self, oldest_first: bool) -> Result<Vec<Volunteer>, StoreError> {
        let mut rows = self.tables.read().await.volunteers.clone();
        if oldest_first {
            rows.sort_by_key(|v| v.joined_date);
        } else {
            newest_first(&mut rows, |v| v.joined_date);
        }
        Ok(rows)
    }

    async fn update_volunteer(
        &self,
        id: VolunteerId,
        patch: &VolunteerPatch,
    ) -> Result<Option<Volunteer>, StoreError> {
        let mut tables = self.tables.write().await;
        let taken = patch
            .email
            .as_ref()
            .filter(|email| tables.volunteers.iter().any(|v| v.id != id && &v.email == *email));
        if let Some(email) = taken {
            return Err(StoreError::UniqueViolation(format!(
                "volunteer email {email} already registered"
            )));
        }
        Ok(tables.volunteers.iter_mut().find(|v| v.id == id).map(|v| {
            patch.apply(v);
            v.clone()
        }))
    }

    async fn delete_volunteer(&self, id: VolunteerId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.volunteers.len();
        tables.volunteers.retain(|v| v.id != id);
        let existed = tables.volunteers.len() < before;
        if existed {
            tables.volunteer_attendance.retain(|r| r.volunteer_id != id);
            tables.volunteer_work.retain(|w| w.volunteer_id != id);
        }
        Ok(existed)
    }

    async fn upsert_volunteer_attendance(
        &self,
        row: &VolunteerAttendance,
    ) -> Result<VolunteerAttendance, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .volunteer_attendance
            .iter_mut()
            .find(|r| r.volunteer_id == row.volunteer_id && r.event_id == row.event_id)
        {
            existing.attendance_status = row.attendance_status;
            return Ok(existing.clone());
        }
        tables.volunteer_attendance.push(row.clone());
        Ok(row.clone())
    }

    async fn list_volunteer_attendance(
        &self,
        volunteer: VolunteerId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<VolunteerAttendance>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<VolunteerAttendance> = tables
            .volunteer_attendance
            .iter()
            .filter(|r| r.volunteer_id == volunteer)
            .cloned()
            .collect();
        newest_first(&mut rows, |r| r.created_at);
        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_volunteer_attendance(
        &self,
        volunteer: VolunteerId,
        status: Option<VolunteerAttendanceStatus>,
    ) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(count(
            tables
                .volunteer_attendance
                .iter()
                .filter(|r| r.volunteer_id == volunteer)
                .filter(|r| status.is_none_or(|s| r.attendance_status == s))
                .count(),
        ))
    }

    async fn insert_volunteer_work(&self, work: &VolunteerWork) -> Result<VolunteerWork, StoreError> {
        self.tables.write().await.volunteer_work.push(work.clone());
        Ok(work.clone())
    }

    async fn get_volunteer_work(&self, id: VolunteerWorkId) -> Result<Option<VolunteerWork>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.volunteer_work.iter().find(|w| w.id == id).cloned())
    }

    async fn list_volunteer_work(&self, volunteer: VolunteerId) -> Result<Vec<VolunteerWork>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<VolunteerWork> = tables
            .volunteer_work
            .iter()
            .filter(|w| w.volunteer_id == volunteer)
            .cloned()
            .collect();
        newest_first(&mut rows, |w| w.assigned_at);
        Ok(rows)
    }

    async fn update_volunteer_work_status(
        &self,
        id: VolunteerWorkId,
        status: TaskStatus,
    ) -> Result<Option<VolunteerWork>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.volunteer_work.iter_mut().find(|w| w.id == id).map(|w| {
            w.task_status = status;
            w.clone()
        }))
    }

    async fn delete_volunteer_work(&self, id: VolunteerWorkId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.volunteer_work.len();
        tables.volunteer_work.retain(|w| w.id != id);
        Ok(tables.volunteer_work.len() < before)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Participant;

    #[tokio::test]
    async fn referenced_participant_cannot_be_deleted() {
        let store = MemoryStore::new();
        let participant = Participant::new("Ann", "ann@x.com");
        let event = EventId::new();
        let Ok(_) = store.insert_participants(std::slice::from_ref(&participant)).await else {
            panic!("insert failed");
        };
        let record = AttendanceRecord::new(event, participant.id, AttendanceStatus::Attended);
        let Ok(_) = store.insert_attendance(&[record]).await else {
            panic!("insert failed");
        };

        let result = store.delete_participants(&[participant.id]).await;
        assert!(matches!(result, Err(StoreError::ForeignKeyViolation(_))));

        let Ok(removed) = store.delete_attendance(&AttendanceFilter::for_event(event)).await else {
            panic!("delete failed");
        };
        assert_eq!(removed, 1);
        assert_eq!(store.delete_participants(&[participant.id]).await, Ok(1));
    }

    #[tokio::test]
    async fn unscoped_delete_is_refused() {
        let store = MemoryStore::new();
        let result = store.delete_attendance(&AttendanceFilter::all()).await;
        assert_eq!(result, Err(StoreError::UnscopedDelete("attendance")));
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        let Ok(_) = store
            .insert_participants(&[Participant::new("Ann", "ann@x.com")])
            .await
        else {
            panic!("insert failed");
        };
        let Ok(found) = store.participants_by_emails(&["ANN@x.com".to_string()]).await else {
            panic!("lookup failed");
        };
        assert_eq!(found.len(), 1);
        let Ok(Some(one)) = store.participant_by_email(" Ann@X.com").await else {
            panic!("lookup failed");
        };
        assert_eq!(one.name, "Ann");
    }

    #[tokio::test]
    async fn list_hides_blocklisted_unless_asked() {
        let store = MemoryStore::new();
        let mut blocked = Participant::new("Bo", "bo@x.com");
        blocked.is_blocklisted = true;
        let Ok(_) = store
            .insert_participants(&[Participant::new("Ann", "ann@x.com"), blocked])
            .await
        else {
            panic!("insert failed");
        };
        let Ok(visible) = store.list_participants(false).await else {
            panic!("list failed");
        };
        let Ok(all) = store.list_participants(true).await else {
            panic!("list failed");
        };
        assert_eq!(visible.len(), 1);
        assert_eq!(all.len(), 2);
        assert_eq!(store.count_participants(Some(true)).await, Ok(1));
    }

    #[tokio::test]
    async fn deleting_event_drops_volunteer_rows() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: "Gala".to_string(),
            date: now.date_naive(),
            location: None,
            description: None,
            created_at: now,
            updated_at: now,
        };
        let volunteer = Volunteer::new("Vic", "vic@x.com");
        let Ok(_) = store.insert_event(&event).await else {
            panic!("insert failed");
        };
        let Ok(_) = store.insert_volunteer(&volunteer).await else {
            panic!("insert failed");
        };
        let row = VolunteerAttendance::new(volunteer.id, event.id, VolunteerAttendanceStatus::Attended);
        let Ok(_) = store.upsert_volunteer_attendance(&row).await else {
            panic!("upsert failed");
        };
        let work = VolunteerWork::new(volunteer.id, event.id, "Doors", TaskStatus::Assigned);
        let Ok(_) = store.insert_volunteer_work(&work).await else {
            panic!("insert failed");
        };

        assert_eq!(store.delete_event(event.id).await, Ok(true));
        assert_eq!(store.count_volunteer_attendance(volunteer.id, None).await, Ok(0));
        assert_eq!(store.get_volunteer_work(work.id).await, Ok(None));
        assert!(matches!(store.get_volunteer(volunteer.id).await, Ok(Some(_))));
    }

    #[tokio::test]
    async fn volunteer_attendance_upserts_per_event() {
        let store = MemoryStore::new();
        let volunteer = VolunteerId::new();
        let event = EventId::new();
        let first = VolunteerAttendance::new(volunteer, event, VolunteerAttendanceStatus::NoShow);
        let Ok(_) = store.upsert_volunteer_attendance(&first).await else {
            panic!("upsert failed");
        };
        let second = VolunteerAttendance::new(volunteer, event, VolunteerAttendanceStatus::Attended);
        let Ok(stored) = store.upsert_volunteer_attendance(&second).await else {
            panic!("upsert failed");
        };
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.attendance_status, VolunteerAttendanceStatus::Attended);
        assert_eq!(store.count_volunteer_attendance(volunteer, None).await, Ok(1));
        assert_eq!(
            store
                .count_volunteer_attendance(volunteer, Some(VolunteerAttendanceStatus::NoShow))
                .await,
            Ok(0)
        );
    }

    #[tokio::test]
    async fn duplicate_volunteer_email_is_rejected() {
        let store = MemoryStore::new();
        let Ok(_) = store.insert_volunteer(&Volunteer::new("Vic", "vic@x.com")).await else {
            panic!("insert failed");
        };
        let result = store.insert_volunteer(&Volunteer::new("Val", "vic@x.com")).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
    }
}
