//! Event roster: per-event views, deletes with backup, and undo.
//!
//! Every delete captures the rows it removes into a [`DeleteBackup`] stored
//! under the event id, then returns the backup's undo token. Presenting the
//! token to [`RosterService::undo_delete`] puts the rows back. Participants
//! are global, so a restore first finds each captured participant again (by
//! id, e-mail or name) and recreates it only when nothing matches.
//!
//! None of this is transactional. A failure half way through a delete
//! leaves the backup stored and the rows partly removed; a failure half way
//! through an undo leaves the backup consumed and the rows partly restored.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::participant::{normalize_email, placeholder_email};
use crate::domain::{
    AttendanceId, AttendanceRecord, AttendanceStatus, BackupKind, BackupRecord, BackupStore,
    DeleteBackup, EventId, NoShowRecord, Participant, ParticipantId,
};
use crate::error::AppError;
use crate::store::{AttendanceFilter, NoShowFilter, Store, StoreError};

/// Participant of an event, as listed on the event page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EventParticipant {
    /// Participant id.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// E-mail.
    pub email: String,
    /// Blocklist flag.
    pub is_blocklisted: bool,
}

/// Attendance row of an event, flattened with participant details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EventAttendance {
    /// Attendance row id.
    pub id: AttendanceId,
    /// Participant id.
    pub participant_id: ParticipantId,
    /// Present or absent.
    pub status: AttendanceStatus,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Participant name, if the participant still exists.
    pub name: Option<String>,
    /// Participant e-mail, if the participant still exists.
    pub email: Option<String>,
    /// Participant blocklist flag, if the participant still exists.
    pub is_blocklisted: Option<bool>,
}

/// Result of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeleteOutcome {
    /// Participants removed from the event, or attendance rows removed.
    pub deleted: u64,
    /// Single-use token for [`RosterService::undo_delete`].
    pub undo_token: String,
}

/// Result of an undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct UndoOutcome {
    /// Rows actually inserted.
    pub restored: u64,
}

/// Roster operations for one event at a time.
#[derive(Debug, Clone)]
pub struct RosterService {
    store: Arc<dyn Store>,
    backups: Arc<dyn BackupStore>,
}

impl RosterService {
    /// Creates a new `RosterService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, backups: Arc<dyn BackupStore>) -> Self {
        Self { store, backups }
    }

    async fn require_event(&self, event_id: EventId) -> Result<(), AppError> {
        match self.store.get_event(event_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("Event")),
        }
    }

    /// Participants with attendance or no-show rows in the event, by name.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the event does not exist.
    pub async fn participants(&self, event_id: EventId) -> Result<Vec<EventParticipant>, AppError> {
        self.require_event(event_id).await?;
        let attendance_filter = AttendanceFilter::for_event(event_id);
        let no_show_filter = NoShowFilter::for_event(event_id);
        let (attendance, no_shows) = tokio::try_join!(
            self.store.list_attendance(&attendance_filter),
            self.store.list_no_shows(&no_show_filter),
        )?;

        let ids = distinct(
            attendance
                .iter()
                .map(|r| r.participant_id)
                .chain(no_shows.iter().map(|r| r.participant_id)),
        );
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let participants = self.store.participants_by_ids(&ids).await?;
        Ok(participants
            .into_iter()
            .map(|p| EventParticipant {
                id: p.id,
                name: p.name,
                email: p.email,
                is_blocklisted: p.is_blocklisted,
            })
            .collect())
    }

    /// Attendance rows of the event, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the event does not exist.
    pub async fn attendance(&self, event_id: EventId) -> Result<Vec<EventAttendance>, AppError> {
        self.require_event(event_id).await?;
        let rows = self
            .store
            .list_attendance(&AttendanceFilter::for_event(event_id))
            .await?;
        let participants = self.participant_map(rows.iter().map(|r| r.participant_id)).await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let participant = participants.get(&r.participant_id);
                EventAttendance {
                    id: r.id,
                    participant_id: r.participant_id,
                    status: r.status,
                    created_at: r.created_at,
                    name: participant.map(|p| p.name.clone()),
                    email: participant.map(|p| p.email.clone()),
                    is_blocklisted: participant.map(|p| p.is_blocklisted),
                }
            })
            .collect())
    }

    async fn participant_map(
        &self,
        ids: impl Iterator<Item = ParticipantId>,
    ) -> Result<HashMap<ParticipantId, Participant>, AppError> {
        let ids = distinct(ids);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .store
            .participants_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect())
    }

    /// Removes every participant from the event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the event does not exist.
    pub async fn delete_all_participants(&self, event_id: EventId) -> Result<DeleteOutcome, AppError> {
        self.delete_participants(event_id, None).await
    }

    /// Removes the selected participants from the event. Ids with no rows
    /// in this event are ignored and not counted.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] for an empty selection.
    /// - [`AppError::NotFound`] if the event does not exist.
    pub async fn delete_selected_participants(
        &self,
        event_id: EventId,
        participant_ids: &[ParticipantId],
    ) -> Result<DeleteOutcome, AppError> {
        if participant_ids.is_empty() {
            return Err(AppError::InvalidRequest(
                "participant_ids must be a non-empty array".to_string(),
            ));
        }
        self.delete_participants(event_id, Some(participant_ids)).await
    }

    async fn delete_participants(
        &self,
        event_id: EventId,
        selection: Option<&[ParticipantId]>,
    ) -> Result<DeleteOutcome, AppError> {
        self.require_event(event_id).await?;

        let mut attendance_filter = AttendanceFilter::for_event(event_id);
        let mut no_show_filter = NoShowFilter::for_event(event_id);
        if let Some(ids) = selection {
            attendance_filter = attendance_filter.participants(ids);
            no_show_filter = no_show_filter.participants(ids);
        }
        let (attendance, no_shows) = tokio::try_join!(
            self.store.list_attendance(&attendance_filter),
            self.store.list_no_shows(&no_show_filter),
        )?;

        let affected = distinct(
            attendance
                .iter()
                .map(|r| r.participant_id)
                .chain(no_shows.iter().map(|r| r.participant_id)),
        );
        let participants = self.participant_map(affected.iter().copied()).await?;
        let records = capture(&attendance, &no_shows, &participants);

        let backup = DeleteBackup::new(
            BackupKind::Participant,
            participants.into_values().collect(),
            records,
        );
        let undo_token = backup.undo_token.clone();
        self.backups.put(event_id, backup).await;

        let removed_attendance = self.store.delete_attendance(&attendance_filter).await?;
        let removed_no_shows = self.store.delete_no_shows(&no_show_filter).await?;
        let purged = self.purge_unreferenced(&affected).await?;

        tracing::info!(
            %event_id,
            participants = affected.len(),
            removed_attendance,
            removed_no_shows,
            purged,
            "event participants deleted"
        );
        Ok(DeleteOutcome {
            deleted: u64::try_from(affected.len()).unwrap_or(u64::MAX),
            undo_token,
        })
    }

    /// Physically deletes each participant that no other row references.
    /// A foreign-key rejection means the participant is still in use
    /// elsewhere and is kept.
    async fn purge_unreferenced(&self, ids: &[ParticipantId]) -> Result<u64, AppError> {
        let mut purged = 0;
        for id in ids {
            match self.store.delete_participants(std::slice::from_ref(id)).await {
                Ok(n) => purged += n,
                Err(StoreError::ForeignKeyViolation(_)) => {
                    tracing::debug!(participant_id = %id, "participant still referenced, kept");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(purged)
    }

    /// Removes every attendance row of the event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the event does not exist.
    pub async fn delete_all_attendance(&self, event_id: EventId) -> Result<DeleteOutcome, AppError> {
        self.delete_attendance(event_id, None).await
    }

    /// Removes the selected attendance rows of the event. Ids of rows in
    /// other events are ignored.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] for an empty selection.
    /// - [`AppError::NotFound`] if the event does not exist.
    pub async fn delete_selected_attendance(
        &self,
        event_id: EventId,
        attendance_ids: &[AttendanceId],
    ) -> Result<DeleteOutcome, AppError> {
        if attendance_ids.is_empty() {
            return Err(AppError::InvalidRequest(
                "attendance_ids must be a non-empty array".to_string(),
            ));
        }
        self.delete_attendance(event_id, Some(attendance_ids)).await
    }

    async fn delete_attendance(
        &self,
        event_id: EventId,
        selection: Option<&[AttendanceId]>,
    ) -> Result<DeleteOutcome, AppError> {
        self.require_event(event_id).await?;

        let mut filter = AttendanceFilter::for_event(event_id);
        if let Some(ids) = selection {
            filter = filter.ids(ids);
        }
        let rows = self.store.list_attendance(&filter).await?;
        let participants = self.participant_map(rows.iter().map(|r| r.participant_id)).await?;
        let records = capture(&rows, &[], &participants);

        let backup = DeleteBackup::new(
            BackupKind::Attendance,
            participants.into_values().collect(),
            records,
        );
        let undo_token = backup.undo_token.clone();
        self.backups.put(event_id, backup).await;

        let deleted = self.store.delete_attendance(&filter).await?;
        tracing::info!(%event_id, deleted, "event attendance deleted");
        Ok(DeleteOutcome {
            deleted,
            undo_token,
        })
    }

    /// Restores the rows captured by the event's latest delete.
    ///
    /// The backup is consumed before anything is written, so a failure part
    /// way leaves it used. Rows whose (event, participant) pair already
    /// exists in the target table are skipped and not counted.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the event no longer exists. The backup
    ///   is left untouched.
    /// - [`AppError::UndoUnavailable`] when there is no matching, unused,
    ///   unexpired backup for `token`.
    /// - [`AppError::Store`] if a restore step fails.
    pub async fn undo_delete(
        &self,
        event_id: EventId,
        kind: BackupKind,
        token: &str,
    ) -> Result<UndoOutcome, AppError> {
        self.require_event(event_id).await?;
        let backup = self.backups.consume(event_id, kind, token).await?;
        let mut resolver = Resolver::new(self.store.as_ref(), &backup.participants);

        if kind == BackupKind::Participant {
            for participant in &backup.participants {
                resolver.resolve_captured(participant).await?;
            }
        }

        let attendance_filter = AttendanceFilter::for_event(event_id);
        let no_show_filter = NoShowFilter::for_event(event_id);
        let (attendance, no_shows) = tokio::try_join!(
            self.store.list_attendance(&attendance_filter),
            self.store.list_no_shows(&no_show_filter),
        )?;
        let mut attended: HashSet<ParticipantId> =
            attendance.iter().map(|r| r.participant_id).collect();
        let mut absent: HashSet<ParticipantId> =
            no_shows.iter().map(|r| r.participant_id).collect();

        let mut restored = 0;
        for record in &backup.records {
            let participant_id = resolver.resolve_record(record).await?;
            match record.status {
                AttendanceStatus::Attended => {
                    if !attended.insert(participant_id) {
                        continue;
                    }
                    let row = AttendanceRecord {
                        marked_at: record.marked_at,
                        created_at: record.created_at,
                        ..AttendanceRecord::new(event_id, participant_id, record.status)
                    };
                    self.store.insert_attendance(&[row]).await?;
                }
                AttendanceStatus::NotAttended => {
                    if !absent.insert(participant_id) {
                        continue;
                    }
                    let row = NoShowRecord {
                        created_at: record.created_at,
                        ..NoShowRecord::new(event_id, participant_id)
                    };
                    self.store.insert_no_shows(&[row]).await?;
                }
            }
            restored += 1;
        }

        tracing::info!(
            %event_id,
            kind = kind.as_str(),
            restored,
            recreated = resolver.recreated,
            "delete undone"
        );
        Ok(UndoOutcome { restored })
    }
}

fn distinct(ids: impl Iterator<Item = ParticipantId>) -> Vec<ParticipantId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

fn capture(
    attendance: &[AttendanceRecord],
    no_shows: &[NoShowRecord],
    participants: &HashMap<ParticipantId, Participant>,
) -> Vec<BackupRecord> {
    let record = |participant_id: ParticipantId,
                  status: AttendanceStatus,
                  marked_at: DateTime<Utc>,
                  created_at: DateTime<Utc>| {
        let participant = participants.get(&participant_id);
        BackupRecord {
            participant_id,
            name: participant.map_or_else(|| "Unknown".to_string(), |p| p.name.clone()),
            email: participant.map(|p| p.email.clone()).unwrap_or_default(),
            status,
            marked_at,
            created_at,
        }
    };

    attendance
        .iter()
        .map(|r| record(r.participant_id, r.status, r.marked_at, r.created_at))
        .chain(no_shows.iter().map(|r| {
            record(
                r.participant_id,
                AttendanceStatus::NotAttended,
                r.created_at,
                r.created_at,
            )
        }))
        .collect()
}

/// Maps captured participant ids to participants that exist now.
struct Resolver<'a> {
    store: &'a dyn Store,
    captured: HashMap<ParticipantId, &'a Participant>,
    mapped: HashMap<ParticipantId, ParticipantId>,
    recreated: u64,
}

impl<'a> Resolver<'a> {
    fn new(store: &'a dyn Store, captured: &'a [Participant]) -> Self {
        Self {
            store,
            captured: captured.iter().map(|p| (p.id, p)).collect(),
            mapped: HashMap::new(),
            recreated: 0,
        }
    }

    async fn by_email_or_name(&self, email: &str, name: &str) -> Result<Option<Participant>, AppError> {
        let email = normalize_email(email);
        if !email.is_empty() {
            if let Some(found) = self.store.participant_by_email(&email).await? {
                return Ok(Some(found));
            }
        }
        let name = name.trim();
        if !name.is_empty() {
            if let Some(found) = self.store.participant_by_name(name).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn recreate(&mut self, template: Participant) -> Result<ParticipantId, AppError> {
        let created = self.store.insert_participants(&[template]).await?;
        let id = created
            .first()
            .map(|p| p.id)
            .ok_or_else(|| AppError::Internal("participant insert returned no row".to_string()))?;
        self.recreated += 1;
        Ok(id)
    }

    /// Finds a captured participant by e-mail, then name, else recreates it
    /// with its blocklist state.
    async fn resolve_captured(&mut self, captured: &Participant) -> Result<ParticipantId, AppError> {
        if let Some(&id) = self.mapped.get(&captured.id) {
            return Ok(id);
        }
        let id = match self.by_email_or_name(&captured.email, &captured.name).await? {
            Some(found) => found.id,
            None => {
                let mut template = Participant::new(captured.name.clone(), email_or_placeholder(&captured.email));
                template.phone.clone_from(&captured.phone);
                template.is_blocklisted = captured.is_blocklisted;
                template.blocklist_reason.clone_from(&captured.blocklist_reason);
                self.recreate(template).await?
            }
        };
        self.mapped.insert(captured.id, id);
        Ok(id)
    }

    /// Finds the participant of a captured row by id, then e-mail, then
    /// name, else recreates it.
    async fn resolve_record(&mut self, record: &BackupRecord) -> Result<ParticipantId, AppError> {
        if let Some(&id) = self.mapped.get(&record.participant_id) {
            return Ok(id);
        }
        let id = if self.store.get_participant(record.participant_id).await?.is_some() {
            record.participant_id
        } else if let Some(&captured) = self.captured.get(&record.participant_id) {
            return self.resolve_captured(captured).await;
        } else if let Some(found) = self.by_email_or_name(&record.email, &record.name).await? {
            found.id
        } else {
            self.recreate(Participant::new(record.name.clone(), email_or_placeholder(&record.email)))
                .await?
        };
        self.mapped.insert(record.participant_id, id);
        Ok(id)
    }
}

fn email_or_placeholder(email: &str) -> String {
    let email = normalize_email(email);
    if email.is_empty() {
        placeholder_email("restored")
    } else {
        email
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{Event, MemoryBackupStore, UndoRejection};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        backups: Arc<MemoryBackupStore>,
        roster: RosterService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let backups = Arc::new(MemoryBackupStore::new());
        let roster = RosterService::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&backups) as Arc<dyn BackupStore>,
        );
        Fixture {
            store,
            backups,
            roster,
        }
    }

    impl Fixture {
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
                panic!("seed failed");
            };
            event.id
        }

        async fn participant(&self, name: &str, email: &str) -> ParticipantId {
            let participant = Participant::new(name, email);
            let Ok(_) = self.store.insert_participants(std::slice::from_ref(&participant)).await else {
                panic!("seed failed");
            };
            participant.id
        }

        async fn attend(&self, event: EventId, participant: ParticipantId, status: AttendanceStatus) -> AttendanceId {
            let row = AttendanceRecord::new(event, participant, status);
            let Ok(_) = self.store.insert_attendance(std::slice::from_ref(&row)).await else {
                panic!("seed failed");
            };
            row.id
        }

        async fn no_show(&self, event: EventId, participant: ParticipantId) {
            let Ok(_) = self.store.insert_no_shows(&[NoShowRecord::new(event, participant)]).await else {
                panic!("seed failed");
            };
        }

        async fn rows(&self, event: EventId) -> (u64, u64) {
            let (Ok(a), Ok(n)) = (
                self.store.count_attendance(&AttendanceFilter::for_event(event)).await,
                self.store.count_no_shows(&NoShowFilter::for_event(event)).await,
            ) else {
                panic!("count failed");
            };
            (a, n)
        }
    }

    #[tokio::test]
    async fn delete_all_then_undo_restores_every_row() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        let bob = f.participant("Bob", "bob@x.com").await;
        f.attend(event, ann, AttendanceStatus::Attended).await;
        f.attend(event, bob, AttendanceStatus::Attended).await;
        f.no_show(event, ann).await;

        let Ok(outcome) = f.roster.delete_all_participants(event).await else {
            panic!("delete failed");
        };
        assert_eq!(outcome.deleted, 2);
        assert_eq!(f.rows(event).await, (0, 0));
        assert_eq!(f.store.count_participants(None).await, Ok(0));

        let Ok(undo) = f
            .roster
            .undo_delete(event, BackupKind::Participant, &outcome.undo_token)
            .await
        else {
            panic!("undo failed");
        };
        assert_eq!(undo.restored, 3);
        assert_eq!(f.rows(event).await, (2, 1));
        assert_eq!(f.store.count_participants(None).await, Ok(2));
    }

    #[tokio::test]
    async fn second_undo_with_same_token_fails() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        f.attend(event, ann, AttendanceStatus::Attended).await;

        let Ok(outcome) = f.roster.delete_all_participants(event).await else {
            panic!("delete failed");
        };
        tokio_test::assert_ok!(
            f.roster
                .undo_delete(event, BackupKind::Participant, &outcome.undo_token)
                .await
        );
        let second = f
            .roster
            .undo_delete(event, BackupKind::Participant, &outcome.undo_token)
            .await;
        let Err(err) = second else {
            panic!("second undo should fail");
        };
        assert!(matches!(err, AppError::UndoUnavailable(UndoRejection::AlreadyUsed)));
        assert!(err.to_string().starts_with("no undo available"));
    }

    #[tokio::test]
    async fn participant_in_two_events_survives() {
        let f = fixture();
        let a = f.event("A").await;
        let b = f.event("B").await;
        let only_a = f.participant("Ann", "ann@x.com").await;
        let both = f.participant("Bob", "bob@x.com").await;
        f.attend(a, only_a, AttendanceStatus::Attended).await;
        f.attend(a, both, AttendanceStatus::Attended).await;
        f.attend(b, both, AttendanceStatus::Attended).await;

        tokio_test::assert_ok!(f.roster.delete_all_participants(a).await);

        assert!(matches!(f.store.get_participant(only_a).await, Ok(None)));
        assert!(matches!(f.store.get_participant(both).await, Ok(Some(_))));
        assert_eq!(f.rows(a).await, (0, 0));
        assert_eq!(f.rows(b).await, (1, 0));
    }

    #[tokio::test]
    async fn selected_delete_touches_only_selection() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        let bob = f.participant("Bob", "bob@x.com").await;
        f.attend(event, ann, AttendanceStatus::Attended).await;
        f.attend(event, bob, AttendanceStatus::NotAttended).await;

        let Ok(outcome) = f.roster.delete_selected_participants(event, &[bob]).await else {
            panic!("delete failed");
        };
        assert_eq!(outcome.deleted, 1);
        assert_eq!(f.rows(event).await, (1, 0));

        let empty = f.roster.delete_selected_participants(event, &[]).await;
        assert!(matches!(empty, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn newer_delete_invalidates_older_token() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        f.attend(event, ann, AttendanceStatus::Attended).await;

        let Ok(first) = f.roster.delete_all_attendance(event).await else {
            panic!("delete failed");
        };
        let Ok(_) = f.roster.delete_all_attendance(event).await else {
            panic!("delete failed");
        };
        let result = f
            .roster
            .undo_delete(event, BackupKind::Attendance, &first.undo_token)
            .await;
        assert!(matches!(
            result,
            Err(AppError::UndoUnavailable(UndoRejection::TokenMismatch))
        ));
    }

    #[tokio::test]
    async fn kind_must_match_backup() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        f.attend(event, ann, AttendanceStatus::Attended).await;

        let Ok(outcome) = f.roster.delete_all_attendance(event).await else {
            panic!("delete failed");
        };
        let result = f
            .roster
            .undo_delete(event, BackupKind::Participant, &outcome.undo_token)
            .await;
        assert!(matches!(
            result,
            Err(AppError::UndoUnavailable(UndoRejection::KindMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn attendance_undo_recreates_missing_participant_with_captured_email() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        let row = f.attend(event, ann, AttendanceStatus::Attended).await;

        let Ok(outcome) = f.roster.delete_selected_attendance(event, &[row]).await else {
            panic!("delete failed");
        };
        assert_eq!(outcome.deleted, 1);
        assert_eq!(f.store.delete_participants(&[ann]).await, Ok(1));

        let Ok(undo) = f
            .roster
            .undo_delete(event, BackupKind::Attendance, &outcome.undo_token)
            .await
        else {
            panic!("undo failed");
        };
        assert_eq!(undo.restored, 1);
        let Ok(Some(recreated)) = f.store.participant_by_email("ann@x.com").await else {
            panic!("participant should be recreated");
        };
        assert_ne!(recreated.id, ann);
        assert_eq!(recreated.name, "Ann");
    }

    #[tokio::test]
    async fn undo_skips_pairs_already_present() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        f.attend(event, ann, AttendanceStatus::Attended).await;

        let Ok(outcome) = f.roster.delete_all_attendance(event).await else {
            panic!("delete failed");
        };
        f.attend(event, ann, AttendanceStatus::Attended).await;

        let Ok(undo) = f
            .roster
            .undo_delete(event, BackupKind::Attendance, &outcome.undo_token)
            .await
        else {
            panic!("undo failed");
        };
        assert_eq!(undo.restored, 0);
        assert_eq!(f.rows(event).await, (1, 0));
    }

    #[tokio::test]
    async fn views_flatten_participant_details() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        let zed = f.participant("Zed", "zed@x.com").await;
        f.attend(event, zed, AttendanceStatus::Attended).await;
        f.no_show(event, ann).await;

        let Ok(participants) = f.roster.participants(event).await else {
            panic!("list failed");
        };
        let names: Vec<&str> = participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Ann", "Zed"]);

        let Ok(attendance) = f.roster.attendance(event).await else {
            panic!("list failed");
        };
        assert_eq!(attendance.len(), 1);
        let Some(row) = attendance.first() else {
            panic!("expected a row");
        };
        assert_eq!(row.email.as_deref(), Some("zed@x.com"));
    }

    #[tokio::test]
    async fn selected_delete_counts_only_participants_with_rows() {
        let f = fixture();
        let event = f.event("A").await;
        let other = f.event("B").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        let bob = f.participant("Bob", "bob@x.com").await;
        let cy = f.participant("Cy", "cy@x.com").await;
        f.attend(event, ann, AttendanceStatus::Attended).await;
        f.attend(other, bob, AttendanceStatus::Attended).await;

        let Ok(outcome) = f
            .roster
            .delete_selected_participants(event, &[ann, bob, cy, ParticipantId::new()])
            .await
        else {
            panic!("delete failed");
        };
        assert_eq!(outcome.deleted, 1);
        assert_eq!(f.rows(other).await, (1, 0));
        assert!(matches!(f.store.get_participant(bob).await, Ok(Some(_))));
        assert!(matches!(f.store.get_participant(cy).await, Ok(Some(_))));
        assert!(matches!(f.store.get_participant(ann).await, Ok(None)));
    }

    #[tokio::test]
    async fn undo_for_vanished_event_writes_nothing() {
        let f = fixture();
        let event = f.event("A").await;
        let ann = f.participant("Ann", "ann@x.com").await;
        f.attend(event, ann, AttendanceStatus::Attended).await;
        f.no_show(event, ann).await;

        let Ok(outcome) = f.roster.delete_all_participants(event).await else {
            panic!("delete failed");
        };
        assert_eq!(f.store.delete_event(event).await, Ok(true));

        let result = f
            .roster
            .undo_delete(event, BackupKind::Participant, &outcome.undo_token)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(f.rows(event).await, (0, 0));
        assert_eq!(f.store.count_participants(None).await, Ok(0));
        assert!(f.backups.get(event).await.is_some());
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let f = fixture();
        let result = f.roster.delete_all_participants(EventId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
