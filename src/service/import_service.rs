//! Import sessions: creation, history, attendance import and revert.
//!
//! A session moves `active → reverted` once. Reverting is allowed only for
//! the session's own import type and within
//! [`REVERT_WINDOW_DAYS`](crate::domain::import::REVERT_WINDOW_DAYS) of
//! creation. Every state change is written to the audit trail, best-effort.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::participant::normalize_email;
use crate::domain::{
    AttendanceRecord, AttendanceSnapshot, AttendanceStatus, AuditAction, AuditEntry, EventId,
    ImportSession, ImportSessionId, ImportStatus, ImportType, Participant, ParticipantId,
    SnapshotId,
};
use crate::error::AppError;
use crate::service::audit_trail::AuditTrail;
use crate::service::blocklist_service::BlocklistService;
use crate::store::{AttendanceFilter, NoShowFilter, Store, StoreError};

/// Default and bounds of the history window, in days.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;
const MAX_HISTORY_DAYS: i64 = 365;

/// Request to open an import session.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct NewImportSession {
    /// Target event.
    pub event_id: EventId,
    /// Kind of rows the import will create.
    pub import_type: ImportType,
    /// Number of records the client is about to send.
    #[serde(default)]
    pub record_count: u32,
}

/// A session with its audit trail.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportDetail {
    /// The session.
    pub session: ImportSession,
    /// Audit entries, newest first. Empty if they could not be read.
    pub audit_logs: Vec<AuditEntry>,
}

/// Result of reverting a session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevertOutcome {
    /// Human-readable summary.
    pub message: String,
    /// Reverted session.
    pub import_session_id: ImportSessionId,
    /// Its type.
    pub import_type: ImportType,
    /// Record count reported when the session was opened.
    pub records_affected: u32,
}

/// One row of an attendance import. Either `participant_id` or `email`
/// identifies the participant; an unknown e-mail creates one.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendanceImportRow {
    /// Existing participant.
    #[serde(default)]
    pub participant_id: Option<ParticipantId>,
    /// Participant name, used when a participant is created.
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    /// Participant e-mail.
    #[serde(default)]
    pub email: Option<String>,
    /// Status to record.
    pub status: AttendanceStatus,
}

/// An attendance import request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendanceImport {
    /// Target event.
    pub event_id: EventId,
    /// Rows to apply.
    pub records: Vec<AttendanceImportRow>,
}

/// Result of an attendance import.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceImportResult {
    /// Session that tags the import.
    pub session: ImportSession,
    /// Attendance rows inserted.
    pub created: u32,
    /// Existing attendance rows whose status was overwritten.
    pub updated: u32,
    /// Participants created by the import.
    pub new_participants: u32,
    /// Participants whose blocklist flag changed.
    pub blocklist_changes: u32,
}

/// Import session operations.
#[derive(Debug, Clone)]
pub struct ImportService {
    store: Arc<dyn Store>,
    audit: AuditTrail,
    blocklist: Arc<BlocklistService>,
}

impl ImportService {
    /// Creates a new `ImportService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, audit: AuditTrail, blocklist: Arc<BlocklistService>) -> Self {
        Self {
            store,
            audit,
            blocklist,
        }
    }

    /// Opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the event does not exist.
    pub async fn create_session(&self, request: NewImportSession) -> Result<ImportSession, AppError> {
        if self.store.get_event(request.event_id).await?.is_none() {
            return Err(AppError::not_found("Event"));
        }
        let session = ImportSession::new(request.event_id, request.import_type, request.record_count);
        let session = self.store.insert_import_session(&session).await?;
        self.audit.record(
            session.id,
            AuditAction::Create,
            format!(
                "Import session created: {} {} records",
                session.record_count, session.import_type
            ),
        );
        tracing::info!(
            import_session_id = %session.id,
            event_id = %session.event_id,
            import_type = session.import_type.as_str(),
            "import session created"
        );
        Ok(session)
    }

    /// Sessions of one event created within the last `days` days, newest
    /// first. `days` is clamped to `1..=365`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self, event_id: EventId, days: Option<i64>) -> Result<Vec<ImportSession>, AppError> {
        let days = days
            .unwrap_or(DEFAULT_HISTORY_DAYS)
            .clamp(1, MAX_HISTORY_DAYS);
        let since = Utc::now() - Duration::days(days);
        Ok(self.store.list_import_sessions(event_id, since).await?)
    }

    /// One session with its audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the session does not exist.
    pub async fn detail(&self, id: ImportSessionId) -> Result<ImportDetail, AppError> {
        let session = self
            .store
            .get_import_session(id)
            .await?
            .ok_or_else(|| AppError::not_found("Import session"))?;
        let audit_logs = match self.store.list_audit_entries(id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(import_session_id = %id, error = %e, "failed to read audit log");
                Vec::new()
            }
        };
        Ok(ImportDetail {
            session,
            audit_logs,
        })
    }

    /// Reverts a session according to its type.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the session does not exist or was
    ///   already reverted.
    /// - [`AppError::ImportTooOld`] past the revert window.
    pub async fn revert(&self, id: ImportSessionId) -> Result<RevertOutcome, AppError> {
        let session = self
            .store
            .get_import_session(id)
            .await?
            .filter(|s| s.status == ImportStatus::Active)
            .ok_or_else(session_gone)?;

        let verb = match session.import_type {
            ImportType::Participants => {
                self.delete_participant_import(id).await?;
                "Deleted"
            }
            ImportType::Attendance => {
                self.revert_attendance_import(id).await?;
                "Reverted"
            }
        };
        Ok(RevertOutcome {
            message: format!("{verb} import successfully"),
            import_session_id: id,
            import_type: session.import_type,
            records_affected: session.record_count,
        })
    }

    async fn validate(&self, id: ImportSessionId, expected: ImportType) -> Result<ImportSession, AppError> {
        let session = self
            .store
            .get_import_session(id)
            .await?
            .filter(|s| s.status == ImportStatus::Active)
            .ok_or_else(session_gone)?;
        if session.import_type != expected {
            return Err(AppError::ImportTypeMismatch {
                expected,
                actual: session.import_type,
            });
        }
        if !session.within_revert_window(Utc::now()) {
            return Err(AppError::ImportTooOld);
        }
        Ok(session)
    }

    /// Deletes the participants a participants import created, with their
    /// attendance, no-show and blocklist rows.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the session does not exist or was
    ///   already reverted.
    /// - [`AppError::ImportTypeMismatch`] for an attendance session.
    /// - [`AppError::ImportTooOld`] past the revert window.
    pub async fn delete_participant_import(&self, id: ImportSessionId) -> Result<u64, AppError> {
        self.validate(id, ImportType::Participants).await?;

        let ids: Vec<ParticipantId> = self
            .store
            .participants_by_import(id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let mut removed = 0;
        if !ids.is_empty() {
            self.store
                .delete_attendance(&AttendanceFilter::all().participants(&ids))
                .await?;
            self.store
                .delete_no_shows(&NoShowFilter::all().participants(&ids))
                .await?;
            self.store.delete_blocklist_entries(&ids).await?;
            removed = self.store.delete_participants(&ids).await?;
        }
        self.store
            .set_import_session_status(id, ImportStatus::Reverted)
            .await?;

        self.audit.record(
            id,
            AuditAction::Delete,
            format!(
                "Deleted participants import: {removed} participants and associated attendance records removed"
            ),
        );
        tracing::info!(import_session_id = %id, removed, "participants import deleted");
        Ok(removed)
    }

    /// Rolls an attendance import back to the snapshots it captured.
    ///
    /// Overwritten rows get their previous status back, blocklist flags the
    /// import changed are restored, rows the import inserted are deleted and
    /// participants it created are deleted unless something else now
    /// references them.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the session does not exist or was
    ///   already reverted.
    /// - [`AppError::ImportTypeMismatch`] for a participants session.
    /// - [`AppError::ImportTooOld`] past the revert window.
    pub async fn revert_attendance_import(&self, id: ImportSessionId) -> Result<usize, AppError> {
        self.validate(id, ImportType::Attendance).await?;

        let snapshots = self.store.list_snapshots(id).await?;
        let mut new_participants = Vec::new();
        for snapshot in &snapshots {
            let Some(row) = self.store.get_attendance(snapshot.attendance_id).await? else {
                continue;
            };
            if let Some(previous) = snapshot.previous_status {
                self.store
                    .update_attendance_status(row.id, previous, Utc::now())
                    .await?;
            }
            if let Some(flag) = snapshot.previous_blocklist_status {
                self.blocklist.restore_flag(row.participant_id, flag).await?;
            }
            if snapshot.is_new_participant && !new_participants.contains(&row.participant_id) {
                new_participants.push(row.participant_id);
            }
        }

        self.store
            .delete_attendance(&AttendanceFilter::for_import(id))
            .await?;
        if !new_participants.is_empty() {
            self.store.delete_blocklist_entries(&new_participants).await?;
        }
        for participant_id in &new_participants {
            match self
                .store
                .delete_participants(std::slice::from_ref(participant_id))
                .await
            {
                Ok(_) => {}
                Err(StoreError::ForeignKeyViolation(_)) => {
                    tracing::debug!(%participant_id, "imported participant still referenced, kept");
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.store.delete_snapshots(id).await?;
        self.store
            .set_import_session_status(id, ImportStatus::Reverted)
            .await?;

        self.audit.record(
            id,
            AuditAction::Revert,
            format!(
                "Reverted attendance import: {} records restored to previous state",
                snapshots.len()
            ),
        );
        tracing::info!(import_session_id = %id, snapshots = snapshots.len(), "attendance import reverted");
        Ok(snapshots.len())
    }

    /// Applies an attendance import under a new session, capturing a
    /// snapshot per touched row so the import can be reverted.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] for an empty batch or a row with
    ///   neither participant id nor e-mail.
    /// - [`AppError::NotFound`] for an unknown event or participant id.
    pub async fn import_attendance(&self, request: AttendanceImport) -> Result<AttendanceImportResult, AppError> {
        if request.records.is_empty() {
            return Err(AppError::InvalidRequest("records must be a non-empty array".to_string()));
        }
        if request.records.iter().any(|r| {
            r.participant_id.is_none() && r.email.as_deref().is_none_or(|e| e.trim().is_empty())
        }) {
            return Err(AppError::InvalidRequest(
                "Each attendance record must include participant_id or email".to_string(),
            ));
        }
        let record_count = u32::try_from(request.records.len())
            .map_err(|_| AppError::InvalidRequest("too many records".to_string()))?;

        let session = self
            .create_session(NewImportSession {
                event_id: request.event_id,
                import_type: ImportType::Attendance,
                record_count,
            })
            .await?;
        let mut result = AttendanceImportResult {
            session,
            created: 0,
            updated: 0,
            new_participants: 0,
            blocklist_changes: 0,
        };

        for row in &request.records {
            let (participant_id, is_new) = self.resolve_participant(row, result.session.id).await?;
            let filter = AttendanceFilter::for_event(request.event_id).participants(&[participant_id]);
            let existing = self.store.list_attendance(&filter).await?;

            let (attendance_id, previous_status) = match existing.first() {
                Some(current) => {
                    self.store
                        .update_attendance_status(current.id, row.status, Utc::now())
                        .await?;
                    result.updated += 1;
                    (current.id, Some(current.status))
                }
                None => {
                    let record = AttendanceRecord {
                        import_session_id: Some(result.session.id),
                        ..AttendanceRecord::new(request.event_id, participant_id, row.status)
                    };
                    self.store.insert_attendance(std::slice::from_ref(&record)).await?;
                    result.created += 1;
                    (record.id, None)
                }
            };

            let change = self.blocklist.sync_participant(participant_id).await?;
            if change.previous_flag().is_some() {
                result.blocklist_changes += 1;
            }
            if is_new {
                result.new_participants += 1;
            }

            let snapshot = AttendanceSnapshot {
                id: SnapshotId::new(),
                import_session_id: result.session.id,
                attendance_id,
                previous_status,
                previous_blocklist_status: change.previous_flag(),
                is_new_participant: is_new,
                created_at: Utc::now(),
            };
            self.store.insert_snapshots(&[snapshot]).await?;
        }

        tracing::info!(
            import_session_id = %result.session.id,
            created = result.created,
            updated = result.updated,
            new_participants = result.new_participants,
            "attendance import applied"
        );
        Ok(result)
    }

    async fn resolve_participant(
        &self,
        row: &AttendanceImportRow,
        session: ImportSessionId,
    ) -> Result<(ParticipantId, bool), AppError> {
        if let Some(id) = row.participant_id {
            return match self.store.get_participant(id).await? {
                Some(p) => Ok((p.id, false)),
                None => Err(AppError::not_found("Participant")),
            };
        }
        let email = row.email.as_deref().map(normalize_email).unwrap_or_default();
        if let Some(existing) = self.store.participant_by_email(&email).await? {
            return Ok((existing.id, false));
        }
        let name = row
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(
                || email.split('@').next().unwrap_or("Unknown").to_string(),
                str::to_string,
            );
        let participant = Participant::new(name, email);
        self.store
            .insert_participants(std::slice::from_ref(&participant))
            .await?;
        tracing::debug!(import_session_id = %session, participant_id = %participant.id, "participant created by import");
        Ok((participant.id, true))
    }
}

fn session_gone() -> AppError {
    AppError::NotFound("Import session not found or has already been deleted".to_string())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::Event;
    use crate::service::blocklist_service::BlocklistSettings;
    use crate::service::participant_service::{ImportRecord, ParticipantService};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        imports: ImportService,
        participants: ParticipantService,
        event: EventId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let dyn_store = Arc::clone(&store) as Arc<dyn Store>;
        let (audit, _writer) = AuditTrail::spawn(Arc::clone(&dyn_store), 64);
        let blocklist = Arc::new(BlocklistService::new(
            Arc::clone(&dyn_store),
            BlocklistSettings {
                no_show_threshold: 1,
                auto_block_enabled: true,
            },
        ));
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: "Meetup".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default(),
            location: None,
            description: None,
            created_at: now,
            updated_at: now,
        };
        let Ok(_) = store.insert_event(&event).await else {
            panic!("seed failed");
        };
        Fixture {
            imports: ImportService::new(Arc::clone(&dyn_store), audit, blocklist),
            participants: ParticipantService::new(dyn_store),
            store,
            event: event.id,
        }
    }

    fn row(email: &str, status: AttendanceStatus) -> AttendanceImportRow {
        AttendanceImportRow {
            participant_id: None,
            full_name: None,
            email: Some(email.to_string()),
            status,
        }
    }

    #[tokio::test]
    async fn participants_import_can_be_deleted_once() {
        let f = fixture().await;
        let Ok(session) = f
            .imports
            .create_session(NewImportSession {
                event_id: f.event,
                import_type: ImportType::Participants,
                record_count: 2,
            })
            .await
        else {
            panic!("session failed");
        };
        let batch = [
            ImportRecord {
                full_name: Some("Ann".to_string()),
                email: Some("ann@x.com".to_string()),
                event_id: Some(f.event),
            },
            ImportRecord {
                full_name: Some("Bob".to_string()),
                email: Some("bob@x.com".to_string()),
                event_id: Some(f.event),
            },
        ];
        let Ok(imported) = f.participants.bulk_import(&batch, Some(session.id)).await else {
            panic!("import failed");
        };
        let Some(ann) = imported.created.first() else {
            panic!("expected participants");
        };
        let Ok(_) = f
            .store
            .insert_attendance(&[AttendanceRecord::new(f.event, ann.id, AttendanceStatus::Attended)])
            .await
        else {
            panic!("seed failed");
        };

        let Ok(outcome) = f.imports.revert(session.id).await else {
            panic!("revert failed");
        };
        assert_eq!(outcome.message, "Deleted import successfully");
        assert_eq!(outcome.records_affected, 2);
        assert_eq!(f.store.count_participants(None).await, Ok(0));
        assert_eq!(f.store.count_attendance(&AttendanceFilter::all()).await, Ok(0));

        let again = f.imports.revert(session.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn session_older_than_window_is_too_old() {
        let f = fixture().await;
        let mut session = ImportSession::new(f.event, ImportType::Participants, 1);
        session.created_at = Utc::now() - Duration::days(31);
        let Ok(_) = f.store.insert_import_session(&session).await else {
            panic!("seed failed");
        };
        let result = f.imports.revert(session.id).await;
        assert!(matches!(result, Err(AppError::ImportTooOld)));
        let Ok(Some(stored)) = f.store.get_import_session(session.id).await else {
            panic!("session vanished");
        };
        assert_eq!(stored.status, ImportStatus::Active);
    }

    #[tokio::test]
    async fn wrong_type_is_rejected() {
        let f = fixture().await;
        let session = ImportSession::new(f.event, ImportType::Attendance, 1);
        let Ok(_) = f.store.insert_import_session(&session).await else {
            panic!("seed failed");
        };
        let result = f.imports.delete_participant_import(session.id).await;
        assert!(matches!(result, Err(AppError::ImportTypeMismatch { .. })));
    }

    #[tokio::test]
    async fn attendance_revert_restores_previous_state() {
        let f = fixture().await;
        let ann = Participant::new("Ann", "ann@x.com");
        let existing = AttendanceRecord::new(f.event, ann.id, AttendanceStatus::Attended);
        let (Ok(_), Ok(_)) = (
            f.store.insert_participants(std::slice::from_ref(&ann)).await,
            f.store.insert_attendance(std::slice::from_ref(&existing)).await,
        ) else {
            panic!("seed failed");
        };

        let request = AttendanceImport {
            event_id: f.event,
            records: vec![
                row("ann@x.com", AttendanceStatus::NotAttended),
                row("new@x.com", AttendanceStatus::Attended),
            ],
        };
        let Ok(result) = f.imports.import_attendance(request).await else {
            panic!("import failed");
        };
        assert_eq!((result.created, result.updated, result.new_participants), (1, 1, 1));
        assert_eq!(result.blocklist_changes, 1);

        let Ok(restored) = f.imports.revert_attendance_import(result.session.id).await else {
            panic!("revert failed");
        };
        assert_eq!(restored, 2);

        let Ok(Some(row)) = f.store.get_attendance(existing.id).await else {
            panic!("pre-import row vanished");
        };
        assert_eq!(row.status, AttendanceStatus::Attended);
        let Ok(Some(ann_after)) = f.store.get_participant(ann.id).await else {
            panic!("participant vanished");
        };
        assert!(!ann_after.is_blocklisted);
        assert!(matches!(f.store.participant_by_email("new@x.com").await, Ok(None)));
        assert_eq!(f.store.count_attendance(&AttendanceFilter::all()).await, Ok(1));
        assert_eq!(f.store.count_blocklist().await, Ok(0));
    }

    #[tokio::test]
    async fn rows_without_identity_are_rejected() {
        let f = fixture().await;
        let request = AttendanceImport {
            event_id: f.event,
            records: vec![AttendanceImportRow {
                participant_id: None,
                full_name: Some("Ann".to_string()),
                email: None,
                status: AttendanceStatus::Attended,
            }],
        };
        let result = f.imports.import_attendance(request).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn history_is_scoped_to_event_and_window() {
        let f = fixture().await;
        let mut old = ImportSession::new(f.event, ImportType::Participants, 1);
        old.created_at = Utc::now() - Duration::days(40);
        let other = ImportSession::new(EventId::new(), ImportType::Participants, 1);
        let (Ok(_), Ok(_)) = (
            f.store.insert_import_session(&old).await,
            f.store.insert_import_session(&other).await,
        ) else {
            panic!("seed failed");
        };
        tokio_test::assert_ok!(
            f.imports
                .create_session(NewImportSession {
                    event_id: f.event,
                    import_type: ImportType::Attendance,
                    record_count: 0,
                })
                .await
        );

        assert_eq!(f.imports.list(f.event, None).await.map(|s| s.len()).ok(), Some(1));
        assert_eq!(f.imports.list(f.event, Some(9999)).await.map(|s| s.len()).ok(), Some(2));
    }

    #[tokio::test]
    async fn detail_of_unknown_session_is_not_found() {
        let f = fixture().await;
        let result = f.imports.detail(ImportSessionId::new()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
