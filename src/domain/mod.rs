//! Domain layer: records, identifiers, and the delete-backup store.
//!
//! Types here mirror the rows of the relational store plus the in-process
//! state the undo workflow needs. They carry no I/O except
//! [`backup::BackupStore`], which is the seam for swapping backup storage.

pub mod attendance;
pub mod backup;
pub mod event;
pub mod ids;
pub mod import;
pub mod participant;
pub mod user;
pub mod volunteer;

pub use attendance::{AttendanceRecord, AttendanceStatus, NoShowRecord};
pub use backup::{BackupKind, BackupRecord, BackupStore, DeleteBackup, MemoryBackupStore, UndoRejection};
pub use event::{Event, EventPatch};
pub use ids::{
    AttendanceId, AuditLogId, BlocklistId, EventId, ImportSessionId, NoShowId, ParticipantId,
    SnapshotId, UserId, VolunteerAttendanceId, VolunteerId, VolunteerWorkId,
};
pub use import::{AttendanceSnapshot, AuditAction, AuditEntry, ImportSession, ImportStatus, ImportType};
pub use participant::{BlocklistEntry, Participant, ParticipantPatch};
pub use user::{PublicUser, Role, User, UserStatus};
pub use volunteer::{
    TaskStatus, Volunteer, VolunteerAttendance, VolunteerAttendanceStatus, VolunteerPatch,
    VolunteerWork,
};

/// A string did not name any variant of a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    /// Records which enum rejected which value.
    #[must_use]
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
