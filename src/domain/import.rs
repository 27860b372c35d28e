//! Import sessions, their audit trail, and attendance snapshots.
//!
//! An [`ImportSession`] tags every row a bulk import creates so the whole
//! batch can be reverted later. Sessions move `active → reverted` exactly
//! once, and only within [`REVERT_WINDOW_DAYS`] of creation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UnknownVariant;
use super::attendance::AttendanceStatus;
use super::ids::{AttendanceId, AuditLogId, EventId, ImportSessionId, SnapshotId};

/// Imports older than this many days can no longer be reverted.
pub const REVERT_WINDOW_DAYS: i64 = 30;

/// What an import session created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    /// Participant rows.
    Participants,
    /// Attendance rows, with snapshots of what they replaced.
    Attendance,
}

impl ImportType {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Participants => "participants",
            Self::Attendance => "attendance",
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participants" => Ok(Self::Participants),
            "attendance" => Ok(Self::Attendance),
            other => Err(UnknownVariant::new("import type", other)),
        }
    }
}

/// Lifecycle state of an import session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Rows from the import are live.
    Active,
    /// The import was rolled back. Terminal.
    Reverted,
}

impl ImportStatus {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Reverted => "reverted",
        }
    }
}

impl FromStr for ImportStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "reverted" => Ok(Self::Reverted),
            other => Err(UnknownVariant::new("import status", other)),
        }
    }
}

/// A tagged batch of inserts that can be reverted as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportSession {
    /// Session identifier.
    pub id: ImportSessionId,
    /// Event the import targeted.
    pub event_id: EventId,
    /// Kind of rows the import created.
    pub import_type: ImportType,
    /// Current lifecycle state.
    pub status: ImportStatus,
    /// Number of records the client reported for the import.
    pub record_count: u32,
    /// Creation timestamp; the revert window is measured from here.
    pub created_at: DateTime<Utc>,
}

impl ImportSession {
    /// Starts a new active session.
    #[must_use]
    pub fn new(event_id: EventId, import_type: ImportType, record_count: u32) -> Self {
        Self {
            id: ImportSessionId::new(),
            event_id,
            import_type,
            status: ImportStatus::Active,
            record_count,
            created_at: Utc::now(),
        }
    }

    /// Returns `true` while `now - created_at` is within the revert window.
    #[must_use]
    pub fn within_revert_window(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) <= Duration::days(REVERT_WINDOW_DAYS)
    }
}

/// Action recorded in the import audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// The session was opened.
    Create,
    /// A participants import was deleted.
    Delete,
    /// An attendance import was reverted.
    Revert,
}

impl AuditAction {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Revert => "revert",
        }
    }
}

impl FromStr for AuditAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            "revert" => Ok(Self::Revert),
            other => Err(UnknownVariant::new("audit action", other)),
        }
    }
}

/// Append-only audit trail row for an import session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: AuditLogId,
    /// Session the entry describes.
    pub import_session_id: ImportSessionId,
    /// What happened.
    pub action: AuditAction,
    /// Human-readable summary.
    pub details: String,
    /// When it happened.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Builds an entry timestamped now.
    #[must_use]
    pub fn new(import_session_id: ImportSessionId, action: AuditAction, details: String) -> Self {
        Self {
            id: AuditLogId::new(),
            import_session_id,
            action,
            details,
            created_at: Utc::now(),
        }
    }
}

/// State of one attendance row before an attendance import touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSnapshot {
    /// Snapshot identifier.
    pub id: SnapshotId,
    /// Import that captured the snapshot.
    pub import_session_id: ImportSessionId,
    /// Attendance row the snapshot describes.
    pub attendance_id: AttendanceId,
    /// Status before the import; `None` when the import created the row.
    #[serde(default)]
    pub previous_status: Option<AttendanceStatus>,
    /// Participant blocklist flag before the import, when the import changed it.
    #[serde(default)]
    pub previous_blocklist_status: Option<bool>,
    /// Whether the import created the participant itself.
    pub is_new_participant: bool,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_within_window() {
        let session = ImportSession::new(EventId::new(), ImportType::Participants, 3);
        assert!(session.within_revert_window(Utc::now()));
        assert_eq!(session.status, ImportStatus::Active);
    }

    #[test]
    fn session_older_than_thirty_days_is_outside_window() {
        let mut session = ImportSession::new(EventId::new(), ImportType::Attendance, 1);
        session.created_at = Utc::now() - Duration::days(31);
        assert!(!session.within_revert_window(Utc::now()));
    }

    #[test]
    fn session_exactly_thirty_days_old_is_inside_window() {
        let now = Utc::now();
        let mut session = ImportSession::new(EventId::new(), ImportType::Attendance, 1);
        session.created_at = now - Duration::days(30);
        assert!(session.within_revert_window(now));
    }

    #[test]
    fn import_type_round_trips_through_str() {
        for kind in [ImportType::Participants, ImportType::Attendance] {
            assert_eq!(kind.as_str().parse::<ImportType>(), Ok(kind));
        }
    }
}
