//! Attendance and no-show records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UnknownVariant;
use super::ids::{AttendanceId, EventId, ImportSessionId, NoShowId, ParticipantId};

/// Whether a participant showed up to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// The participant was present.
    Attended,
    /// The participant was expected but absent.
    #[serde(alias = "no_show")]
    NotAttended,
}

impl AttendanceStatus {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attended => "attended",
            Self::NotAttended => "not_attended",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attended" => Ok(Self::Attended),
            "not_attended" | "no_show" => Ok(Self::NotAttended),
            other => Err(UnknownVariant::new("attendance status", other)),
        }
    }
}

/// A row of the `attendance` table. One logical record per
/// (event, participant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    /// Record identifier.
    pub id: AttendanceId,
    /// Event the record belongs to.
    pub event_id: EventId,
    /// Participant the record is about.
    pub participant_id: ParticipantId,
    /// Present or absent.
    pub status: AttendanceStatus,
    /// When the status was last set.
    pub marked_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Import session that inserted this row, if any.
    #[serde(default)]
    pub import_session_id: Option<ImportSessionId>,
}

impl AttendanceRecord {
    /// Builds a new record marked now.
    #[must_use]
    pub fn new(event_id: EventId, participant_id: ParticipantId, status: AttendanceStatus) -> Self {
        let now = Utc::now();
        Self {
            id: AttendanceId::new(),
            event_id,
            participant_id,
            status,
            marked_at: now,
            created_at: now,
            import_session_id: None,
        }
    }
}

/// A row of the `no_shows` table. Its status is implicitly
/// [`AttendanceStatus::NotAttended`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NoShowRecord {
    /// Record identifier.
    pub id: NoShowId,
    /// Event the absence belongs to.
    pub event_id: EventId,
    /// Absent participant.
    pub participant_id: ParticipantId,
    /// When the absence was recorded; doubles as `marked_at`.
    pub created_at: DateTime<Utc>,
}

impl NoShowRecord {
    /// Builds a new no-show recorded now.
    #[must_use]
    pub fn new(event_id: EventId, participant_id: ParticipantId) -> Self {
        Self {
            id: NoShowId::new(),
            event_id,
            participant_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn legacy_no_show_value_is_accepted() {
        let Ok(status) = serde_json::from_str::<AttendanceStatus>("\"no_show\"") else {
            panic!("alias should deserialize");
        };
        assert_eq!(status, AttendanceStatus::NotAttended);
        assert_eq!("no_show".parse(), Ok(AttendanceStatus::NotAttended));
    }

    #[test]
    fn serializes_snake_case() {
        let Ok(json) = serde_json::to_string(&AttendanceStatus::NotAttended) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"not_attended\"");
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("late".parse::<AttendanceStatus>().is_err());
    }
}
