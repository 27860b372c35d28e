//! Per-event roster DTOs: bulk delete and undo.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{AttendanceId, BackupKind, ParticipantId};

/// Request body for `POST /api/events/{id}/participants/bulk-delete`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BulkDeleteParticipantsRequest {
    /// Participants to remove from the event.
    #[serde(default)]
    pub participant_ids: Vec<ParticipantId>,
}

/// Request body for `POST /api/events/{id}/participants/attendance/bulk-delete`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BulkDeleteAttendanceRequest {
    /// Attendance rows to remove.
    #[serde(default)]
    pub attendance_ids: Vec<AttendanceId>,
}

/// Request body for `POST /api/events/{id}/participants/undo-delete`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UndoDeleteRequest {
    /// Which delete to undo.
    #[serde(rename = "type")]
    pub kind: BackupKind,
    /// Token returned by the delete.
    pub undo_token: String,
}
