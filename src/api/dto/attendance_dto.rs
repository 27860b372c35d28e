//! Attendance, no-show, blocklist and import DTOs.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{AttendanceStatus, EventId, ParticipantId};

/// Request body for `PUT /api/attendance/{id}`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct UpdateAttendanceRequest {
    /// New status.
    pub status: AttendanceStatus,
}

/// Request body for `POST /api/no-shows`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct MarkNoShowRequest {
    /// Absent participant.
    pub participant_id: ParticipantId,
    /// Event they missed.
    pub event_id: EventId,
}

/// Request body for `POST /api/blocklist`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddBlocklistRequest {
    /// Participant to block.
    pub participant_id: ParticipantId,
    /// Why.
    #[serde(default)]
    pub reason: String,
}

/// Query parameters for `GET /api/imports`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct ImportListParams {
    /// Event whose sessions to list. Required.
    #[serde(default)]
    pub event_id: Option<EventId>,
    /// History window in days, clamped to `1..=365`. Defaults to 30.
    #[serde(default)]
    pub days: Option<i64>,
}
