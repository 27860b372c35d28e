//! Volunteer list, history and work DTOs.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::TaskStatus;

/// Join-date ordering for `GET /api/volunteers`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerSort {
    /// Most recently joined first.
    #[default]
    Newest,
    /// Earliest joined first.
    Oldest,
}

/// Query parameters for `GET /api/volunteers`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct ListVolunteersParams {
    /// `newest` (default) or `oldest`.
    #[serde(default)]
    #[param(inline)]
    pub sort: VolunteerSort,
}

/// Query parameters for `GET /api/volunteers/{id}/attendance`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct RecentAttendanceParams {
    /// Rows to return, clamped to `1..=50`. Defaults to 5.
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Query parameters for `GET /api/volunteers/{id}/attendance/history`.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct AttendanceHistoryParams {
    /// 1-based page. Defaults to 1.
    #[serde(default)]
    pub page: Option<u64>,
    /// Page size, clamped to `1..=100`. Defaults to 20.
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Request body for `PUT /api/volunteers/{id}/work/{work_id}`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct UpdateWorkStatusRequest {
    /// New status.
    pub task_status: TaskStatus,
}
