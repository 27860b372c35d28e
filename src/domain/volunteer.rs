//! Volunteers, their per-event attendance and work assignments.
//!
//! Volunteers are kept apart from participants: they are never imported,
//! never blocklisted and never appear in an event roster.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UnknownVariant;
use super::ids::{EventId, VolunteerAttendanceId, VolunteerId, VolunteerWorkId};

/// A person helping to run events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Volunteer {
    /// Volunteer identifier.
    pub id: VolunteerId,
    /// Display name.
    pub name: String,
    /// Normalized (trimmed, lowercase) e-mail address. Unique.
    pub email: String,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// When the volunteer signed up.
    pub joined_date: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Volunteer {
    /// Builds a volunteer who joins now.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: VolunteerId::new(),
            name: name.into(),
            email: email.into(),
            phone: None,
            joined_date: now,
            created_at: now,
        }
    }
}

/// Partial update for `PUT /volunteers/{id}`. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct VolunteerPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New e-mail address.
    #[serde(default)]
    pub email: Option<String>,
    /// New phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

impl VolunteerPatch {
    /// Applies the patch to a volunteer in place.
    pub fn apply(&self, volunteer: &mut Volunteer) {
        if let Some(name) = &self.name {
            volunteer.name.clone_from(name);
        }
        if let Some(email) = &self.email {
            volunteer.email.clone_from(email);
        }
        if let Some(phone) = &self.phone {
            volunteer.phone = Some(phone.clone());
        }
    }
}

/// How a volunteer turned out for an event.
///
/// Unlike participant attendance, a no-show is its own status here and
/// not a separate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerAttendanceStatus {
    /// Showed up and helped.
    Attended,
    /// Excused absence.
    NotAttended,
    /// Expected but never showed.
    NoShow,
}

impl VolunteerAttendanceStatus {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attended => "attended",
            Self::NotAttended => "not_attended",
            Self::NoShow => "no_show",
        }
    }
}

impl fmt::Display for VolunteerAttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VolunteerAttendanceStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attended" => Ok(Self::Attended),
            "not_attended" => Ok(Self::NotAttended),
            "no_show" => Ok(Self::NoShow),
            other => Err(UnknownVariant::new("volunteer attendance status", other)),
        }
    }
}

/// A row of the `volunteer_attendance` table. One row per
/// (volunteer, event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VolunteerAttendance {
    /// Record identifier.
    pub id: VolunteerAttendanceId,
    /// Volunteer the record is about.
    pub volunteer_id: VolunteerId,
    /// Event the record belongs to.
    pub event_id: EventId,
    /// Turnout.
    pub attendance_status: VolunteerAttendanceStatus,
    /// When the status was first recorded.
    pub created_at: DateTime<Utc>,
}

impl VolunteerAttendance {
    /// Builds a record stamped now.
    #[must_use]
    pub fn new(
        volunteer_id: VolunteerId,
        event_id: EventId,
        attendance_status: VolunteerAttendanceStatus,
    ) -> Self {
        Self {
            id: VolunteerAttendanceId::new(),
            volunteer_id,
            event_id,
            attendance_status,
            created_at: Utc::now(),
        }
    }
}

/// Progress of a work assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Handed out, not started.
    #[default]
    Assigned,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownVariant::new("task status", other)),
        }
    }
}

/// A task handed to a volunteer for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VolunteerWork {
    /// Assignment identifier.
    pub id: VolunteerWorkId,
    /// Event the task is for.
    pub event_id: EventId,
    /// Volunteer doing it.
    pub volunteer_id: VolunteerId,
    /// Short task description.
    pub task_name: String,
    /// Progress.
    pub task_status: TaskStatus,
    /// When the task was handed out.
    pub assigned_at: DateTime<Utc>,
}

impl VolunteerWork {
    /// Builds an assignment stamped now.
    #[must_use]
    pub fn new(
        volunteer_id: VolunteerId,
        event_id: EventId,
        task_name: impl Into<String>,
        task_status: TaskStatus,
    ) -> Self {
        Self {
            id: VolunteerWorkId::new(),
            event_id,
            volunteer_id,
            task_name: task_name.into(),
            task_status,
            assigned_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn attendance_status_keeps_no_show_distinct() {
        assert_eq!(
            "no_show".parse::<VolunteerAttendanceStatus>(),
            Ok(VolunteerAttendanceStatus::NoShow)
        );
        assert_eq!(
            "not_attended".parse::<VolunteerAttendanceStatus>(),
            Ok(VolunteerAttendanceStatus::NotAttended)
        );
        assert!("absent".parse::<VolunteerAttendanceStatus>().is_err());
    }

    #[test]
    fn task_status_round_trips_through_json() {
        let Ok(json) = serde_json::to_string(&TaskStatus::InProgress) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(TaskStatus::default(), TaskStatus::Assigned);
    }

    #[test]
    fn patch_leaves_absent_fields_alone() {
        let mut volunteer = Volunteer::new("Ann", "ann@x.com");
        VolunteerPatch {
            phone: Some("555".to_string()),
            ..VolunteerPatch::default()
        }
        .apply(&mut volunteer);
        assert_eq!(volunteer.name, "Ann");
        assert_eq!(volunteer.phone.as_deref(), Some("555"));
    }
}
