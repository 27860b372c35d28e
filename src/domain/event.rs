//! Events that participants attend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::EventId;

/// A scheduled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Calendar date of the event.
    pub date: NaiveDate,
    /// Venue.
    #[serde(default)]
    pub location: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Partial update for an event. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct EventPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// New venue.
    #[serde(default)]
    pub location: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
}

impl EventPatch {
    /// Applies the patch and bumps `updated_at`.
    pub fn apply(&self, event: &mut Event) {
        if let Some(name) = &self.name {
            event.name.clone_from(name);
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        event.updated_at = Utc::now();
    }
}
