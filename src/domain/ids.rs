//! Type-safe record identifiers.
//!
//! Every table keys its rows by a UUID v4. Each identifier gets its own
//! newtype so a participant id cannot be passed where an event id is
//! expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

record_id!(
    /// Identifier of an event.
    EventId
);
record_id!(
    /// Identifier of a participant.
    ParticipantId
);
record_id!(
    /// Identifier of a row in the `attendance` table.
    AttendanceId
);
record_id!(
    /// Identifier of a row in the `no_shows` table.
    NoShowId
);
record_id!(
    /// Identifier of a blocklist entry.
    BlocklistId
);
record_id!(
    /// Identifier of an import session.
    ImportSessionId
);
record_id!(
    /// Identifier of an import audit log entry.
    AuditLogId
);
record_id!(
    /// Identifier of an attendance snapshot.
    SnapshotId
);
record_id!(
    /// Identifier of an application user.
    UserId
);
record_id!(
    /// Identifier of a volunteer.
    VolunteerId
);
record_id!(
    /// Identifier of a row in the `volunteer_attendance` table.
    VolunteerAttendanceId
);
record_id!(
    /// Identifier of a volunteer work assignment.
    VolunteerWorkId
);

/// Collects the raw UUIDs of a slice of identifiers for `= ANY($1)` binds.
pub fn to_uuids<T: Copy + Into<uuid::Uuid>>(ids: &[T]) -> Vec<uuid::Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(ParticipantId::new(), ParticipantId::new());
    }

    #[test]
    fn display_is_uuid_format() {
        let s = EventId::new().to_string();
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let uuid = uuid::Uuid::new_v4();
        let id = ImportSessionId::from_uuid(uuid);
        let Ok(json) = serde_json::to_string(&id) else {
            panic!("serialization failed");
        };
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn to_uuids_preserves_order() {
        let a = ParticipantId::new();
        let b = ParticipantId::new();
        assert_eq!(to_uuids(&[a, b]), vec![*a.as_uuid(), *b.as_uuid()]);
    }
}
