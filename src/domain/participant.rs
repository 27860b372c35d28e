//! Participants and blocklist entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{BlocklistId, ImportSessionId, ParticipantId};

/// Domain used for generated addresses when a participant has no real
/// e-mail on record.
pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "eventpass.local";

/// A person who can be registered for events.
///
/// `email` is the deduplication key for imports. It is soft-unique: the
/// store does not enforce it, the import path does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// Normalized (trimmed, lowercase) e-mail address.
    pub email: String,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Whether the participant is currently blocked from events.
    pub is_blocklisted: bool,
    /// Reason recorded when the participant was blocked.
    #[serde(default)]
    pub blocklist_reason: Option<String>,
    /// Import session that created this participant, if any.
    #[serde(default)]
    pub import_session_id: Option<ImportSessionId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Builds a fresh, non-blocklisted participant with a new id.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            email: email.into(),
            phone: None,
            is_blocklisted: false,
            blocklist_reason: None,
            import_session_id: None,
            created_at: Utc::now(),
        }
    }

    /// Tags the participant with the import session that created it.
    #[must_use]
    pub fn with_import_session(mut self, session: Option<ImportSessionId>) -> Self {
        self.import_session_id = session;
        self
    }
}

/// Partial update applied by `PUT /participants/{id}` and by the
/// blocklist workflows. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ParticipantPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New e-mail address.
    #[serde(default)]
    pub email: Option<String>,
    /// New phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// New blocklist flag.
    #[serde(default)]
    pub is_blocklisted: Option<bool>,
    /// New blocklist reason. `Some(None)` clears it.
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub blocklist_reason: Option<Option<String>>,
}

impl ParticipantPatch {
    /// Patch that sets the blocklist flag and reason together.
    #[must_use]
    pub fn blocklist(blocked: bool, reason: Option<String>) -> Self {
        Self {
            is_blocklisted: Some(blocked),
            blocklist_reason: Some(reason),
            ..Self::default()
        }
    }

    /// Applies the patch to a participant in place.
    pub fn apply(&self, participant: &mut Participant) {
        if let Some(name) = &self.name {
            participant.name.clone_from(name);
        }
        if let Some(email) = &self.email {
            participant.email.clone_from(email);
        }
        if let Some(phone) = &self.phone {
            participant.phone = Some(phone.clone());
        }
        if let Some(flag) = self.is_blocklisted {
            participant.is_blocklisted = flag;
        }
        if let Some(reason) = &self.blocklist_reason {
            participant.blocklist_reason.clone_from(reason);
        }
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// A row of the `blocklist` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlocklistEntry {
    /// Entry identifier.
    pub id: BlocklistId,
    /// Blocked participant.
    pub participant_id: ParticipantId,
    /// Reason for the block.
    pub reason: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Normalizes an e-mail address for comparison: trimmed and lowercased.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Generates a unique address on the placeholder domain.
#[must_use]
pub fn placeholder_email(prefix: &str) -> String {
    format!(
        "{prefix}-{}@{PLACEHOLDER_EMAIL_DOMAIN}",
        uuid::Uuid::new_v4().simple()
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ann@X.Com "), "ann@x.com");
    }

    #[test]
    fn placeholder_email_is_unique_and_local() {
        let a = placeholder_email("restored");
        let b = placeholder_email("restored");
        assert_ne!(a, b);
        assert!(a.starts_with("restored-"));
        assert!(a.ends_with("@eventpass.local"));
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut participant = Participant::new("Ann", "a@x.com");
        let patch = ParticipantPatch {
            name: Some("Ann B".to_string()),
            ..ParticipantPatch::default()
        };
        patch.apply(&mut participant);
        assert_eq!(participant.name, "Ann B");
        assert_eq!(participant.email, "a@x.com");
        assert!(!participant.is_blocklisted);
    }

    #[test]
    fn blocklist_patch_clears_reason() {
        let mut participant = Participant::new("Ann", "a@x.com");
        ParticipantPatch::blocklist(true, Some("late".to_string())).apply(&mut participant);
        assert!(participant.is_blocklisted);
        assert_eq!(participant.blocklist_reason.as_deref(), Some("late"));

        ParticipantPatch::blocklist(false, None).apply(&mut participant);
        assert!(!participant.is_blocklisted);
        assert_eq!(participant.blocklist_reason, None);
    }

    #[test]
    fn explicit_null_reason_is_distinguished_from_absent() {
        let Ok(patch) = serde_json::from_str::<ParticipantPatch>(r#"{"blocklist_reason":null}"#)
        else {
            panic!("valid patch");
        };
        assert_eq!(patch.blocklist_reason, Some(None));

        let Ok(patch) = serde_json::from_str::<ParticipantPatch>("{}") else {
            panic!("valid patch");
        };
        assert_eq!(patch.blocklist_reason, None);
    }
}
