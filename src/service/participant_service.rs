//! Participant service: manual CRUD and the deduplicating bulk import.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::participant::normalize_email;
use crate::domain::{EventId, ImportSessionId, Participant, ParticipantId, ParticipantPatch};
use crate::error::AppError;
use crate::store::Store;

/// Fields accepted when a participant is created by hand.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewParticipant {
    /// Display name.
    pub name: String,
    /// E-mail address; normalized before storage.
    pub email: String,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// One row of a bulk participant import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ImportRecord {
    /// Name as written in the source file.
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    /// E-mail address; required for every row.
    #[serde(default)]
    pub email: Option<String>,
    /// Event the row was imported for.
    #[serde(default)]
    pub event_id: Option<EventId>,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkImportResult {
    /// Participants inserted by this call.
    pub created: Vec<Participant>,
    /// Unique input e-mails that were not inserted.
    pub duplicates: usize,
}

/// Participant operations over the store.
#[derive(Debug, Clone)]
pub struct ParticipantService {
    store: Arc<dyn Store>,
}

impl ParticipantService {
    /// Creates a new `ParticipantService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates one participant.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] if name or e-mail is blank.
    /// - [`AppError::Conflict`] if the e-mail is already registered.
    pub async fn create(&self, input: NewParticipant) -> Result<Participant, AppError> {
        let name = input.name.trim();
        let email = normalize_email(&input.email);
        if name.is_empty() || email.is_empty() {
            return Err(AppError::InvalidRequest("name and email are required".to_string()));
        }
        if self.store.participant_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Participant with email {email} already exists"
            )));
        }

        let mut participant = Participant::new(name, email);
        participant.phone = input.phone.filter(|p| !p.trim().is_empty());
        self.store
            .insert_participants(std::slice::from_ref(&participant))
            .await?;

        tracing::info!(participant_id = %participant.id, "participant created");
        Ok(participant)
    }

    /// Lists participants, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self, include_blocklisted: bool) -> Result<Vec<Participant>, AppError> {
        Ok(self.store.list_participants(include_blocklisted).await?)
    }

    /// Fetches one participant.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if absent.
    pub async fn get(&self, id: ParticipantId) -> Result<Participant, AppError> {
        self.store
            .get_participant(id)
            .await?
            .ok_or_else(|| AppError::not_found("Participant"))
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] if the patch blanks name or e-mail.
    /// - [`AppError::NotFound`] if absent.
    pub async fn update(
        &self,
        id: ParticipantId,
        mut patch: ParticipantPatch,
    ) -> Result<Participant, AppError> {
        if let Some(email) = patch.email.as_mut() {
            *email = normalize_email(email);
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty())
            || patch.email.as_deref().is_some_and(str::is_empty)
        {
            return Err(AppError::InvalidRequest("name and email cannot be empty".to_string()));
        }
        self.store
            .update_participant(id, &patch)
            .await?
            .ok_or_else(|| AppError::not_found("Participant"))
    }

    /// Number of participants not on the blocklist.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn active_count(&self) -> Result<u64, AppError> {
        Ok(self.store.count_participants(Some(false)).await?)
    }

    /// Number of blocklisted participants.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn blocklisted_count(&self) -> Result<u64, AppError> {
        Ok(self.store.count_participants(Some(true)).await?)
    }

    /// Inserts every participant whose e-mail is not yet known.
    ///
    /// E-mails are normalized and collapsed inside the batch (first row
    /// wins) and then checked against the store in one query. Re-running
    /// the same batch creates nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] without inserting anything if
    /// any row lacks an e-mail.
    pub async fn bulk_import(
        &self,
        records: &[ImportRecord],
        import_session_id: Option<ImportSessionId>,
    ) -> Result<BulkImportResult, AppError> {
        let normalized: Vec<(Option<String>, String)> = records
            .iter()
            .map(|r| {
                (
                    r.full_name
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string),
                    r.email.as_deref().map(normalize_email).unwrap_or_default(),
                )
            })
            .collect();

        if normalized.iter().any(|(_, email)| email.is_empty()) {
            return Err(AppError::InvalidRequest(
                "All participants must include email for import".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let unique: Vec<(Option<String>, String)> = normalized
            .into_iter()
            .filter(|(_, email)| seen.insert(email.clone()))
            .collect();

        let emails: Vec<String> = unique.iter().map(|(_, e)| e.clone()).collect();
        let existing: HashSet<String> = self
            .store
            .participants_by_emails(&emails)
            .await?
            .into_iter()
            .map(|p| normalize_email(&p.email))
            .collect();

        let to_insert: Vec<Participant> = unique
            .into_iter()
            .filter(|(_, email)| !existing.contains(email))
            .map(|(name, email)| {
                let name = name.unwrap_or_else(|| fallback_name(&email));
                Participant::new(name, email).with_import_session(import_session_id)
            })
            .collect();

        let created = if to_insert.is_empty() {
            Vec::new()
        } else {
            self.store.insert_participants(&to_insert).await?
        };
        let duplicates = emails.len().saturating_sub(created.len());

        tracing::info!(
            created = created.len(),
            duplicates,
            import_session_id = ?import_session_id.map(|s| s.to_string()),
            "participant bulk import finished"
        );
        Ok(BulkImportResult {
            created,
            duplicates,
        })
    }
}

/// Name used when the import row has none: the e-mail local part, or
/// `"Unknown"`.
fn fallback_name(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|local| !local.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> ParticipantService {
        ParticipantService::new(Arc::new(MemoryStore::new()))
    }

    fn record(name: &str, email: &str) -> ImportRecord {
        ImportRecord {
            full_name: Some(name.to_string()),
            email: Some(email.to_string()),
            event_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_emails_in_batch_collapse() {
        let svc = service();
        let batch = [record("Ann", "a@x.com"), record("Ann2", "a@x.com")];
        let Ok(result) = svc.bulk_import(&batch, None).await else {
            panic!("import failed");
        };
        assert_eq!(result.created.len(), 1);
        assert_eq!(result.duplicates, 1);
        let Some(first) = result.created.first() else {
            panic!("expected a participant");
        };
        assert_eq!(first.name, "Ann");
    }

    #[tokio::test]
    async fn reimport_creates_nothing() {
        let svc = service();
        let batch = [record("Ann", "A@x.com "), record("Bob", "b@x.com")];
        let Ok(_) = svc.bulk_import(&batch, None).await else {
            panic!("first import failed");
        };
        let Ok(again) = svc.bulk_import(&batch, None).await else {
            panic!("second import failed");
        };
        assert!(again.created.is_empty());
        assert_eq!(again.duplicates, 2);
        assert_eq!(svc.active_count().await.ok(), Some(2));
    }

    #[tokio::test]
    async fn missing_email_rejects_whole_batch() {
        let svc = service();
        let batch = [
            record("Ann", "a@x.com"),
            ImportRecord {
                full_name: Some("NoMail".to_string()),
                ..ImportRecord::default()
            },
        ];
        let result = svc.bulk_import(&batch, None).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(svc.active_count().await.ok(), Some(0));
    }

    #[tokio::test]
    async fn name_falls_back_to_local_part_and_rows_are_tagged() {
        let svc = service();
        let session = ImportSessionId::new();
        let batch = [ImportRecord {
            full_name: Some("  ".to_string()),
            email: Some("carol@x.com".to_string()),
            event_id: None,
        }];
        let Ok(result) = svc.bulk_import(&batch, Some(session)).await else {
            panic!("import failed");
        };
        let Some(carol) = result.created.first() else {
            panic!("expected a participant");
        };
        assert_eq!(carol.name, "carol");
        assert_eq!(carol.import_session_id, Some(session));
    }

    #[test]
    fn fallback_name_handles_empty_local_part() {
        assert_eq!(fallback_name("@x.com"), "Unknown");
        assert_eq!(fallback_name("dan@x.com"), "dan");
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let svc = service();
        let input = NewParticipant {
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            phone: None,
        };
        let Ok(_) = svc.create(input.clone()).await else {
            panic!("create failed");
        };
        let again = svc
            .create(NewParticipant {
                email: " ANN@x.com".to_string(),
                ..input
            })
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_unknown_participant_is_not_found() {
        let svc = service();
        let result = svc
            .update(ParticipantId::new(), ParticipantPatch::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
