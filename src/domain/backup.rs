//! Delete backups and the store that holds them until an undo.
//!
//! Every destructive roster operation captures the rows it is about to
//! remove into a [`DeleteBackup`] keyed by event. Exactly one backup lives
//! per event: a newer delete overwrites the older one and silently
//! invalidates its undo token. A backup is consumed at most once.
//!
//! Storage sits behind [`BackupStore`] so the process-local
//! [`MemoryBackupStore`] can be swapped for a shared one. Consumption is a
//! single check-and-set ([`BackupStore::consume`]); two concurrent undos
//! with the same token cannot both succeed.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::UnknownVariant;
use super::attendance::AttendanceStatus;
use super::ids::{EventId, ParticipantId};
use super::participant::Participant;

/// Which delete produced a backup, and therefore which undo may consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    /// Participants were removed from an event.
    #[serde(alias = "participants")]
    Participant,
    /// Attendance rows were removed from an event.
    Attendance,
}

impl BackupKind {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Attendance => "attendance",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participant" | "participants" => Ok(Self::Participant),
            "attendance" => Ok(Self::Attendance),
            other => Err(UnknownVariant::new("backup type", other)),
        }
    }
}

/// One attendance or no-show row captured before deletion, flattened with
/// the participant details needed to find or recreate the participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Participant id at capture time.
    pub participant_id: ParticipantId,
    /// Participant name at capture time.
    pub name: String,
    /// Participant e-mail at capture time; empty when unknown.
    pub email: String,
    /// Status of the row. No-show rows are captured as `not_attended`.
    pub status: AttendanceStatus,
    /// When the status was set.
    pub marked_at: DateTime<Utc>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

/// Snapshot of everything one delete removed from one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBackup {
    /// Which undo may consume this backup.
    pub kind: BackupKind,
    /// Single-use credential gating the restore.
    pub undo_token: String,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
    /// Set once an undo consumed the backup.
    pub used: bool,
    /// Participants referenced by the captured rows.
    pub participants: Vec<Participant>,
    /// Captured attendance and no-show rows.
    pub records: Vec<BackupRecord>,
}

impl DeleteBackup {
    /// Builds an unused backup with a fresh random undo token.
    #[must_use]
    pub fn new(kind: BackupKind, participants: Vec<Participant>, records: Vec<BackupRecord>) -> Self {
        Self {
            kind,
            undo_token: generate_undo_token(),
            created_at: Utc::now(),
            used: false,
            participants,
            records,
        }
    }
}

/// Why an undo request was refused. All variants surface to clients as
/// "no undo available".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UndoRejection {
    /// No backup exists for the event.
    #[error("no backup recorded for this event")]
    NoBackup,
    /// The backup was produced by the other kind of delete.
    #[error("backup is for a {actual} delete, not {requested}")]
    KindMismatch {
        /// Kind named by the undo request.
        requested: BackupKind,
        /// Kind of the stored backup.
        actual: BackupKind,
    },
    /// The backup was already restored.
    #[error("backup was already used")]
    AlreadyUsed,
    /// The presented token is not the current one for the event.
    #[error("undo token does not match")]
    TokenMismatch,
    /// The backup outlived the configured retention.
    #[error("backup has expired")]
    Expired,
}

/// Key-value storage for delete backups, one slot per event.
#[async_trait]
pub trait BackupStore: Send + Sync + fmt::Debug {
    /// Returns a copy of the backup for `event_id`, if any.
    async fn get(&self, event_id: EventId) -> Option<DeleteBackup>;

    /// Stores `backup` for `event_id`, replacing any previous one.
    async fn put(&self, event_id: EventId, backup: DeleteBackup);

    /// Drops the backup for `event_id`. Returns `true` if one existed.
    async fn remove(&self, event_id: EventId) -> bool;

    /// Atomically validates `token` against the stored backup and marks it
    /// used, returning the captured data.
    ///
    /// # Errors
    ///
    /// Returns the [`UndoRejection`] describing which check failed.
    async fn consume(
        &self,
        event_id: EventId,
        kind: BackupKind,
        token: &str,
    ) -> Result<DeleteBackup, UndoRejection>;
}

/// Process-local [`BackupStore`]. Backups are lost on restart.
///
/// An optional time-to-live expires backups lazily on access.
#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    slots: RwLock<HashMap<EventId, DeleteBackup>>,
    ttl: Option<Duration>,
}

impl MemoryBackupStore {
    /// Creates an empty store whose backups never expire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose backups expire `ttl` after capture.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    fn is_expired(&self, backup: &DeleteBackup, now: DateTime<Utc>) -> bool {
        self.ttl
            .is_some_and(|ttl| now.signed_duration_since(backup.created_at) > ttl)
    }
}

#[async_trait]
impl BackupStore for MemoryBackupStore {
    async fn get(&self, event_id: EventId) -> Option<DeleteBackup> {
        let slots = self.slots.read().await;
        slots
            .get(&event_id)
            .filter(|backup| !self.is_expired(backup, Utc::now()))
            .cloned()
    }

    async fn put(&self, event_id: EventId, backup: DeleteBackup) {
        let mut slots = self.slots.write().await;
        if slots.insert(event_id, backup).is_some() {
            tracing::debug!(%event_id, "previous delete backup overwritten");
        }
    }

    async fn remove(&self, event_id: EventId) -> bool {
        self.slots.write().await.remove(&event_id).is_some()
    }

    async fn consume(
        &self,
        event_id: EventId,
        kind: BackupKind,
        token: &str,
    ) -> Result<DeleteBackup, UndoRejection> {
        let mut slots = self.slots.write().await;
        let backup = slots.get_mut(&event_id).ok_or(UndoRejection::NoBackup)?;

        if self.is_expired(backup, Utc::now()) {
            slots.remove(&event_id);
            return Err(UndoRejection::Expired);
        }
        if backup.kind != kind {
            return Err(UndoRejection::KindMismatch {
                requested: kind,
                actual: backup.kind,
            });
        }
        if backup.used {
            return Err(UndoRejection::AlreadyUsed);
        }
        if !tokens_match(&backup.undo_token, token) {
            return Err(UndoRejection::TokenMismatch);
        }

        backup.used = true;
        Ok(backup.clone())
    }
}

/// 256 bits of randomness rendered as 64 hex characters.
fn generate_undo_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Constant-time token comparison. Only the length check short-circuits.
fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn backup(kind: BackupKind) -> DeleteBackup {
        DeleteBackup::new(kind, Vec::new(), Vec::new())
    }

    #[test]
    fn tokens_are_long_and_unique() {
        let a = generate_undo_token();
        let b = generate_undo_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn token_comparison_rejects_prefixes() {
        assert!(tokens_match("abcd", "abcd"));
        assert!(!tokens_match("abcd", "abc"));
        assert!(!tokens_match("abcd", "abce"));
    }

    #[tokio::test]
    async fn consume_marks_backup_used_once() {
        let store = MemoryBackupStore::new();
        let event = EventId::new();
        let stored = backup(BackupKind::Participant);
        let token = stored.undo_token.clone();
        store.put(event, stored).await;

        let first = store.consume(event, BackupKind::Participant, &token).await;
        assert!(first.is_ok());

        let second = store.consume(event, BackupKind::Participant, &token).await;
        assert_eq!(second, Err(UndoRejection::AlreadyUsed));
    }

    #[tokio::test]
    async fn consume_reports_each_rejection() {
        let store = MemoryBackupStore::new();
        let event = EventId::new();

        let missing = store.consume(event, BackupKind::Attendance, "x").await;
        assert_eq!(missing, Err(UndoRejection::NoBackup));

        let stored = backup(BackupKind::Attendance);
        let token = stored.undo_token.clone();
        store.put(event, stored).await;

        let wrong_kind = store.consume(event, BackupKind::Participant, &token).await;
        assert!(matches!(wrong_kind, Err(UndoRejection::KindMismatch { .. })));

        let wrong_token = store.consume(event, BackupKind::Attendance, "nope").await;
        assert_eq!(wrong_token, Err(UndoRejection::TokenMismatch));
    }

    #[tokio::test]
    async fn newer_backup_invalidates_older_token() {
        let store = MemoryBackupStore::new();
        let event = EventId::new();
        let old = backup(BackupKind::Participant);
        let old_token = old.undo_token.clone();
        store.put(event, old).await;
        store.put(event, backup(BackupKind::Participant)).await;

        let result = store.consume(event, BackupKind::Participant, &old_token).await;
        assert_eq!(result, Err(UndoRejection::TokenMismatch));
    }

    #[tokio::test]
    async fn expired_backup_is_rejected_and_dropped() {
        let store = MemoryBackupStore::with_ttl(Duration::seconds(60));
        let event = EventId::new();
        let mut stale = backup(BackupKind::Attendance);
        stale.created_at = Utc::now() - Duration::seconds(120);
        let token = stale.undo_token.clone();
        store.put(event, stale).await;

        assert!(store.get(event).await.is_none());
        let result = store.consume(event, BackupKind::Attendance, &token).await;
        assert_eq!(result, Err(UndoRejection::Expired));
        assert!(!store.remove(event).await);
    }

    #[tokio::test]
    async fn concurrent_consumers_only_one_wins() {
        let store = Arc::new(MemoryBackupStore::new());
        let event = EventId::new();
        let stored = backup(BackupKind::Participant);
        let token = stored.undo_token.clone();
        store.put(event, stored).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                store.consume(event, BackupKind::Participant, &token).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            let Ok(result) = handle.await else {
                panic!("task panicked");
            };
            if result.is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
