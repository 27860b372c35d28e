//! Best-effort audit log for import sessions.
//!
//! [`AuditTrail`] wraps a bounded [`tokio::sync::mpsc`] channel. Services
//! call [`AuditTrail::record`], which never blocks and never fails the
//! caller; a single writer task drains the queue into the store. A full
//! queue or a failed insert is logged at `warn` and the entry is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::{AuditAction, AuditEntry, ImportSessionId};
use crate::store::Store;

/// Sending half of the audit queue.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    sender: mpsc::Sender<AuditEntry>,
}

impl AuditTrail {
    /// Creates a trail and the receiver a writer must drain.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AuditEntry>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Creates a trail whose entries are written to `store` by a spawned
    /// task. The task ends once every clone of the trail is dropped.
    #[must_use]
    pub fn spawn(store: Arc<dyn Store>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (trail, receiver) = Self::channel(capacity);
        let handle = tokio::spawn(run_writer(store, receiver));
        (trail, handle)
    }

    /// Queues an entry. Returns `false` if it was dropped.
    pub fn record(
        &self,
        import_session_id: ImportSessionId,
        action: AuditAction,
        details: impl Into<String>,
    ) -> bool {
        let entry = AuditEntry::new(import_session_id, action, details.into());
        match self.sender.try_send(entry) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    %import_session_id,
                    action = action.as_str(),
                    error = %e,
                    "audit entry dropped"
                );
                false
            }
        }
    }
}

/// Drains `receiver` into the store until every sender is gone.
pub async fn run_writer(store: Arc<dyn Store>, mut receiver: mpsc::Receiver<AuditEntry>) {
    while let Some(entry) = receiver.recv().await {
        if let Err(e) = store.insert_audit_entry(&entry).await {
            tracing::warn!(
                import_session_id = %entry.import_session_id,
                action = entry.action.as_str(),
                error = %e,
                "failed to write audit entry"
            );
        }
    }
    tracing::debug!("audit writer stopped");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn recorded_entry_reaches_receiver() {
        let (trail, mut rx) = AuditTrail::channel(4);
        let session = ImportSessionId::new();
        assert!(trail.record(session, AuditAction::Create, "Imported 3 records"));

        let Some(entry) = rx.recv().await else {
            panic!("expected an entry");
        };
        assert_eq!(entry.import_session_id, session);
        assert_eq!(entry.action, AuditAction::Create);
        assert_eq!(entry.details, "Imported 3 records");
    }

    #[test]
    fn full_queue_drops_entry() {
        let (trail, _rx) = AuditTrail::channel(1);
        let session = ImportSessionId::new();
        assert!(trail.record(session, AuditAction::Create, "first"));
        assert!(!trail.record(session, AuditAction::Delete, "second"));
    }

    #[test]
    fn closed_queue_drops_entry() {
        let (trail, rx) = AuditTrail::channel(4);
        drop(rx);
        assert!(!trail.record(ImportSessionId::new(), AuditAction::Revert, "gone"));
    }

    #[tokio::test]
    async fn writer_persists_entries_and_stops_with_senders() {
        let store = Arc::new(MemoryStore::new());
        let (trail, handle) = AuditTrail::spawn(Arc::clone(&store) as Arc<dyn Store>, 8);
        let session = ImportSessionId::new();
        trail.record(session, AuditAction::Create, "a");
        trail.record(session, AuditAction::Revert, "b");
        drop(trail);

        let Ok(()) = handle.await else {
            panic!("writer panicked");
        };
        let Ok(entries) = store.list_audit_entries(session).await else {
            panic!("list failed");
        };
        assert_eq!(entries.len(), 2);
    }
}
