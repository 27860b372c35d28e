//! Blocklist management and the no-show auto-block rule.
//!
//! A participant is blocklisted when `is_blocklisted` is set on the
//! participant row; the `blocklist` table keeps the entry with its reason.
//! Both are written together.
//!
//! With auto-blocking enabled, a participant whose no-show count (attendance
//! rows marked `not_attended` plus rows in `no_shows`) reaches the threshold
//! is blocked with [`AUTO_BLOCK_REASON`]. Only blocks carrying that reason
//! are lifted automatically when the count drops again.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::domain::{AttendanceStatus, BlocklistEntry, BlocklistId, ParticipantId, ParticipantPatch};
use crate::error::AppError;
use crate::store::{AttendanceFilter, NoShowFilter, Store};

/// Reason stored on blocks created by the auto-block rule.
pub const AUTO_BLOCK_REASON: &str = "Automatically blocked: reached no-show threshold";

/// Auto-block configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlocklistSettings {
    /// No-shows at which a participant is blocked.
    pub no_show_threshold: u32,
    /// Whether the rule runs at all.
    pub auto_block_enabled: bool,
}

/// Partial settings update.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct SettingsPatch {
    /// New threshold; must be at least 1.
    #[serde(default)]
    pub no_show_threshold: Option<u32>,
    /// New switch state.
    #[serde(default)]
    pub auto_block_enabled: Option<bool>,
}

/// What a sync did to one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockChange {
    /// Nothing changed.
    Unchanged,
    /// The participant was blocked.
    Blocked,
    /// An automatic block was lifted.
    Unblocked,
}

impl BlockChange {
    /// Blocklist flag before the change, if there was one.
    #[must_use]
    pub const fn previous_flag(self) -> Option<bool> {
        match self {
            Self::Unchanged => None,
            Self::Blocked => Some(false),
            Self::Unblocked => Some(true),
        }
    }
}

/// Blocklist operations and settings.
#[derive(Debug)]
pub struct BlocklistService {
    store: Arc<dyn Store>,
    settings: RwLock<BlocklistSettings>,
}

impl BlocklistService {
    /// Creates a service seeded with `settings`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, settings: BlocklistSettings) -> Self {
        Self {
            store,
            settings: RwLock::new(settings),
        }
    }

    /// Current settings.
    pub async fn settings(&self) -> BlocklistSettings {
        *self.settings.read().await
    }

    /// Updates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] for a zero threshold.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<BlocklistSettings, AppError> {
        if patch.no_show_threshold == Some(0) {
            return Err(AppError::InvalidRequest(
                "no_show_threshold must be at least 1".to_string(),
            ));
        }
        let mut settings = self.settings.write().await;
        if let Some(threshold) = patch.no_show_threshold {
            settings.no_show_threshold = threshold;
        }
        if let Some(enabled) = patch.auto_block_enabled {
            settings.auto_block_enabled = enabled;
        }
        tracing::info!(
            threshold = settings.no_show_threshold,
            auto_block = settings.auto_block_enabled,
            "blocklist settings updated"
        );
        Ok(*settings)
    }

    /// Blocklists a participant.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidRequest`] for a blank reason.
    /// - [`AppError::NotFound`] if the participant does not exist.
    pub async fn add(
        &self,
        participant_id: ParticipantId,
        reason: &str,
    ) -> Result<BlocklistEntry, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidRequest("Missing required fields".to_string()));
        }
        self.block(participant_id, reason).await
    }

    async fn block(
        &self,
        participant_id: ParticipantId,
        reason: &str,
    ) -> Result<BlocklistEntry, AppError> {
        self.store
            .update_participant(
                participant_id,
                &ParticipantPatch::blocklist(true, Some(reason.to_string())),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Participant"))?;

        self.store.delete_blocklist_entries(&[participant_id]).await?;
        let entry = BlocklistEntry {
            id: BlocklistId::new(),
            participant_id,
            reason: reason.to_string(),
            created_at: Utc::now(),
        };
        let entry = self.store.insert_blocklist_entry(&entry).await?;
        tracing::info!(%participant_id, reason, "participant blocklisted");
        Ok(entry)
    }

    /// Blocklist entries, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self) -> Result<Vec<BlocklistEntry>, AppError> {
        Ok(self.store.list_blocklist().await?)
    }

    /// Removes a participant from the blocklist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the participant does not exist.
    pub async fn remove(&self, participant_id: ParticipantId) -> Result<(), AppError> {
        self.unblock(participant_id).await
    }

    async fn unblock(&self, participant_id: ParticipantId) -> Result<(), AppError> {
        self.store.delete_blocklist_entries(&[participant_id]).await?;
        self.store
            .update_participant(participant_id, &ParticipantPatch::blocklist(false, None))
            .await?
            .ok_or_else(|| AppError::not_found("Participant"))?;
        tracing::info!(%participant_id, "participant removed from blocklist");
        Ok(())
    }

    /// Puts back a blocklist flag the auto-block rule changed. Restoring
    /// `true` re-applies an automatic block.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the participant does not exist.
    pub async fn restore_flag(&self, participant_id: ParticipantId, blocked: bool) -> Result<(), AppError> {
        if blocked {
            self.block(participant_id, AUTO_BLOCK_REASON).await.map(|_| ())
        } else {
            self.unblock(participant_id).await
        }
    }

    /// Total no-shows of a participant across all events.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn no_show_count(&self, participant_id: ParticipantId) -> Result<u64, AppError> {
        let ids = [participant_id];
        let attendance_filter = AttendanceFilter::all()
            .participants(&ids)
            .status(AttendanceStatus::NotAttended);
        let no_show_filter = NoShowFilter::all().participants(&ids);
        let (attendance, no_shows) = tokio::try_join!(
            self.store.count_attendance(&attendance_filter),
            self.store.count_no_shows(&no_show_filter),
        )?;
        Ok(attendance + no_shows)
    }

    /// Applies the auto-block rule to one participant.
    ///
    /// Manual blocks are never lifted. Does nothing when the rule is
    /// disabled or the participant no longer exists.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn sync_participant(&self, participant_id: ParticipantId) -> Result<BlockChange, AppError> {
        let settings = self.settings().await;
        if !settings.auto_block_enabled {
            return Ok(BlockChange::Unchanged);
        }
        let Some(participant) = self.store.get_participant(participant_id).await? else {
            return Ok(BlockChange::Unchanged);
        };

        let count = self.no_show_count(participant_id).await?;
        let reached = count >= u64::from(settings.no_show_threshold);
        let auto_blocked = participant.is_blocklisted
            && participant.blocklist_reason.as_deref() == Some(AUTO_BLOCK_REASON);

        if reached && !participant.is_blocklisted {
            self.block(participant_id, AUTO_BLOCK_REASON).await?;
            tracing::info!(%participant_id, count, "participant auto-blocked");
            Ok(BlockChange::Blocked)
        } else if !reached && auto_blocked {
            self.unblock(participant_id).await?;
            tracing::info!(%participant_id, count, "automatic block lifted");
            Ok(BlockChange::Unblocked)
        } else {
            Ok(BlockChange::Unchanged)
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{AttendanceRecord, EventId, NoShowRecord, Participant};
    use crate::store::MemoryStore;

    const SETTINGS: BlocklistSettings = BlocklistSettings {
        no_show_threshold: 2,
        auto_block_enabled: true,
    };

    async fn seeded() -> (Arc<MemoryStore>, BlocklistService, Participant) {
        let store = Arc::new(MemoryStore::new());
        let participant = Participant::new("Ann", "ann@x.com");
        let Ok(_) = store.insert_participants(std::slice::from_ref(&participant)).await else {
            panic!("seed failed");
        };
        let service = BlocklistService::new(Arc::clone(&store) as Arc<dyn Store>, SETTINGS);
        (store, service, participant)
    }

    #[tokio::test]
    async fn threshold_counts_both_tables() {
        let (store, service, ann) = seeded().await;
        let row = AttendanceRecord::new(EventId::new(), ann.id, AttendanceStatus::NotAttended);
        let Ok(_) = store.insert_attendance(&[row]).await else {
            panic!("seed failed");
        };
        assert_eq!(service.sync_participant(ann.id).await.ok(), Some(BlockChange::Unchanged));

        let Ok(_) = store.insert_no_shows(&[NoShowRecord::new(EventId::new(), ann.id)]).await else {
            panic!("seed failed");
        };
        assert_eq!(service.sync_participant(ann.id).await.ok(), Some(BlockChange::Blocked));

        let Ok(Some(blocked)) = store.get_participant(ann.id).await else {
            panic!("participant vanished");
        };
        assert!(blocked.is_blocklisted);
        assert_eq!(blocked.blocklist_reason.as_deref(), Some(AUTO_BLOCK_REASON));
        assert_eq!(store.count_blocklist().await, Ok(1));
    }

    #[tokio::test]
    async fn automatic_block_is_lifted_but_manual_is_kept() {
        let (store, service, ann) = seeded().await;
        let no_shows = [
            NoShowRecord::new(EventId::new(), ann.id),
            NoShowRecord::new(EventId::new(), ann.id),
        ];
        let Ok(_) = store.insert_no_shows(&no_shows).await else {
            panic!("seed failed");
        };
        let Ok(BlockChange::Blocked) = service.sync_participant(ann.id).await else {
            panic!("expected block");
        };

        let Ok(_) = store.delete_no_shows(&NoShowFilter::all().participants(&[ann.id])).await else {
            panic!("delete failed");
        };
        assert_eq!(service.sync_participant(ann.id).await.ok(), Some(BlockChange::Unblocked));

        let Ok(_) = service.add(ann.id, "abusive").await else {
            panic!("manual block failed");
        };
        assert_eq!(service.sync_participant(ann.id).await.ok(), Some(BlockChange::Unchanged));
        assert_eq!(store.count_blocklist().await, Ok(1));
    }

    #[tokio::test]
    async fn disabled_rule_does_nothing() {
        let (store, service, ann) = seeded().await;
        let Ok(_) = service
            .update_settings(SettingsPatch {
                auto_block_enabled: Some(false),
                ..SettingsPatch::default()
            })
            .await
        else {
            panic!("settings update failed");
        };
        let no_shows = [
            NoShowRecord::new(EventId::new(), ann.id),
            NoShowRecord::new(EventId::new(), ann.id),
        ];
        let Ok(_) = store.insert_no_shows(&no_shows).await else {
            panic!("seed failed");
        };
        assert_eq!(service.sync_participant(ann.id).await.ok(), Some(BlockChange::Unchanged));
    }

    #[tokio::test]
    async fn remove_clears_flag_and_entry() {
        let (store, service, ann) = seeded().await;
        tokio_test::assert_ok!(service.add(ann.id, "late").await);
        tokio_test::assert_ok!(service.remove(ann.id).await);
        let Ok(Some(after)) = store.get_participant(ann.id).await else {
            panic!("participant vanished");
        };
        assert!(!after.is_blocklisted);
        assert_eq!(after.blocklist_reason, None);
        assert_eq!(store.count_blocklist().await, Ok(0));
    }

    #[tokio::test]
    async fn zero_threshold_is_rejected() {
        let (_, service, _) = seeded().await;
        let result = service
            .update_settings(SettingsPatch {
                no_show_threshold: Some(0),
                ..SettingsPatch::default()
            })
            .await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(service.settings().await, SETTINGS);
    }

    #[tokio::test]
    async fn unknown_participant_is_not_found() {
        let (_, service, _) = seeded().await;
        let result = service.add(ParticipantId::new(), "late").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
