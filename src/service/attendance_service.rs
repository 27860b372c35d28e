//! Attendance marking, listings and counters.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    AttendanceId, AttendanceRecord, AttendanceStatus, EventId, ParticipantId,
};
use crate::error::AppError;
use crate::service::blocklist_service::BlocklistService;
use crate::store::{AttendanceFilter, NoShowFilter, Store};

/// Request to mark one participant at one event.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct MarkAttendance {
    /// Event.
    pub event_id: EventId,
    /// Participant.
    pub participant_id: ParticipantId,
    /// Present or absent.
    pub status: AttendanceStatus,
}

/// Attendance counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceStats {
    /// Attendance rows plus `no_shows` rows.
    pub total: u64,
    /// Rows marked `attended`.
    pub attended: u64,
    /// Rows marked `not_attended` plus `no_shows` rows.
    pub no_shows: u64,
}

/// Attendance operations.
#[derive(Debug, Clone)]
pub struct AttendanceService {
    store: Arc<dyn Store>,
    blocklist: Arc<BlocklistService>,
}

impl AttendanceService {
    /// Creates a new `AttendanceService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, blocklist: Arc<BlocklistService>) -> Self {
        Self { store, blocklist }
    }

    /// Marks attendance. An existing row for the same event and participant
    /// is updated in place instead of duplicated. The auto-block rule is
    /// re-evaluated afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the event or participant is absent.
    pub async fn mark(&self, request: MarkAttendance) -> Result<AttendanceRecord, AppError> {
        let MarkAttendance {
            event_id,
            participant_id,
            status,
        } = request;
        if self.store.get_event(event_id).await?.is_none() {
            return Err(AppError::not_found("Event"));
        }
        if self.store.get_participant(participant_id).await?.is_none() {
            return Err(AppError::not_found("Participant"));
        }

        let filter = AttendanceFilter::for_event(event_id).participants(&[participant_id]);
        let existing = self.store.list_attendance(&filter).await?;
        let record = match existing.first() {
            Some(current) => self
                .store
                .update_attendance_status(current.id, status, Utc::now())
                .await?
                .ok_or_else(|| AppError::not_found("Attendance record"))?,
            None => {
                let row = AttendanceRecord::new(event_id, participant_id, status);
                self.store.insert_attendance(std::slice::from_ref(&row)).await?;
                row
            }
        };

        self.blocklist.sync_participant(participant_id).await?;
        tracing::debug!(%event_id, %participant_id, status = status.as_str(), "attendance marked");
        Ok(record)
    }

    /// Attendance rows of one event, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn by_event(&self, event_id: EventId) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self
            .store
            .list_attendance(&AttendanceFilter::for_event(event_id))
            .await?)
    }

    /// Attendance rows of one participant, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn by_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self
            .store
            .list_attendance(&AttendanceFilter::all().participants(&[participant_id]))
            .await?)
    }

    /// Changes the status of one row and re-evaluates the auto-block rule.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the row is absent.
    pub async fn update_status(
        &self,
        id: AttendanceId,
        status: AttendanceStatus,
    ) -> Result<AttendanceRecord, AppError> {
        let record = self
            .store
            .update_attendance_status(id, status, Utc::now())
            .await?
            .ok_or_else(|| AppError::not_found("Attendance record"))?;
        self.blocklist.sync_participant(record.participant_id).await?;
        Ok(record)
    }

    /// Attendance counters across all events.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn stats(&self) -> Result<AttendanceStats, AppError> {
        let attended_filter = AttendanceFilter::all().status(AttendanceStatus::Attended);
        let absent_filter = AttendanceFilter::all().status(AttendanceStatus::NotAttended);
        let no_show_filter = NoShowFilter::all();
        let (attended, absent, no_show_rows) = tokio::try_join!(
            self.store.count_attendance(&attended_filter),
            self.store.count_attendance(&absent_filter),
            self.store.count_no_shows(&no_show_filter),
        )?;
        let no_shows = absent + no_show_rows;
        Ok(AttendanceStats {
            total: attended + no_shows,
            attended,
            no_shows,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{Event, NoShowRecord, Participant};
    use crate::service::blocklist_service::BlocklistSettings;
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: AttendanceService,
        event: EventId,
        ann: ParticipantId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: "Meetup".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default(),
            location: None,
            description: None,
            created_at: now,
            updated_at: now,
        };
        let ann = Participant::new("Ann", "ann@x.com");
        let (Ok(_), Ok(_)) = (
            store.insert_event(&event).await,
            store.insert_participants(std::slice::from_ref(&ann)).await,
        ) else {
            panic!("seed failed");
        };
        let dyn_store = Arc::clone(&store) as Arc<dyn Store>;
        let blocklist = Arc::new(BlocklistService::new(
            Arc::clone(&dyn_store),
            BlocklistSettings {
                no_show_threshold: 2,
                auto_block_enabled: true,
            },
        ));
        Fixture {
            service: AttendanceService::new(dyn_store, blocklist),
            store,
            event: event.id,
            ann: ann.id,
        }
    }

    #[tokio::test]
    async fn marking_twice_updates_in_place() {
        let f = fixture().await;
        let request = MarkAttendance {
            event_id: f.event,
            participant_id: f.ann,
            status: AttendanceStatus::Attended,
        };
        let Ok(first) = f.service.mark(request).await else {
            panic!("mark failed");
        };
        let Ok(second) = f
            .service
            .mark(MarkAttendance {
                status: AttendanceStatus::NotAttended,
                ..request
            })
            .await
        else {
            panic!("mark failed");
        };
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, AttendanceStatus::NotAttended);
        assert_eq!(f.service.by_event(f.event).await.map(|v| v.len()).ok(), Some(1));
    }

    #[tokio::test]
    async fn marking_unknown_participant_is_not_found() {
        let f = fixture().await;
        let result = f
            .service
            .mark(MarkAttendance {
                event_id: f.event,
                participant_id: ParticipantId::new(),
                status: AttendanceStatus::Attended,
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn absence_reaching_threshold_blocks() {
        let f = fixture().await;
        let Ok(_) = f
            .store
            .insert_no_shows(&[NoShowRecord::new(EventId::new(), f.ann)])
            .await
        else {
            panic!("seed failed");
        };
        tokio_test::assert_ok!(
            f.service
                .mark(MarkAttendance {
                    event_id: f.event,
                    participant_id: f.ann,
                    status: AttendanceStatus::NotAttended,
                })
                .await
        );
        let Ok(Some(ann)) = f.store.get_participant(f.ann).await else {
            panic!("participant vanished");
        };
        assert!(ann.is_blocklisted);
    }

    #[tokio::test]
    async fn stats_combine_both_tables() {
        let f = fixture().await;
        tokio_test::assert_ok!(
            f.service
                .mark(MarkAttendance {
                    event_id: f.event,
                    participant_id: f.ann,
                    status: AttendanceStatus::Attended,
                })
                .await
        );
        let Ok(_) = f
            .store
            .insert_no_shows(&[NoShowRecord::new(EventId::new(), f.ann)])
            .await
        else {
            panic!("seed failed");
        };
        assert_eq!(
            f.service.stats().await.ok(),
            Some(AttendanceStats {
                total: 2,
                attended: 1,
                no_shows: 1,
            })
        );
    }

    #[tokio::test]
    async fn update_unknown_row_is_not_found() {
        let f = fixture().await;
        let result = f
            .service
            .update_status(AttendanceId::new(), AttendanceStatus::Attended)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
