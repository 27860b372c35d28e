//! No-show views.
//!
//! Absences live in two places: attendance rows marked `not_attended` and
//! rows of the `no_shows` table. Every view here merges both, enriched with
//! event and participant names.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    AttendanceId, AttendanceRecord, AttendanceStatus, Event, EventId, NoShowId, Participant,
    ParticipantId,
};
use crate::error::AppError;
use crate::service::attendance_service::{AttendanceService, MarkAttendance};
use crate::service::blocklist_service::BlocklistService;
use crate::service::csv_codec;
use crate::store::{AttendanceFilter, NoShowFilter, Store};

/// Table a no-show row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoShowSource {
    /// An attendance row marked `not_attended`.
    Attendance,
    /// A row of the `no_shows` table.
    NoShows,
}

/// One absence with display names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NoShowView {
    /// Row id in its source table.
    pub id: uuid::Uuid,
    /// Source table.
    pub source: NoShowSource,
    /// Event.
    pub event_id: EventId,
    /// Event name, or `"Unknown"`.
    pub event_name: String,
    /// Participant.
    pub participant_id: ParticipantId,
    /// Participant name, or `"Unknown"`.
    pub participant_name: String,
    /// Participant e-mail; empty when unknown.
    pub participant_email: String,
    /// Always `not_attended`.
    pub status: AttendanceStatus,
    /// When the absence was recorded.
    pub marked_at: DateTime<Utc>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// All no-shows with totals.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NoShowList {
    /// Rows, most recent first.
    pub data: Vec<NoShowView>,
    /// Number of rows.
    pub total: usize,
    /// Number of distinct participants.
    pub unique_participants: usize,
}

/// No-show totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct NoShowCount {
    /// Number of rows.
    pub total: usize,
    /// Number of distinct participants.
    pub unique_participants: usize,
}

/// No-shows of one participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantNoShows {
    /// Number of rows.
    pub total: usize,
    /// Rows, most recent first.
    pub data: Vec<NoShowView>,
}

/// No-show operations.
#[derive(Debug, Clone)]
pub struct NoShowService {
    store: Arc<dyn Store>,
    attendance: AttendanceService,
    blocklist: Arc<BlocklistService>,
}

impl NoShowService {
    /// Creates a new `NoShowService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        attendance: AttendanceService,
        blocklist: Arc<BlocklistService>,
    ) -> Self {
        Self {
            store,
            attendance,
            blocklist,
        }
    }

    async fn collect(&self, participant: Option<ParticipantId>) -> Result<Vec<NoShowView>, AppError> {
        let scope: Vec<ParticipantId> = participant.into_iter().collect();
        let mut attendance_filter = AttendanceFilter::all().status(AttendanceStatus::NotAttended);
        let mut no_show_filter = NoShowFilter::all();
        if participant.is_some() {
            attendance_filter = attendance_filter.participants(&scope);
            no_show_filter = no_show_filter.participants(&scope);
        }

        let (absent, no_shows, events) = tokio::try_join!(
            self.store.list_attendance(&attendance_filter),
            self.store.list_no_shows(&no_show_filter),
            self.store.list_events(),
        )?;

        let participant_ids: Vec<ParticipantId> = absent
            .iter()
            .map(|r| r.participant_id)
            .chain(no_shows.iter().map(|r| r.participant_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let participants: HashMap<ParticipantId, Participant> = self
            .store
            .participants_by_ids(&participant_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let events: HashMap<EventId, Event> = events.into_iter().map(|e| (e.id, e)).collect();

        let view = |id: uuid::Uuid,
                    source: NoShowSource,
                    event_id: EventId,
                    participant_id: ParticipantId,
                    marked_at: DateTime<Utc>,
                    created_at: DateTime<Utc>| {
            let participant = participants.get(&participant_id);
            NoShowView {
                id,
                source,
                event_id,
                event_name: events
                    .get(&event_id)
                    .map_or_else(|| "Unknown".to_string(), |e| e.name.clone()),
                participant_id,
                participant_name: participant
                    .map_or_else(|| "Unknown".to_string(), |p| p.name.clone()),
                participant_email: participant.map(|p| p.email.clone()).unwrap_or_default(),
                status: AttendanceStatus::NotAttended,
                marked_at,
                created_at,
            }
        };

        let mut rows: Vec<NoShowView> = absent
            .iter()
            .map(|r| {
                view(
                    *r.id.as_uuid(),
                    NoShowSource::Attendance,
                    r.event_id,
                    r.participant_id,
                    r.marked_at,
                    r.created_at,
                )
            })
            .chain(no_shows.iter().map(|r| {
                view(
                    *r.id.as_uuid(),
                    NoShowSource::NoShows,
                    r.event_id,
                    r.participant_id,
                    r.created_at,
                    r.created_at,
                )
            }))
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.marked_at));
        Ok(rows)
    }

    /// Every no-show with totals.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list(&self) -> Result<NoShowList, AppError> {
        let data = self.collect(None).await?;
        let unique_participants = unique_participants(&data);
        Ok(NoShowList {
            total: data.len(),
            unique_participants,
            data,
        })
    }

    /// No-show totals.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn count(&self) -> Result<NoShowCount, AppError> {
        let data = self.collect(None).await?;
        Ok(NoShowCount {
            total: data.len(),
            unique_participants: unique_participants(&data),
        })
    }

    /// No-shows of one participant.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn by_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<ParticipantNoShows, AppError> {
        let data = self.collect(Some(participant_id)).await?;
        Ok(ParticipantNoShows {
            total: data.len(),
            data,
        })
    }

    /// Records an absence as a `not_attended` attendance mark.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the event or participant is absent.
    pub async fn mark(
        &self,
        event_id: EventId,
        participant_id: ParticipantId,
    ) -> Result<AttendanceRecord, AppError> {
        self.attendance
            .mark(MarkAttendance {
                event_id,
                participant_id,
                status: AttendanceStatus::NotAttended,
            })
            .await
    }

    /// Removes a no-show by id from whichever table holds it, then
    /// re-evaluates the auto-block rule.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if neither table has the row.
    pub async fn delete(&self, id: uuid::Uuid) -> Result<(), AppError> {
        let attendance_id = AttendanceId::from_uuid(id);
        let participant_id = match self.store.get_attendance(attendance_id).await? {
            Some(row) if row.status == AttendanceStatus::NotAttended => {
                self.store
                    .delete_attendance(&AttendanceFilter::all().ids(&[attendance_id]))
                    .await?;
                row.participant_id
            }
            _ => {
                let no_show_id = NoShowId::from_uuid(id);
                let row = self
                    .store
                    .get_no_show(no_show_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("No-show record"))?;
                self.store
                    .delete_no_shows(&NoShowFilter::all().ids(&[no_show_id]))
                    .await?;
                row.participant_id
            }
        };

        self.blocklist.sync_participant(participant_id).await?;
        tracing::info!(%id, %participant_id, "no-show deleted");
        Ok(())
    }

    /// Every no-show rendered as CSV.
    ///
    /// # Errors
    ///
    /// Propagates store and encoding failures.
    pub async fn export_csv(&self) -> Result<String, AppError> {
        let rows = self.collect(None).await?;
        csv_codec::write_no_shows_csv(&rows)
    }
}

fn unique_participants(rows: &[NoShowView]) -> usize {
    rows.iter()
        .map(|r| r.participant_id)
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::NoShowRecord;
    use crate::service::blocklist_service::BlocklistSettings;
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: NoShowService,
        event: EventId,
        ann: ParticipantId,
        bob: ParticipantId,
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
        let bob = Participant::new("Bob", "bob@x.com");
        let (Ok(_), Ok(_)) = (
            store.insert_event(&event).await,
            store.insert_participants(&[ann.clone(), bob.clone()]).await,
        ) else {
            panic!("seed failed");
        };
        let dyn_store = Arc::clone(&store) as Arc<dyn Store>;
        let blocklist = Arc::new(BlocklistService::new(
            Arc::clone(&dyn_store),
            BlocklistSettings {
                no_show_threshold: 3,
                auto_block_enabled: true,
            },
        ));
        let attendance = AttendanceService::new(Arc::clone(&dyn_store), Arc::clone(&blocklist));
        Fixture {
            service: NoShowService::new(dyn_store, attendance, blocklist),
            store,
            event: event.id,
            ann: ann.id,
            bob: bob.id,
        }
    }

    #[tokio::test]
    async fn list_merges_both_tables() {
        let f = fixture().await;
        let absent = AttendanceRecord::new(f.event, f.ann, AttendanceStatus::NotAttended);
        let present = AttendanceRecord::new(f.event, f.bob, AttendanceStatus::Attended);
        let (Ok(_), Ok(_)) = (
            f.store.insert_attendance(&[absent, present]).await,
            f.store
                .insert_no_shows(&[NoShowRecord::new(f.event, f.ann)])
                .await,
        ) else {
            panic!("seed failed");
        };

        let Ok(list) = f.service.list().await else {
            panic!("list failed");
        };
        assert_eq!(list.total, 2);
        assert_eq!(list.unique_participants, 1);
        assert!(list.data.iter().all(|r| r.event_name == "Meetup" && r.participant_name == "Ann"));
        assert_eq!(
            f.service.count().await.ok(),
            Some(NoShowCount {
                total: 2,
                unique_participants: 1,
            })
        );
    }

    #[tokio::test]
    async fn delete_finds_row_in_either_table() {
        let f = fixture().await;
        let Ok(marked) = f.service.mark(f.event, f.bob).await else {
            panic!("mark failed");
        };
        let extra = NoShowRecord::new(EventId::new(), f.bob);
        let Ok(_) = f.store.insert_no_shows(std::slice::from_ref(&extra)).await else {
            panic!("seed failed");
        };

        tokio_test::assert_ok!(f.service.delete(*marked.id.as_uuid()).await);
        tokio_test::assert_ok!(f.service.delete(*extra.id.as_uuid()).await);
        let Ok(view) = f.service.by_participant(f.bob).await else {
            panic!("view failed");
        };
        assert_eq!(view.total, 0);

        let missing = f.service.delete(uuid::Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn attended_row_is_not_deleted_as_no_show() {
        let f = fixture().await;
        let present = AttendanceRecord::new(f.event, f.bob, AttendanceStatus::Attended);
        let Ok(_) = f.store.insert_attendance(std::slice::from_ref(&present)).await else {
            panic!("seed failed");
        };
        let result = f.service.delete(*present.id.as_uuid()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn export_has_header_and_one_line_per_row() {
        let f = fixture().await;
        tokio_test::assert_ok!(f.service.mark(f.event, f.ann).await);
        let Ok(csv) = f.service.export_csv().await else {
            panic!("export failed");
        };
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("\"Meetup\""));
    }
}
