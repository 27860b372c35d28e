//! Dashboard counters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{AttendanceRecord, AttendanceStatus};
use crate::error::AppError;
use crate::service::attendance_service::{AttendanceService, AttendanceStats};
use crate::store::{AttendanceFilter, NoShowFilter, Store};

const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Headline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardSummary {
    /// Number of events.
    pub events: u64,
    /// Participants that are not blocklisted.
    pub participants: u64,
    /// `not_attended` attendance rows plus `no_shows` rows.
    pub no_shows: u64,
    /// Blocklist entries.
    pub blocklisted: u64,
    /// When the counters were read.
    pub last_updated: DateTime<Utc>,
}

/// Summary plus the most recently marked attendance rows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardOverview {
    /// Headline counters.
    pub summary: DashboardSummary,
    /// Latest attendance rows by `marked_at`, newest first.
    pub recent_activities: Vec<AttendanceRecord>,
}

/// Read-only aggregate queries.
#[derive(Debug, Clone)]
pub struct DashboardService {
    store: Arc<dyn Store>,
    attendance: AttendanceService,
}

impl DashboardService {
    /// Creates a new `DashboardService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, attendance: AttendanceService) -> Self {
        Self { store, attendance }
    }

    /// Headline counters, read concurrently.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn summary(&self) -> Result<DashboardSummary, AppError> {
        let absent = AttendanceFilter::all().status(AttendanceStatus::NotAttended);
        let no_show_rows = NoShowFilter::all();
        let (events, participants, absent, no_show_rows, blocklisted) = tokio::try_join!(
            self.store.count_events(),
            self.store.count_participants(Some(false)),
            self.store.count_attendance(&absent),
            self.store.count_no_shows(&no_show_rows),
            self.store.count_blocklist(),
        )?;
        Ok(DashboardSummary {
            events,
            participants,
            no_shows: absent + no_show_rows,
            blocklisted,
            last_updated: Utc::now(),
        })
    }

    /// Attendance counters.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn stats(&self) -> Result<AttendanceStats, AppError> {
        self.attendance.stats().await
    }

    /// Summary and recent attendance activity.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn overview(&self) -> Result<DashboardOverview, AppError> {
        let all = AttendanceFilter::all();
        let (summary, mut rows) = tokio::try_join!(
            self.summary(),
            async { self.store.list_attendance(&all).await.map_err(AppError::from) },
        )?;
        rows.sort_by(|a, b| b.marked_at.cmp(&a.marked_at));
        rows.truncate(RECENT_ACTIVITY_LIMIT);
        Ok(DashboardOverview {
            summary,
            recent_activities: rows,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{BlocklistEntry, BlocklistId, Event, EventId, NoShowRecord, Participant};
    use crate::service::blocklist_service::{BlocklistService, BlocklistSettings};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn summary_counts_both_no_show_sources() {
        let store = Arc::new(MemoryStore::new());
        let dyn_store = Arc::clone(&store) as Arc<dyn Store>;
        let blocklist = Arc::new(BlocklistService::new(
            Arc::clone(&dyn_store),
            BlocklistSettings {
                no_show_threshold: 5,
                auto_block_enabled: false,
            },
        ));
        let attendance = AttendanceService::new(Arc::clone(&dyn_store), blocklist);
        let service = DashboardService::new(dyn_store, attendance);

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
        let mut bo = Participant::new("Bo", "bo@x.com");
        bo.is_blocklisted = true;
        let ann = Participant::new("Ann", "ann@x.com");
        let cy = Participant::new("Cy", "cy@x.com");
        let entry = BlocklistEntry {
            id: BlocklistId::new(),
            participant_id: bo.id,
            reason: "manual".to_string(),
            created_at: now,
        };
        let (Ok(_), Ok(_), Ok(_)) = (
            store.insert_event(&event).await,
            store
                .insert_participants(&[bo.clone(), ann.clone(), cy.clone()])
                .await,
            store.insert_blocklist_entry(&entry).await,
        ) else {
            panic!("seed failed");
        };
        let (Ok(_), Ok(_)) = (
            store
                .insert_attendance(&[
                    AttendanceRecord::new(event.id, ann.id, AttendanceStatus::Attended),
                    AttendanceRecord::new(event.id, cy.id, AttendanceStatus::NotAttended),
                ])
                .await,
            store.insert_no_shows(&[NoShowRecord::new(event.id, bo.id)]).await,
        ) else {
            panic!("seed failed");
        };

        let Ok(summary) = service.summary().await else {
            panic!("summary failed");
        };
        assert_eq!(summary.events, 1);
        assert_eq!(summary.participants, 2);
        assert_eq!(summary.no_shows, 2);
        assert_eq!(summary.blocklisted, 1);

        let Ok(stats) = service.stats().await else {
            panic!("stats failed");
        };
        assert_eq!(stats.total, 3);
        assert_eq!(stats.attended, 1);

        let Ok(overview) = service.overview().await else {
            panic!("overview failed");
        };
        assert_eq!(overview.recent_activities.len(), 2);
        assert_eq!(overview.summary.events, 1);
    }
}
