//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenSigner;
use crate::config::AppConfig;
use crate::domain::BackupStore;
use crate::service::blocklist_service::BlocklistSettings;
use crate::service::{
    AttendanceService, AuditTrail, AuthService, BlocklistService, DashboardService, EventService,
    ImportService, NoShowService, ParticipantService, RosterService, VolunteerService,
};
use crate::store::Store;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event CRUD.
    pub events: Arc<EventService>,
    /// Participant CRUD and bulk import.
    pub participants: Arc<ParticipantService>,
    /// Per-event roster views, delete-with-backup and undo.
    pub roster: Arc<RosterService>,
    /// Attendance marking and counters.
    pub attendance: Arc<AttendanceService>,
    /// No-show views and export.
    pub no_shows: Arc<NoShowService>,
    /// Blocklist and its settings.
    pub blocklist: Arc<BlocklistService>,
    /// Import sessions, history and revert.
    pub imports: Arc<ImportService>,
    /// Signup, login and approval.
    pub auth: Arc<AuthService>,
    /// Dashboard counters.
    pub dashboard: Arc<DashboardService>,
    /// Volunteers, their turnout and work.
    pub volunteers: Arc<VolunteerService>,
    /// Bearer token verification for the auth middleware.
    pub tokens: Arc<TokenSigner>,
}

impl AppState {
    /// Wires every service over one store, one backup store and one
    /// audit trail.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        backups: Arc<dyn BackupStore>,
        audit: AuditTrail,
        config: &AppConfig,
    ) -> Self {
        let tokens = Arc::new(TokenSigner::new(&config.jwt_secret, config.token_ttl_hours));
        let blocklist = Arc::new(BlocklistService::new(
            Arc::clone(&store),
            BlocklistSettings {
                no_show_threshold: config.no_show_block_threshold,
                auto_block_enabled: config.auto_block_enabled,
            },
        ));
        let attendance = AttendanceService::new(Arc::clone(&store), Arc::clone(&blocklist));

        Self {
            events: Arc::new(EventService::new(Arc::clone(&store), Arc::clone(&backups))),
            participants: Arc::new(ParticipantService::new(Arc::clone(&store))),
            roster: Arc::new(RosterService::new(Arc::clone(&store), backups)),
            no_shows: Arc::new(NoShowService::new(
                Arc::clone(&store),
                attendance.clone(),
                Arc::clone(&blocklist),
            )),
            imports: Arc::new(ImportService::new(
                Arc::clone(&store),
                audit,
                Arc::clone(&blocklist),
            )),
            auth: Arc::new(AuthService::new(
                Arc::clone(&store),
                Arc::clone(&tokens),
                config.bcrypt_cost,
            )),
            volunteers: Arc::new(VolunteerService::new(Arc::clone(&store))),
            dashboard: Arc::new(DashboardService::new(store, attendance.clone())),
            attendance: Arc::new(attendance),
            blocklist,
            tokens,
        }
    }
}
