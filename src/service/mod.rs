//! Service layer: business logic orchestration.
//!
//! Each service wraps one or more [`crate::store::Store`] calls into a named
//! operation with input validation and error mapping. [`RosterService`] and
//! [`ImportService`] carry the delete/undo and import/revert workflows.

pub mod attendance_service;
pub mod audit_trail;
pub mod auth_service;
pub mod blocklist_service;
pub mod csv_codec;
pub mod dashboard_service;
pub mod event_service;
pub mod import_service;
pub mod no_show_service;
pub mod participant_service;
pub mod roster_service;
pub mod volunteer_service;

pub use attendance_service::AttendanceService;
pub use audit_trail::AuditTrail;
pub use auth_service::AuthService;
pub use blocklist_service::BlocklistService;
pub use dashboard_service::DashboardService;
pub use event_service::EventService;
pub use import_service::ImportService;
pub use no_show_service::NoShowService;
pub use participant_service::ParticipantService;
pub use roster_service::RosterService;
pub use volunteer_service::VolunteerService;
