//! Data Transfer Objects for REST request/response serialization.
//!
//! Service-level request and result types that already derive
//! `Deserialize`/`Serialize` are used directly; this module holds the
//! shapes that exist only at the HTTP boundary.

pub mod attendance_dto;
pub mod auth_dto;
pub mod common_dto;
pub mod participant_dto;
pub mod roster_dto;
pub mod volunteer_dto;

pub use attendance_dto::*;
pub use auth_dto::*;
pub use common_dto::*;
pub use participant_dto::*;
pub use roster_dto::*;
pub use volunteer_dto::*;
