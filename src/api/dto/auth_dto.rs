//! Auth DTOs not already covered by the auth service types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{PublicUser, UserId};

/// Request body for `POST /api/auth/admin/approve`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApproveRequest {
    /// Pending admin to approve.
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// A single account wrapped under `user`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    /// The account.
    pub user: PublicUser,
}
