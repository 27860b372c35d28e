//! Application users and their roles.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UnknownVariant;
use super::ids::UserId;

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May read and write.
    Admin,
    /// Read-only.
    User,
}

impl Role {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

/// Approval state of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Waiting for an existing admin to approve.
    Pending,
    /// Allowed to sign in.
    Approved,
}

impl UserStatus {
    /// Wire and column representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}

impl FromStr for UserStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            other => Err(UnknownVariant::new("user status", other)),
        }
    }
}

/// A stored user account, including its password hash.
///
/// Never serialize this directly to clients; use [`PublicUser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalized e-mail address (unique).
    pub email: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
    /// Access level.
    pub role: Role,
    /// Approval state.
    pub status: UserStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// When an admin approved this account.
    pub approved_at: Option<DateTime<Utc>>,
    /// Who approved this account.
    pub approved_by: Option<UserId>,
}

/// Client-safe projection of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// E-mail address.
    pub email: String,
    /// Access level.
    pub role: Role,
    /// Approval state.
    pub status: UserStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Approval timestamp.
    pub approved_at: Option<DateTime<Utc>>,
    /// Approving admin.
    pub approved_by: Option<UserId>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
            approved_at: user.approved_at,
            approved_by: user.approved_by,
        }
    }
}
