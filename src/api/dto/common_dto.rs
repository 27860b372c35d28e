//! Shared DTO types used across multiple endpoints.

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

/// Success envelope wrapping every JSON response body.
///
/// ```json
/// { "success": true, "data": { ... }, "timestamp": "2024-05-01T12:00:00Z" }
/// ```
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Payload.
    pub data: T,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// Wraps `data` in a success envelope stamped now.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// A bare confirmation message.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

impl MessageResponse {
    /// Builds a message payload.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A single counter.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct CountResponse {
    /// The count.
    pub count: u64,
}
