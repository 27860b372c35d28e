//! Dashboard counters.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::ApiResponse;
use crate::app_state::AppState;
use crate::error::AppError;
use crate::service::attendance_service::AttendanceStats;
use crate::service::dashboard_service::{DashboardOverview, DashboardSummary};

/// `Cache-Control` for counter responses.
fn short_cache() -> [(header::HeaderName, &'static str); 1] {
    [(header::CACHE_CONTROL, "private, max-age=5")]
}

/// `GET /api/dashboard/summary`: Headline counters.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    summary = "Dashboard summary",
    responses(
        (status = 200, description = "Counters", body = ApiResponse<DashboardSummary>),
    )
)]
pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summary = state.dashboard.summary().await?;
    Ok((short_cache(), Json(ApiResponse::ok(summary))))
}

/// `GET /api/dashboard/stats`: Attendance counters.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "Dashboard",
    summary = "Dashboard attendance stats",
    responses(
        (status = 200, description = "Counters", body = ApiResponse<AttendanceStats>),
    )
)]
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = state.dashboard.stats().await?;
    Ok((short_cache(), Json(ApiResponse::ok(stats))))
}

/// `GET /api/dashboard/overview`: Counters and recent attendance.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/dashboard/overview",
    tag = "Dashboard",
    summary = "Dashboard overview",
    responses(
        (status = 200, description = "Counters and recent activity", body = ApiResponse<DashboardOverview>),
    )
)]
pub async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let overview = state.dashboard.overview().await?;
    Ok((short_cache(), Json(ApiResponse::ok(overview))))
}

/// Dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/summary", get(summary))
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/overview", get(overview))
}
