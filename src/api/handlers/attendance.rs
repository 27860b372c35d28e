//! Attendance handlers: marking, listings, status changes, imports.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, UpdateAttendanceRequest};
use crate::api::extract::{ApiJson, ApiPath};
use crate::app_state::AppState;
use crate::domain::{AttendanceId, AttendanceRecord, EventId, ParticipantId};
use crate::error::{AppError, ErrorResponse};
use crate::service::attendance_service::{AttendanceStats, MarkAttendance};
use crate::service::import_service::{AttendanceImport, AttendanceImportResult};

/// `POST /api/attendance`: Mark one participant at one event.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the event or participant is absent.
#[utoipa::path(
    post,
    path = "/api/attendance",
    tag = "Attendance",
    summary = "Mark attendance",
    description = "Creates or overwrites the (event, participant) row, then re-evaluates the auto-block rule for the participant.",
    request_body = MarkAttendance,
    responses(
        (status = 201, description = "Attendance recorded", body = ApiResponse<AttendanceRecord>),
        (status = 404, description = "Event or participant not found", body = ErrorResponse),
    )
)]
pub async fn mark_attendance(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<MarkAttendance>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.attendance.mark(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(record))))
}

/// `POST /api/attendance/import`: Apply many attendance rows as one
/// revertible import session.
///
/// # Errors
///
/// Returns [`AppError`] for an unknown event or an unresolvable row.
#[utoipa::path(
    post,
    path = "/api/attendance/import",
    tag = "Attendance",
    summary = "Import attendance",
    description = "Opens an attendance import session, snapshots each row's previous state, and applies the rows. Revert the session via `DELETE /api/imports/{id}`.",
    request_body = AttendanceImport,
    responses(
        (status = 201, description = "Import applied", body = ApiResponse<AttendanceImportResult>),
        (status = 400, description = "Invalid row", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn import_attendance(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AttendanceImport>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.imports.import_attendance(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(result))))
}

/// `GET /api/attendance/event/{id}`: Rows of one event.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/attendance/event/{id}",
    tag = "Attendance",
    summary = "Attendance by event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Attendance rows", body = ApiResponse<Vec<AttendanceRecord>>),
    )
)]
pub async fn by_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.attendance.by_event(event_id).await?)))
}

/// `GET /api/attendance/participant/{id}`: Rows of one participant.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/attendance/participant/{id}",
    tag = "Attendance",
    summary = "Attendance by participant",
    params(("id" = uuid::Uuid, Path, description = "Participant UUID")),
    responses(
        (status = 200, description = "Attendance rows", body = ApiResponse<Vec<AttendanceRecord>>),
    )
)]
pub async fn by_participant(
    State(state): State<AppState>,
    ApiPath(participant_id): ApiPath<ParticipantId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(
        state.attendance.by_participant(participant_id).await?,
    )))
}

/// `PUT /api/attendance/{id}`: Change the status of one row.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the row is absent.
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    tag = "Attendance",
    summary = "Update attendance status",
    params(("id" = uuid::Uuid, Path, description = "Attendance UUID")),
    request_body = UpdateAttendanceRequest,
    responses(
        (status = 200, description = "Updated row", body = ApiResponse<AttendanceRecord>),
        (status = 404, description = "Attendance record not found", body = ErrorResponse),
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AttendanceId>,
    ApiJson(req): ApiJson<UpdateAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.attendance.update_status(id, req.status).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// `GET /api/attendance/stats/overview`: Attendance counters.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/attendance/stats/overview",
    tag = "Attendance",
    summary = "Attendance counters",
    responses(
        (status = 200, description = "Counters", body = ApiResponse<AttendanceStats>),
    )
)]
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.attendance.stats().await?)))
}

/// Attendance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", post(mark_attendance))
        .route("/attendance/import", post(import_attendance))
        .route("/attendance/event/{id}", get(by_event))
        .route("/attendance/participant/{id}", get(by_participant))
        .route("/attendance/stats/overview", get(stats))
        .route("/attendance/{id}", put(update_status))
}
