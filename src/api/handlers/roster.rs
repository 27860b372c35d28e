//! Per-event roster handlers: listings, delete-with-backup and undo.
//!
//! Every delete answers with an `undo_token`. Presenting it once to
//! `undo-delete` together with the matching `type` restores what was
//! removed; a second delete of the same event replaces the backup.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, BulkDeleteAttendanceRequest, BulkDeleteParticipantsRequest, UndoDeleteRequest,
};
use crate::api::extract::{ApiJson, ApiPath};
use crate::app_state::AppState;
use crate::domain::EventId;
use crate::error::{AppError, ErrorResponse};
use crate::service::roster_service::{DeleteOutcome, EventAttendance, EventParticipant, UndoOutcome};

/// `GET /api/events/{id}/participants`: Participants with a row at the
/// event.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/events/{id}/participants",
    tag = "Roster",
    summary = "List event participants",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Participants, by name", body = ApiResponse<Vec<EventParticipant>>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.roster.participants(event_id).await?)))
}

/// `DELETE /api/events/{id}/participants`: Remove every participant from
/// the event.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the event does not exist.
#[utoipa::path(
    delete,
    path = "/api/events/{id}/participants",
    tag = "Roster",
    summary = "Delete all event participants",
    description = "Backs up and deletes the event's attendance and no-show rows, then deletes participants no longer referenced anywhere.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Deleted; undo token issued", body = ApiResponse<DeleteOutcome>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_all_participants(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.roster.delete_all_participants(event_id).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// `POST /api/events/{id}/participants/bulk-delete`: Remove selected
/// participants from the event.
///
/// # Errors
///
/// Returns [`AppError`] for an empty selection or an unknown event.
#[utoipa::path(
    post,
    path = "/api/events/{id}/participants/bulk-delete",
    tag = "Roster",
    summary = "Delete selected event participants",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = BulkDeleteParticipantsRequest,
    responses(
        (status = 200, description = "Deleted; undo token issued", body = ApiResponse<DeleteOutcome>),
        (status = 400, description = "Empty selection", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_selected_participants(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
    ApiJson(req): ApiJson<BulkDeleteParticipantsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .roster
        .delete_selected_participants(event_id, &req.participant_ids)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// `GET /api/events/{id}/participants/attendance`: Attendance rows of the
/// event with participant details.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/events/{id}/participants/attendance",
    tag = "Roster",
    summary = "List event attendance",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Attendance rows", body = ApiResponse<Vec<EventAttendance>>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_attendance(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.roster.attendance(event_id).await?)))
}

/// `DELETE /api/events/{id}/participants/attendance`: Remove every
/// attendance row of the event.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the event does not exist.
#[utoipa::path(
    delete,
    path = "/api/events/{id}/participants/attendance",
    tag = "Roster",
    summary = "Delete all event attendance",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Deleted; undo token issued", body = ApiResponse<DeleteOutcome>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_all_attendance(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.roster.delete_all_attendance(event_id).await?)))
}

/// `POST /api/events/{id}/participants/attendance/bulk-delete`: Remove
/// selected attendance rows.
///
/// # Errors
///
/// Returns [`AppError`] for an empty selection or an unknown event.
#[utoipa::path(
    post,
    path = "/api/events/{id}/participants/attendance/bulk-delete",
    tag = "Roster",
    summary = "Delete selected event attendance",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = BulkDeleteAttendanceRequest,
    responses(
        (status = 200, description = "Deleted; undo token issued", body = ApiResponse<DeleteOutcome>),
        (status = 400, description = "Empty selection", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_selected_attendance(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
    ApiJson(req): ApiJson<BulkDeleteAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .roster
        .delete_selected_attendance(event_id, &req.attendance_ids)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// `POST /api/events/{id}/participants/undo-delete`: Restore the latest
/// delete of the event.
///
/// # Errors
///
/// Returns [`AppError::UndoUnavailable`] when the token is unknown, used,
/// expired, or of the other type.
#[utoipa::path(
    post,
    path = "/api/events/{id}/participants/undo-delete",
    tag = "Roster",
    summary = "Undo delete",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = UndoDeleteRequest,
    responses(
        (status = 200, description = "Rows restored", body = ApiResponse<UndoOutcome>),
        (status = 409, description = "No undo available", body = ErrorResponse),
    )
)]
pub async fn undo_delete(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<EventId>,
    ApiJson(req): ApiJson<UndoDeleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .roster
        .undo_delete(event_id, req.kind, &req.undo_token)
        .await?;
    tracing::info!(event_id = %event_id, kind = %req.kind, restored = outcome.restored, "undo applied");
    Ok(Json(ApiResponse::ok(outcome)))
}

/// Roster routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/events/{id}/participants",
            get(list_participants).delete(delete_all_participants),
        )
        .route(
            "/events/{id}/participants/bulk-delete",
            post(delete_selected_participants),
        )
        .route(
            "/events/{id}/participants/attendance",
            get(list_attendance).delete(delete_all_attendance),
        )
        .route(
            "/events/{id}/participants/attendance/bulk-delete",
            post(delete_selected_attendance),
        )
        .route("/events/{id}/participants/undo-delete", post(undo_delete))
}
