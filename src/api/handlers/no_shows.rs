//! No-show handlers. A no-show is either a `not_attended` attendance row or
//! a row of the `no_shows` table; listings merge both.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, MarkNoShowRequest, MessageResponse};
use crate::api::extract::{ApiJson, ApiPath};
use crate::app_state::AppState;
use crate::domain::{AttendanceRecord, ParticipantId};
use crate::error::{AppError, ErrorResponse};
use crate::service::no_show_service::{NoShowCount, NoShowList, ParticipantNoShows};

/// `GET /api/no-shows`: Every no-show with event and participant names.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/no-shows",
    tag = "No-shows",
    summary = "List no-shows",
    responses(
        (status = 200, description = "No-shows, newest first", body = ApiResponse<NoShowList>),
    )
)]
pub async fn list_no_shows(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.no_shows.list().await?)))
}

/// `GET /api/no-shows/count`: Totals only.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/no-shows/count",
    tag = "No-shows",
    summary = "Count no-shows",
    responses(
        (status = 200, description = "Totals", body = ApiResponse<NoShowCount>),
    )
)]
pub async fn count_no_shows(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.no_shows.count().await?)))
}

/// `GET /api/no-shows/participant/{id}`: No-shows of one participant.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/no-shows/participant/{id}",
    tag = "No-shows",
    summary = "No-shows by participant",
    params(("id" = uuid::Uuid, Path, description = "Participant UUID")),
    responses(
        (status = 200, description = "No-shows", body = ApiResponse<ParticipantNoShows>),
    )
)]
pub async fn by_participant(
    State(state): State<AppState>,
    ApiPath(participant_id): ApiPath<ParticipantId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(
        state.no_shows.by_participant(participant_id).await?,
    )))
}

/// `GET /api/no-shows/export/csv`: Download every no-show as CSV.
///
/// # Errors
///
/// Propagates store and encoding failures.
#[utoipa::path(
    get,
    path = "/api/no-shows/export/csv",
    tag = "No-shows",
    summary = "Export no-shows",
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
    )
)]
pub async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.no_shows.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"no-shows.csv\""),
        ],
        body,
    ))
}

/// `POST /api/no-shows`: Record an absence.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the event or participant is absent.
#[utoipa::path(
    post,
    path = "/api/no-shows",
    tag = "No-shows",
    summary = "Mark no-show",
    description = "Stored as a `not_attended` attendance row; the auto-block rule is re-evaluated.",
    request_body = MarkNoShowRequest,
    responses(
        (status = 200, description = "Attendance row", body = ApiResponse<AttendanceRecord>),
        (status = 404, description = "Event or participant not found", body = ErrorResponse),
    )
)]
pub async fn mark_no_show(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<MarkNoShowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.no_shows.mark(req.event_id, req.participant_id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// `DELETE /api/no-shows/{id}`: Remove a no-show from whichever table
/// holds it.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if neither table has the id.
#[utoipa::path(
    delete,
    path = "/api/no-shows/{id}",
    tag = "No-shows",
    summary = "Delete no-show",
    params(("id" = uuid::Uuid, Path, description = "Attendance or no-show UUID")),
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<MessageResponse>),
        (status = 404, description = "No-show record not found", body = ErrorResponse),
    )
)]
pub async fn delete_no_show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<uuid::Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.no_shows.delete(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("No-show record deleted"))))
}

/// No-show routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/no-shows", get(list_no_shows).post(mark_no_show))
        .route("/no-shows/count", get(count_no_shows))
        .route("/no-shows/participant/{id}", get(by_participant))
        .route("/no-shows/export/csv", get(export_csv))
        .route("/no-shows/{id}", delete(delete_no_show))
}
