//! Import session handlers: open, history, detail, revert.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, ImportListParams};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::domain::{ImportSession, ImportSessionId};
use crate::error::{AppError, ErrorResponse};
use crate::service::import_service::{ImportDetail, NewImportSession, RevertOutcome};

/// `POST /api/imports`: Open an import session.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the event does not exist.
#[utoipa::path(
    post,
    path = "/api/imports",
    tag = "Imports",
    summary = "Open import session",
    description = "Creates an active session. Pass its id as `import_session_id` to bulk import so the created rows can be reverted together.",
    request_body = NewImportSession,
    responses(
        (status = 201, description = "Session created", body = ApiResponse<ImportSession>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewImportSession>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.imports.create_session(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(session))))
}

/// `GET /api/imports?event_id=&days=`: Recent sessions of an event.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] without `event_id`.
#[utoipa::path(
    get,
    path = "/api/imports",
    tag = "Imports",
    summary = "Import history",
    params(ImportListParams),
    responses(
        (status = 200, description = "Sessions, newest first", body = ApiResponse<Vec<ImportSession>>),
        (status = 400, description = "event_id is required", body = ErrorResponse),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ImportListParams>,
) -> Result<impl IntoResponse, AppError> {
    let event_id = params
        .event_id
        .ok_or_else(|| AppError::InvalidRequest("event_id is required".to_string()))?;
    let sessions = state.imports.list(event_id, params.days).await?;
    Ok(Json(ApiResponse::ok(sessions)))
}

/// `GET /api/imports/{id}`: One session with its audit trail.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the session does not exist.
#[utoipa::path(
    get,
    path = "/api/imports/{id}",
    tag = "Imports",
    summary = "Import session detail",
    params(("id" = uuid::Uuid, Path, description = "Import session UUID")),
    responses(
        (status = 200, description = "Session and audit log", body = ApiResponse<ImportDetail>),
        (status = 404, description = "Import session not found", body = ErrorResponse),
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ImportSessionId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.imports.detail(id).await?)))
}

/// `DELETE /api/imports/{id}`: Revert an import.
///
/// # Errors
///
/// - [`AppError::ImportTooOld`] past the revert window.
/// - [`AppError::NotFound`] if absent or already reverted.
#[utoipa::path(
    delete,
    path = "/api/imports/{id}",
    tag = "Imports",
    summary = "Revert import",
    description = "Participant imports delete the tagged participants with their rows. Attendance imports restore each row's previous status and blocklist flag from snapshots and delete participants the import created.",
    params(("id" = uuid::Uuid, Path, description = "Import session UUID")),
    responses(
        (status = 200, description = "Reverted", body = ApiResponse<RevertOutcome>),
        (status = 403, description = "Import older than 30 days", body = ErrorResponse),
        (status = 404, description = "Not found or already reverted", body = ErrorResponse),
    )
)]
pub async fn revert_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ImportSessionId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.imports.revert(id).await?)))
}

/// Import routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/imports", get(list_sessions).post(create_session))
        .route("/imports/{id}", get(get_session).delete(revert_session))
}
