//! Blocklist and blocklist-settings handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::api::dto::{AddBlocklistRequest, ApiResponse, MessageResponse};
use crate::api::extract::{ApiJson, ApiPath};
use crate::app_state::AppState;
use crate::domain::{BlocklistEntry, ParticipantId};
use crate::error::{AppError, ErrorResponse};
use crate::service::blocklist_service::{BlocklistSettings, SettingsPatch};

/// `POST /api/blocklist`: Block a participant.
///
/// # Errors
///
/// Returns [`AppError`] for a blank reason or an unknown participant.
#[utoipa::path(
    post,
    path = "/api/blocklist",
    tag = "Blocklist",
    summary = "Add to blocklist",
    request_body = AddBlocklistRequest,
    responses(
        (status = 201, description = "Entry created", body = ApiResponse<BlocklistEntry>),
        (status = 400, description = "Missing required fields", body = ErrorResponse),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn add_entry(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AddBlocklistRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.blocklist.add(req.participant_id, &req.reason).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))))
}

/// `GET /api/blocklist`: Every entry, newest first.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/blocklist",
    tag = "Blocklist",
    summary = "List blocklist",
    responses(
        (status = 200, description = "Entries", body = ApiResponse<Vec<BlocklistEntry>>),
    )
)]
pub async fn list_entries(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.blocklist.list().await?)))
}

/// `DELETE /api/blocklist/{participant_id}`: Unblock a participant.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the participant does not exist.
#[utoipa::path(
    delete,
    path = "/api/blocklist/{participant_id}",
    tag = "Blocklist",
    summary = "Remove from blocklist",
    params(("participant_id" = uuid::Uuid, Path, description = "Participant UUID")),
    responses(
        (status = 200, description = "Unblocked", body = ApiResponse<MessageResponse>),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn remove_entry(
    State(state): State<AppState>,
    ApiPath(participant_id): ApiPath<ParticipantId>,
) -> Result<impl IntoResponse, AppError> {
    state.blocklist.remove(participant_id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Participant removed from blocklist",
    ))))
}

/// `GET /api/settings`: Auto-block settings.
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Blocklist",
    summary = "Get settings",
    responses(
        (status = 200, description = "Current settings", body = ApiResponse<BlocklistSettings>),
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.blocklist.settings().await))
}

/// `PUT /api/settings`: Change auto-block settings.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] for a zero threshold.
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Blocklist",
    summary = "Update settings",
    request_body = SettingsPatch,
    responses(
        (status = 200, description = "Updated settings", body = ApiResponse<BlocklistSettings>),
        (status = 400, description = "Invalid threshold", body = ErrorResponse),
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<SettingsPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.blocklist.update_settings(patch).await?)))
}

/// Blocklist and settings routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/blocklist", get(list_entries).post(add_entry))
        .route("/blocklist/{participant_id}", delete(remove_entry))
        .route("/settings", get(get_settings).put(update_settings))
}
