//! Participant handlers: CRUD, counters, bulk and CSV import.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, BulkImportRequest, CountResponse, CsvImportParams, ListParticipantsParams,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::domain::{Participant, ParticipantId, ParticipantPatch};
use crate::error::{AppError, ErrorResponse};
use crate::service::csv_codec::parse_participant_csv;
use crate::service::participant_service::{BulkImportResult, NewParticipant};

/// `POST /api/participants`: Create a participant.
///
/// # Errors
///
/// Returns [`AppError`] on a missing field or a taken e-mail.
#[utoipa::path(
    post,
    path = "/api/participants",
    tag = "Participants",
    summary = "Create participant",
    request_body = NewParticipant,
    responses(
        (status = 201, description = "Participant created", body = ApiResponse<Participant>),
        (status = 400, description = "Invalid participant", body = ErrorResponse),
        (status = 409, description = "E-mail already registered", body = ErrorResponse),
    )
)]
pub async fn create_participant(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewParticipant>,
) -> Result<impl IntoResponse, AppError> {
    let participant = state.participants.create(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(participant))))
}

/// `GET /api/participants`: List participants.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/participants",
    tag = "Participants",
    summary = "List participants",
    description = "Blocklisted participants are hidden unless `includeBlocklisted=true`.",
    params(ListParticipantsParams),
    responses(
        (status = 200, description = "Participants", body = ApiResponse<Vec<Participant>>),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParticipantsParams>,
) -> Result<impl IntoResponse, AppError> {
    let participants = state.participants.list(params.include_blocklisted).await?;
    Ok(Json(ApiResponse::ok(participants)))
}

/// `GET /api/participants/{id}`: One participant.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if absent.
#[utoipa::path(
    get,
    path = "/api/participants/{id}",
    tag = "Participants",
    summary = "Get participant",
    params(("id" = uuid::Uuid, Path, description = "Participant UUID")),
    responses(
        (status = 200, description = "Participant", body = ApiResponse<Participant>),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn get_participant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ParticipantId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.participants.get(id).await?)))
}

/// `PUT /api/participants/{id}`: Partial update.
///
/// # Errors
///
/// Returns [`AppError`] for a blanked field or an unknown id.
#[utoipa::path(
    put,
    path = "/api/participants/{id}",
    tag = "Participants",
    summary = "Update participant",
    params(("id" = uuid::Uuid, Path, description = "Participant UUID")),
    request_body = ParticipantPatch,
    responses(
        (status = 200, description = "Updated participant", body = ApiResponse<Participant>),
        (status = 404, description = "Participant not found", body = ErrorResponse),
    )
)]
pub async fn update_participant(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ParticipantId>,
    ApiJson(patch): ApiJson<ParticipantPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.participants.update(id, patch).await?)))
}

/// `GET /api/participants/stats/active`: Participants not blocklisted.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/participants/stats/active",
    tag = "Participants",
    summary = "Active participant count",
    responses(
        (status = 200, description = "Count", body = ApiResponse<CountResponse>),
    )
)]
pub async fn active_count(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let count = state.participants.active_count().await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// `GET /api/participants/stats/blocklisted`: Blocklisted participants.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/participants/stats/blocklisted",
    tag = "Participants",
    summary = "Blocklisted participant count",
    responses(
        (status = 200, description = "Count", body = ApiResponse<CountResponse>),
    )
)]
pub async fn blocklisted_count(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let count = state.participants.blocklisted_count().await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// `POST /api/participants/bulk-import`: Create participants, skipping
/// known e-mails.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] if any row lacks an e-mail.
#[utoipa::path(
    post,
    path = "/api/participants/bulk-import",
    tag = "Participants",
    summary = "Bulk import participants",
    description = "E-mails are normalized and deduplicated within the batch and against the store. Only unseen e-mails are inserted, tagged with `import_session_id` when given.",
    request_body = BulkImportRequest,
    responses(
        (status = 201, description = "Import applied", body = ApiResponse<BulkImportResult>),
        (status = 400, description = "A row lacks an e-mail", body = ErrorResponse),
    )
)]
pub async fn bulk_import(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BulkImportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .participants
        .bulk_import(&req.participants, req.import_session_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(result))))
}

/// `POST /api/participants/import-csv`: Bulk import from a CSV body.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] for unreadable CSV, a missing
/// `email` column, or a row without an e-mail.
#[utoipa::path(
    post,
    path = "/api/participants/import-csv",
    tag = "Participants",
    summary = "Import participants from CSV",
    description = "Headers are matched case- and space-insensitively: `email` is required, the name comes from `full_name` or `name`.",
    params(CsvImportParams),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 201, description = "Import applied", body = ApiResponse<BulkImportResult>),
        (status = 400, description = "Unreadable CSV", body = ErrorResponse),
    )
)]
pub async fn import_csv(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CsvImportParams>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let records = parse_participant_csv(&body, params.event_id)?;
    tracing::debug!(rows = records.len(), "parsed participant csv");
    let result = state
        .participants
        .bulk_import(&records, params.import_session_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(result))))
}

/// Participant routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/participants",
            get(list_participants).post(create_participant),
        )
        .route("/participants/stats/active", get(active_count))
        .route("/participants/stats/blocklisted", get(blocklisted_count))
        .route("/participants/bulk-import", post(bulk_import))
        .route("/participants/import-csv", post(import_csv))
        .route(
            "/participants/{id}",
            get(get_participant).put(update_participant),
        )
}
