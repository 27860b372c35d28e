//! Volunteer handlers: CRUD, turnout history and stats, work assignments.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, AttendanceHistoryParams, ListVolunteersParams, MessageResponse,
    RecentAttendanceParams, UpdateWorkStatusRequest, VolunteerSort,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::domain::{Volunteer, VolunteerAttendance, VolunteerId, VolunteerPatch, VolunteerWork, VolunteerWorkId};
use crate::error::{AppError, ErrorResponse};
use crate::service::volunteer_service::{
    NewVolunteer, NewVolunteerWork, RecordVolunteerAttendance, VolunteerAttendancePage,
    VolunteerAttendanceStats, VolunteerAttendanceView, VolunteerWorkView,
};

/// `POST /api/volunteers`: Sign up a volunteer.
///
/// # Errors
///
/// Returns [`AppError`] on a missing field or a taken e-mail.
#[utoipa::path(
    post,
    path = "/api/volunteers",
    tag = "Volunteers",
    summary = "Create volunteer",
    request_body = NewVolunteer,
    responses(
        (status = 201, description = "Volunteer created", body = ApiResponse<Volunteer>),
        (status = 400, description = "Invalid volunteer", body = ErrorResponse),
        (status = 409, description = "E-mail already registered", body = ErrorResponse),
    )
)]
pub async fn create_volunteer(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewVolunteer>,
) -> Result<impl IntoResponse, AppError> {
    let volunteer = state.volunteers.create(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(volunteer))))
}

/// `GET /api/volunteers`: List volunteers by join date.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/volunteers",
    tag = "Volunteers",
    summary = "List volunteers",
    params(ListVolunteersParams),
    responses(
        (status = 200, description = "Volunteers", body = ApiResponse<Vec<Volunteer>>),
    )
)]
pub async fn list_volunteers(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListVolunteersParams>,
) -> Result<impl IntoResponse, AppError> {
    let oldest_first = params.sort == VolunteerSort::Oldest;
    Ok(Json(ApiResponse::ok(state.volunteers.list(oldest_first).await?)))
}

/// `GET /api/volunteers/{id}`: One volunteer.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if absent.
#[utoipa::path(
    get,
    path = "/api/volunteers/{id}",
    tag = "Volunteers",
    summary = "Get volunteer",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    responses(
        (status = 200, description = "Volunteer", body = ApiResponse<Volunteer>),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn get_volunteer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.volunteers.get(id).await?)))
}

/// `PUT /api/volunteers/{id}`: Partial update.
///
/// # Errors
///
/// Returns [`AppError`] for a blanked field, a taken e-mail or an unknown id.
#[utoipa::path(
    put,
    path = "/api/volunteers/{id}",
    tag = "Volunteers",
    summary = "Update volunteer",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    request_body = VolunteerPatch,
    responses(
        (status = 200, description = "Updated volunteer", body = ApiResponse<Volunteer>),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
        (status = 409, description = "E-mail already registered", body = ErrorResponse),
    )
)]
pub async fn update_volunteer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
    ApiJson(patch): ApiJson<VolunteerPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.volunteers.update(id, patch).await?)))
}

/// `DELETE /api/volunteers/{id}`: Delete a volunteer with their turnout and
/// work rows.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if absent.
#[utoipa::path(
    delete,
    path = "/api/volunteers/{id}",
    tag = "Volunteers",
    summary = "Delete volunteer",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    responses(
        (status = 200, description = "Volunteer deleted", body = ApiResponse<MessageResponse>),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn delete_volunteer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
) -> Result<impl IntoResponse, AppError> {
    state.volunteers.delete(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Volunteer deleted successfully",
    ))))
}

/// `POST /api/volunteers/{id}/attendance`: Record turnout for an event.
///
/// # Errors
///
/// Returns [`AppError`] for a missing field, an unknown status or an
/// unknown volunteer or event.
#[utoipa::path(
    post,
    path = "/api/volunteers/{id}/attendance",
    tag = "Volunteers",
    summary = "Record volunteer attendance",
    description = "Recording again for the same event replaces the status.",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    request_body = RecordVolunteerAttendance,
    responses(
        (status = 201, description = "Recorded", body = ApiResponse<VolunteerAttendance>),
        (status = 400, description = "Missing field or unknown status", body = ErrorResponse),
        (status = 404, description = "Volunteer or event not found", body = ErrorResponse),
    )
)]
pub async fn record_attendance(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
    ApiJson(req): ApiJson<RecordVolunteerAttendance>,
) -> Result<impl IntoResponse, AppError> {
    let row = state.volunteers.record_attendance(id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(row))))
}

/// `GET /api/volunteers/{id}/attendance`: Most recent turnout rows.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the volunteer is absent.
#[utoipa::path(
    get,
    path = "/api/volunteers/{id}/attendance",
    tag = "Volunteers",
    summary = "Recent volunteer attendance",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID"), RecentAttendanceParams),
    responses(
        (status = 200, description = "Rows, newest first", body = ApiResponse<Vec<VolunteerAttendanceView>>),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn recent_attendance(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
    ApiQuery(params): ApiQuery<RecentAttendanceParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = state.volunteers.recent_attendance(id, params.limit).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// `GET /api/volunteers/{id}/attendance/history`: Paged turnout history.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the volunteer is absent.
#[utoipa::path(
    get,
    path = "/api/volunteers/{id}/attendance/history",
    tag = "Volunteers",
    summary = "Volunteer attendance history",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID"), AttendanceHistoryParams),
    responses(
        (status = 200, description = "One page", body = ApiResponse<VolunteerAttendancePage>),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn attendance_history(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
    ApiQuery(params): ApiQuery<AttendanceHistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.volunteers.history(id, params.page, params.limit).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// `GET /api/volunteers/{id}/attendance/stats`: Turnout counters.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the volunteer is absent.
#[utoipa::path(
    get,
    path = "/api/volunteers/{id}/attendance/stats",
    tag = "Volunteers",
    summary = "Volunteer attendance stats",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    responses(
        (status = 200, description = "Counters", body = ApiResponse<VolunteerAttendanceStats>),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn attendance_stats(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.volunteers.stats(id).await?)))
}

/// `POST /api/volunteers/{id}/work`: Hand out a task.
///
/// # Errors
///
/// Returns [`AppError`] for a blank task name or an unknown volunteer or
/// event.
#[utoipa::path(
    post,
    path = "/api/volunteers/{id}/work",
    tag = "Volunteers",
    summary = "Assign work",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    request_body = NewVolunteerWork,
    responses(
        (status = 201, description = "Assigned", body = ApiResponse<VolunteerWork>),
        (status = 400, description = "Blank task name", body = ErrorResponse),
        (status = 404, description = "Volunteer or event not found", body = ErrorResponse),
    )
)]
pub async fn assign_work(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
    ApiJson(req): ApiJson<NewVolunteerWork>,
) -> Result<impl IntoResponse, AppError> {
    let work = state.volunteers.assign_work(id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(work))))
}

/// `GET /api/volunteers/{id}/work`: A volunteer's assignments.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the volunteer is absent.
#[utoipa::path(
    get,
    path = "/api/volunteers/{id}/work",
    tag = "Volunteers",
    summary = "List work",
    params(("id" = uuid::Uuid, Path, description = "Volunteer UUID")),
    responses(
        (status = 200, description = "Assignments, newest first", body = ApiResponse<Vec<VolunteerWorkView>>),
        (status = 404, description = "Volunteer not found", body = ErrorResponse),
    )
)]
pub async fn list_work(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VolunteerId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.volunteers.list_work(id).await?)))
}

/// `PUT /api/volunteers/{id}/work/{work_id}`: Move a task to a new status.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the assignment is not this
/// volunteer's.
#[utoipa::path(
    put,
    path = "/api/volunteers/{id}/work/{work_id}",
    tag = "Volunteers",
    summary = "Update work status",
    params(
        ("id" = uuid::Uuid, Path, description = "Volunteer UUID"),
        ("work_id" = uuid::Uuid, Path, description = "Assignment UUID"),
    ),
    request_body = UpdateWorkStatusRequest,
    responses(
        (status = 200, description = "Updated", body = ApiResponse<VolunteerWork>),
        (status = 404, description = "Assignment not found", body = ErrorResponse),
    )
)]
pub async fn update_work_status(
    State(state): State<AppState>,
    ApiPath((id, work_id)): ApiPath<(VolunteerId, VolunteerWorkId)>,
    ApiJson(req): ApiJson<UpdateWorkStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let work = state
        .volunteers
        .update_work_status(id, work_id, req.task_status)
        .await?;
    Ok(Json(ApiResponse::ok(work)))
}

/// `DELETE /api/volunteers/{id}/work/{work_id}`: Remove a task.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the assignment is not this
/// volunteer's.
#[utoipa::path(
    delete,
    path = "/api/volunteers/{id}/work/{work_id}",
    tag = "Volunteers",
    summary = "Delete work",
    params(
        ("id" = uuid::Uuid, Path, description = "Volunteer UUID"),
        ("work_id" = uuid::Uuid, Path, description = "Assignment UUID"),
    ),
    responses(
        (status = 200, description = "Removed", body = ApiResponse<MessageResponse>),
        (status = 404, description = "Assignment not found", body = ErrorResponse),
    )
)]
pub async fn delete_work(
    State(state): State<AppState>,
    ApiPath((id, work_id)): ApiPath<(VolunteerId, VolunteerWorkId)>,
) -> Result<impl IntoResponse, AppError> {
    state.volunteers.delete_work(id, work_id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Work assignment deleted"))))
}

/// Volunteer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/volunteers", get(list_volunteers).post(create_volunteer))
        .route(
            "/volunteers/{id}",
            get(get_volunteer).put(update_volunteer).delete(delete_volunteer),
        )
        .route(
            "/volunteers/{id}/attendance",
            get(recent_attendance).post(record_attendance),
        )
        .route("/volunteers/{id}/attendance/history", get(attendance_history))
        .route("/volunteers/{id}/attendance/stats", get(attendance_stats))
        .route("/volunteers/{id}/work", get(list_work).post(assign_work))
        .route(
            "/volunteers/{id}/work/{work_id}",
            put(update_work_status).delete(delete_work),
        )
}
