//! Event CRUD handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, MessageResponse};
use crate::api::extract::{ApiJson, ApiPath};
use crate::app_state::AppState;
use crate::domain::{Event, EventId, EventPatch};
use crate::error::{AppError, ErrorResponse};
use crate::service::event_service::NewEvent;

/// `POST /api/events`: Create an event.
///
/// # Errors
///
/// Returns [`AppError::InvalidRequest`] for a blank name.
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    summary = "Create event",
    request_body = NewEvent,
    responses(
        (status = 201, description = "Event created", body = ApiResponse<Event>),
        (status = 400, description = "Invalid event", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewEvent>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.events.create(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(event))))
}

/// `GET /api/events`: List events, newest date first.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Events",
    summary = "List events",
    responses(
        (status = 200, description = "All events", body = ApiResponse<Vec<Event>>),
    )
)]
pub async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.events.list().await?)))
}

/// `GET /api/events/{id}`: One event.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if absent.
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Get event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event", body = ApiResponse<Event>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.events.get(id).await?)))
}

/// `PUT /api/events/{id}`: Partial update.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if absent.
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Update event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = EventPatch,
    responses(
        (status = 200, description = "Updated event", body = ApiResponse<Event>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EventId>,
    ApiJson(patch): ApiJson<EventPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::ok(state.events.update(id, patch).await?)))
}

/// `DELETE /api/events/{id}`: Delete an event with its attendance rows.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if absent.
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Delete event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event deleted", body = ApiResponse<MessageResponse>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<EventId>,
) -> Result<impl IntoResponse, AppError> {
    state.events.delete(id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Event deleted"))))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}
