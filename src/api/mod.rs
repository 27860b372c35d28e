//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api`; `/health` sits at the
//! root. Everything under `/api` except signup and login passes through
//! [`require_auth`] and then [`restrict_writes_to_admins`].

pub mod dto;
pub mod extract;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::auth::{require_auth, restrict_writes_to_admins};

/// OpenAPI description of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "eventpass-api",
        description = "Event attendance tracking with bulk import, undo and rollback"
    ),
    paths(
        handlers::system::health_handler,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::me,
        handlers::auth::approve_admin,
        handlers::auth::pending_admins,
        handlers::events::create_event,
        handlers::events::list_events,
        handlers::events::get_event,
        handlers::events::update_event,
        handlers::events::delete_event,
        handlers::roster::list_participants,
        handlers::roster::delete_all_participants,
        handlers::roster::delete_selected_participants,
        handlers::roster::list_attendance,
        handlers::roster::delete_all_attendance,
        handlers::roster::delete_selected_attendance,
        handlers::roster::undo_delete,
        handlers::participants::create_participant,
        handlers::participants::list_participants,
        handlers::participants::get_participant,
        handlers::participants::update_participant,
        handlers::participants::active_count,
        handlers::participants::blocklisted_count,
        handlers::participants::bulk_import,
        handlers::participants::import_csv,
        handlers::attendance::mark_attendance,
        handlers::attendance::import_attendance,
        handlers::attendance::by_event,
        handlers::attendance::by_participant,
        handlers::attendance::update_status,
        handlers::attendance::stats,
        handlers::no_shows::list_no_shows,
        handlers::no_shows::count_no_shows,
        handlers::no_shows::by_participant,
        handlers::no_shows::export_csv,
        handlers::no_shows::mark_no_show,
        handlers::no_shows::delete_no_show,
        handlers::blocklist::add_entry,
        handlers::blocklist::list_entries,
        handlers::blocklist::remove_entry,
        handlers::blocklist::get_settings,
        handlers::blocklist::update_settings,
        handlers::imports::create_session,
        handlers::imports::list_sessions,
        handlers::imports::get_session,
        handlers::imports::revert_session,
        handlers::dashboard::summary,
        handlers::dashboard::stats,
        handlers::dashboard::overview,
        handlers::volunteers::create_volunteer,
        handlers::volunteers::list_volunteers,
        handlers::volunteers::get_volunteer,
        handlers::volunteers::update_volunteer,
        handlers::volunteers::delete_volunteer,
        handlers::volunteers::record_attendance,
        handlers::volunteers::recent_attendance,
        handlers::volunteers::attendance_history,
        handlers::volunteers::attendance_stats,
        handlers::volunteers::assign_work,
        handlers::volunteers::list_work,
        handlers::volunteers::update_work_status,
        handlers::volunteers::delete_work,
    ),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Auth", description = "Accounts and tokens"),
        (name = "Events", description = "Event CRUD"),
        (name = "Roster", description = "Per-event participants, delete-with-backup and undo"),
        (name = "Participants", description = "Participant CRUD and bulk import"),
        (name = "Attendance", description = "Attendance marking and import"),
        (name = "No-shows", description = "No-show views and export"),
        (name = "Blocklist", description = "Blocklist and auto-block settings"),
        (name = "Imports", description = "Import sessions and revert"),
        (name = "Dashboard", description = "Counters"),
        (name = "Volunteers", description = "Volunteers, their turnout and work assignments"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router(state: &AppState) -> Router<AppState> {
    let protected = handlers::protected_routes()
        .layer(from_fn(restrict_writes_to_admins))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let router = Router::new()
        .nest("/api", handlers::public_routes().merge(protected))
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the served application: routes, state and the HTTP layers.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    build_router(&state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, header};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::domain::MemoryBackupStore;
    use crate::service::AuditTrail;
    use crate::store::{MemoryStore, Store};

    fn app() -> Router {
        let config = AppConfig::in_memory();
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (audit, _receiver) = AuditTrail::channel(8);
        let state = AppState::new(store, Arc::new(MemoryBackupStore::new()), audit, &config);
        build_app(state, Duration::from_secs(5))
    }

    async fn send(method: Method, uri: &str, json: Option<&str>) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match json {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        let Ok(request) = request else {
            panic!("bad request");
        };
        let Ok(response) = app().oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = to_bytes(response.into_body(), 64 * 1024).await else {
            panic!("body unreadable");
        };
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let (status, body) = send(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn missing_token_gets_failure_envelope() {
        let (status, body) = send(Method::GET, "/api/dashboard/summary", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], 1101);
    }

    #[tokio::test]
    async fn signup_is_public_and_validated() {
        let (status, body) = send(Method::POST, "/api/auth/signup", Some("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Name, email, password, and confirmPassword are required"
        );
    }

    #[tokio::test]
    async fn unreadable_body_gets_failure_envelope() {
        let (status, body) = send(Method::POST, "/api/auth/login", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], 1001);
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn openapi_documents_undo() {
        let doc = ApiDoc::openapi();
        assert!(
            doc.paths
                .paths
                .contains_key("/api/events/{id}/participants/undo-delete")
        );
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
