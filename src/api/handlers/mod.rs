//! REST endpoint handlers organized by resource.

pub mod attendance;
pub mod auth;
pub mod blocklist;
pub mod dashboard;
pub mod events;
pub mod imports;
pub mod no_shows;
pub mod participants;
pub mod roster;
pub mod system;
pub mod volunteers;

use axum::Router;

use crate::app_state::AppState;

/// Resource routes that require a bearer token, relative to `/api`.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(events::routes())
        .merge(roster::routes())
        .merge(participants::routes())
        .merge(attendance::routes())
        .merge(no_shows::routes())
        .merge(blocklist::routes())
        .merge(imports::routes())
        .merge(dashboard::routes())
        .merge(volunteers::routes())
}

/// Resource routes open to anonymous callers, relative to `/api`.
pub fn public_routes() -> Router<AppState> {
    auth::public_routes()
}
