//! Signup, login and admin approval handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, ApproveRequest, UserResponse};
use crate::api::extract::ApiJson;
use crate::app_state::AppState;
use crate::auth::{AdminUser, AuthUser};
use crate::domain::PublicUser;
use crate::error::{AppError, ErrorResponse};
use crate::service::auth_service::{LoginRequest, Session, SignupOutcome, SignupRequest};

/// `POST /api/auth/signup`: Create an account.
///
/// # Errors
///
/// Returns [`AppError`] on validation failure or a taken e-mail.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    summary = "Sign up",
    description = "Creates an account. User accounts receive a token at once; admin accounts stay pending until an approved admin approves them.",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<SignupOutcome>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "E-mail already registered", body = ErrorResponse),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.auth.signup(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(outcome))))
}

/// `POST /api/auth/login`: Exchange credentials for a token.
///
/// # Errors
///
/// Returns [`AppError`] on bad credentials, a wrong login tab or a pending
/// account.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = ApiResponse<Session>),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 403, description = "Wrong login tab or pending account", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.auth.login(req).await?;
    Ok(Json(ApiResponse::ok(session)))
}

/// `GET /api/auth/me`: The caller's account.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the account no longer exists.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    summary = "Current user",
    responses(
        (status = 200, description = "Caller's account", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.me(&caller).await?;
    Ok(Json(ApiResponse::ok(UserResponse { user })))
}

/// `POST /api/auth/admin/approve`: Approve a pending admin.
///
/// # Errors
///
/// Returns [`AppError`] if `user_id` is missing, unknown, or not an admin.
#[utoipa::path(
    post,
    path = "/api/auth/admin/approve",
    tag = "Auth",
    summary = "Approve admin",
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Account approved", body = ApiResponse<UserResponse>),
        (status = 400, description = "Missing user_id or not an admin account", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn approve_admin(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<ApproveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = req
        .user_id
        .ok_or_else(|| AppError::InvalidRequest("user_id is required".to_string()))?;
    let user = state.auth.approve(&admin, user_id).await?;
    Ok(Json(ApiResponse::ok(UserResponse { user })))
}

/// `GET /api/auth/admin/pending`: Admin accounts awaiting approval.
///
/// # Errors
///
/// Propagates store failures.
#[utoipa::path(
    get,
    path = "/api/auth/admin/pending",
    tag = "Auth",
    summary = "List pending admins",
    responses(
        (status = 200, description = "Pending admin accounts", body = ApiResponse<Vec<PublicUser>>),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
    )
)]
pub async fn pending_admins(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let users = state.auth.pending_admins().await?;
    Ok(Json(ApiResponse::ok(users)))
}

/// Routes reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

/// Routes behind the auth middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/admin/approve", post(approve_admin))
        .route("/auth/admin/pending", get(pending_admins))
}
