//! Request gates and identity extractors.
//!
//! [`require_auth`] runs on every protected route: it verifies the bearer
//! token, rejects pending accounts and stores an [`AuthUser`] in the
//! request extensions. [`restrict_writes_to_admins`] runs after it and lets
//! only admins through on non-read methods.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;

use super::token::Claims;
use crate::app_state::AppState;
use crate::domain::{Role, UserId, UserStatus};
use crate::error::AppError;

/// Identity of the caller, taken from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// User id.
    pub id: UserId,
    /// E-mail at issue time.
    pub email: String,
    /// Display name at issue time.
    pub name: String,
    /// Access level.
    pub role: Role,
    /// Approval state.
    pub status: UserStatus,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            status: claims.status,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// An [`AuthUser`] whose role is admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Verifies the bearer token and attaches the caller's identity.
///
/// # Errors
///
/// - 401 when the token is missing, malformed, forged or expired.
/// - 403 when the account is still pending approval.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid authorization token".to_string())
    })?;
    let claims = state.tokens.verify(token)?;

    if claims.status != UserStatus::Approved {
        return Err(AppError::Forbidden("Account is pending approval".to_string()));
    }

    req.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(req).await)
}

/// Lets reads through and requires the admin role for everything else.
///
/// # Errors
///
/// - 401 when no identity was attached by [`require_auth`].
/// - 403 when a non-admin attempts a write.
pub async fn restrict_writes_to_admins(req: Request, next: Next) -> Result<Response, AppError> {
    if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(next.run(req).await);
    }
    let role = req
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.role)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    if role != Role::Admin {
        return Err(AppError::Forbidden("Write operations require admin access".to_string()));
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/events");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap_or_default()
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let req = request_with(Some("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_ignored() {
        assert_eq!(bearer_token(&request_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&request_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&request_with(None)), None);
    }
}
