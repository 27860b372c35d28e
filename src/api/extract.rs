//! Request extractors that reject through [`AppError`].
//!
//! axum's own `Json`, `Path` and `Query` answer a bad body or a bad path
//! segment with a plain-text 4xx. These wrappers run the same extraction
//! and convert the rejection, so clients always get the failure envelope
//! with code 1001.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body. Deserialization failures become
/// [`AppError::InvalidRequest`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters. A segment that fails to parse becomes
/// [`AppError::InvalidRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
