//! Body extractors whose rejections render as [`AppError`].
//!
//! axum's own `Json` and `Form` reject with plain-text bodies and a mix of
//! 400/415/422 statuses. These wrappers keep the `{"detail": ...}` shape and
//! report every unreadable body as a 400.

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `application/x-www-form-urlencoded` request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct FormBody<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected JSON body");
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "Rejected form body");
        AppError::BadRequest(rejection.body_text())
    }
}
