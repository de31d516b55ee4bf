//! Account authentication.
//!
//! Provides:
//! - `TokenIssuer`: signs and verifies bearer access tokens
//! - password hashing and the strength policy applied on register/update
//! - `AuthUser`: extractor that resolves the bearer token to a live account

pub mod password;
pub mod token;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::AppError;
use crate::state::AppState;

pub use token::{Claims, TokenIssuer};

/// The account making the request.
///
/// Extraction fails with 401 unless the request carries a valid, unexpired
/// bearer token whose user still exists. The username is read from the store,
/// so it reflects renames made after the token was issued.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        let claims = state.tokens.verify(bearer.token()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            AppError::Unauthorized
        })?;

        let user = state
            .store
            .find_user(&claims.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }
}
