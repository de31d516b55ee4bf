//! Account routes.
//!
//! Routes:
//! - GET /auth/ - Username of the authenticated user
//! - POST /auth/register - Create an account and return an access token
//! - POST /auth/token - Exchange form credentials for an access token
//! - PUT /auth/update - Change the authenticated user's name and password
//! - DELETE /auth/delete - Remove the authenticated user and their todos

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::auth::password::{check_strength, hash_password, verify_password};
use crate::auth::AuthUser;
use crate::config::MAX_USERNAME_LEN;
use crate::error::AppError;
use crate::extract::{FormBody, JsonBody};
use crate::state::AppState;
use crate::store::StoreError;

/// Body for register and update
#[derive(Debug, Deserialize)]
pub struct CredentialsChange {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

/// OAuth2 password-grant style login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredResponse {
    pub username: String,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if username.trim().is_empty() || len > MAX_USERNAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Username must be between 1 and {} characters",
            MAX_USERNAME_LEN
        )));
    }
    // "alice" and "alice " must never name two different accounts
    if username.trim() != username {
        return Err(AppError::BadRequest(
            "Username must not start or end with whitespace".to_string(),
        ));
    }
    Ok(())
}

/// Shared checks for a new name/password pair; returns the bcrypt hash.
async fn vet_credentials(state: &AppState, body: &CredentialsChange) -> Result<String, AppError> {
    if body.password1 != body.password2 {
        return Err(AppError::BadRequest("Passwords do not match".to_string()));
    }

    check_strength(
        &body.password1,
        &body.username,
        state.config.auth.min_password_score,
    )
    .map_err(AppError::BadRequest)?;

    hash_password(&body.password1, state.config.auth.bcrypt_cost).await
}

#[instrument(name = "auth::me", skip_all, fields(user_id = %user.id))]
pub async fn me(user: AuthUser) -> Json<UsernameResponse> {
    Json(UsernameResponse {
        username: user.username,
    })
}

#[instrument(name = "auth::register", skip_all, fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CredentialsChange>,
) -> Result<(StatusCode, Json<RegisteredResponse>), AppError> {
    validate_username(&body.username)?;

    if state
        .store
        .find_user_by_username(&body.username)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let password_hash = vet_credentials(&state, &body).await?;
    let user = state.store.create_user(&body.username, &password_hash).await?;
    let access_token = state.tokens.issue(&user.username, &user.id)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            username: user.username,
            access_token,
        }),
    ))
}

#[instrument(name = "auth::login", skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    FormBody(form): FormBody<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .store
        .find_user_by_username(&form.username)
        .await?
        .ok_or_else(|| AppError::BadRequest("User does not exist".to_string()))?;

    if !verify_password(&form.password, &user.password_hash).await? {
        tracing::info!("Login rejected: incorrect password");
        return Err(AppError::BadRequest("Incorrect password".to_string()));
    }

    let access_token = state.tokens.issue(&user.username, &user.id)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

#[instrument(name = "auth::update", skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<CredentialsChange>,
) -> Result<Json<UsernameResponse>, AppError> {
    validate_username(&body.username)?;
    let password_hash = vet_credentials(&state, &body).await?;

    let updated = state
        .store
        .update_user(&user.id, &body.username, &password_hash)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::Unauthorized,
            other => AppError::Store(other),
        })?;

    tracing::info!(username = %updated.username, "User updated");
    Ok(Json(UsernameResponse {
        username: updated.username,
    }))
}

#[instrument(name = "auth::delete", skip_all, fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UsernameResponse>, AppError> {
    let removed = state.store.delete_user(&user.id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::Unauthorized,
        other => AppError::Store(other),
    })?;

    tracing::info!("User deleted");
    Ok(Json(UsernameResponse {
        username: removed.username,
    }))
}
