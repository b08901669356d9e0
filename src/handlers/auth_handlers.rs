//! Registration and login.

use crate::{
    errors::AppError,
    models::user::{PublicUser, User},
    state::AppState,
    store::Store,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim();
    if username.is_empty() || username.len() > 32 {
        return Err(AppError::bad_request("username must be 1-32 characters"));
    }
    if !req.email.contains('@') {
        return Err(AppError::bad_request("invalid email address"));
    }
    if req.password.len() < 8 {
        return Err(AppError::bad_request(
            "password must be at least 8 characters",
        ));
    }

    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: req.email.trim().to_string(),
        password_hash: state.auth.hash_password(&req.password)?,
        created_at: Utc::now(),
    };
    let user = state.store.insert_user(user).await?;

    let token = state.auth.issue_token(user.id, &user.username)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .user_by_email(req.email.trim())
        .await?
        .ok_or_else(|| AppError::new(StatusCode::UNAUTHORIZED, "invalid credentials"))?;

    state.auth.verify_password(&req.password, &user.password_hash)?;

    let token = state.auth.issue_token(user.id, &user.username)?;
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}
