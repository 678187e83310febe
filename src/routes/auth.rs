use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Form, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{LoginRequest, SignUpRequest, TokenForm, TokenResponse, UserRecord, UserResponse},
    services::{hash_password, verify_password},
    state::AppState,
};

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}

/// Runs a CPU-heavy password operation on the blocking pool
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Password task failed: {}", e)))
}

/// Register a new account
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let email = request.email.trim().to_string();
    if !email.contains('@') {
        return Err(AppError::InvalidInput("Invalid email address".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::InvalidInput("Password cannot be empty".to_string()));
    }
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::InvalidInput("User already registered".to_string()));
    }

    let password = request.password;
    let password_hash = blocking(move || hash_password(&password)).await??;

    let user = UserRecord {
        id: Uuid::new_v4(),
        name: request.name,
        email,
        password_hash,
        genres: request.genres,
        signin_date: Utc::now(),
        last_log_date: None,
    };
    state.store.insert_user(user.clone()).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// JSON login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    authenticate(&state, &request.email, request.password).await.map(Json)
}

/// Form login, `username` carrying the email
pub async fn token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TokenForm>,
) -> AppResult<Json<TokenResponse>> {
    authenticate(&state, &form.username, form.password).await.map(Json)
}

async fn authenticate(state: &AppState, email: &str, password: String) -> AppResult<TokenResponse> {
    let user = state
        .store
        .find_user_by_email(email.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    let hash = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &hash)).await? {
        tracing::info!(user_id = %user.id, "Rejected login");
        return Err(invalid_credentials());
    }

    if let Err(e) = state.store.record_login(user.id, Utc::now()).await {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to record login time");
    }

    let access_token = state.tokens.issue(user.id, &user.email)?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(TokenResponse::bearer(access_token))
}

/// Profile of the bearer token's owner
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<UserResponse>> {
    let id = claims
        .user_uuid()
        .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))?;

    let user = state
        .store
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(&user)))
}
