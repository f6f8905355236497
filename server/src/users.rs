//! Account endpoints: register, login, profile, password, per-user stats.

use crate::auth::{create_token, hash_password, verify_password, SharedState};
use crate::error::ApiError;
use crate::stats;
use crate::store::User;
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use tarefa_core::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    UpdateProfileRequest, UserEnvelope, UserStats,
};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

// POST /users/register
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Name, email and password are required".to_string(),
        ));
    }

    if state.store.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::Validation(
            "A user with this email already exists".to_string(),
        ));
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: hash_password(&payload.password)?,
        created_at: Utc::now(),
    };
    state.store.create_user(&user)?;

    let token = create_token(user.id, &state.settings)?;
    tracing::info!(user = %user.email, "registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { token, user: user.to_ref() }),
    ))
}

// POST /users/login
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    // One message for unknown email and wrong password alike.
    let invalid = || ApiError::Validation("Invalid credentials".to_string());

    let user = state.store.get_user_by_email(&email)?.ok_or_else(invalid)?;
    if !verify_password(&payload.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = create_token(user.id, &state.settings)?;
    tracing::info!(user = %user.email, "logged in");

    Ok(Json(AuthResponse { token, user: user.to_ref() }))
}

// PUT /users/profile
pub async fn update_profile(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::Validation("Name and email are required".to_string()));
    }

    if let Some(other) = state.store.get_user_by_email(&email)? {
        if other.id != user.id {
            return Err(ApiError::Validation("This email is already in use".to_string()));
        }
    }

    let old_email = user.email.clone();
    let updated = User { name, email, ..user };
    state.store.update_user(&updated, &old_email)?;

    Ok(Json(UserEnvelope {
        message: "Profile updated".to_string(),
        user: updated.to_ref(),
    }))
}

// PUT /users/change-password
pub async fn change_password(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::Validation(
            "Current and new password are required".to_string(),
        ));
    }
    if payload.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "New password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !verify_password(&payload.current_password, &user.password_hash) {
        return Err(ApiError::Validation("Current password is incorrect".to_string()));
    }

    let updated = User {
        password_hash: hash_password(&payload.new_password)?,
        ..user
    };
    let email = updated.email.clone();
    state.store.update_user(&updated, &email)?;

    Ok(Json(MessageResponse { message: "Password changed".to_string() }))
}

// GET /users/stats
pub async fn user_stats(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
) -> Result<Json<UserStats>, ApiError> {
    let visible = state.store.tasks_visible_to(user.id)?;
    Ok(Json(stats::user_stats(&visible, Utc::now())))
}

// ── Tests ──────────────────────────────────────────────────────
