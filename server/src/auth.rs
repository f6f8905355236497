//! Bearer-token authentication: argon2 password hashes, HS256 tokens, and
//! the middleware that resolves the acting user for every protected route.

use crate::error::ApiError;
use crate::settings::Settings;
use crate::store::Store;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub exp: usize,
    pub iat: usize,
}

// ── Shared state ───────────────────────────────────────────────

pub struct AppState {
    pub store: Store,
    pub settings: Settings,
}

pub type SharedState = Arc<AppState>;

// ── Passwords ──────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hash: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// ── Tokens ─────────────────────────────────────────────────────

pub fn create_token(user_id: Uuid, settings: &Settings) -> Result<String, ApiError> {
    let now = Utc::now();
    let expiry = now + Duration::days(settings.jwt_expiry_days);

    let claims = Claims {
        sub: user_id,
        exp: expiry.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encode: {e}")))
}

pub fn verify_token(token: &str, settings: &Settings) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

// ── Middleware ─────────────────────────────────────────────────

/// Resolves the acting user from the Authorization header and stashes it
/// in request extensions. Any token failure ends the request with 401 —
/// 403 is reserved for field-level permission errors.
pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(ApiError::Unauthorized("Access token required".to_string())),
    };

    let claims = verify_token(token, &state.settings)
        .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

    let user = state
        .store
        .get_user(claims.sub)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// ── Tests ──────────────────────────────────────────────────────
