//! Account and session endpoints

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use gather_core::models::Session;
use gather_core::Error;

use super::error::{ApiError, ApiResult};
use crate::state::{AppState, SESSION_HOURS};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Authentication(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, Error> {
    let argon2 = Argon2::default();
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| Error::Authentication(format!("Corrupt password hash: {e}")))?;
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// POST /auth/login
///
/// The username field also accepts an email address. On success the
/// session id is returned as an opaque bearer token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let invalid = || Error::Authentication("Invalid username or password".to_string());

    let db = state.db.lock().await;
    let user = match db.users().find_by_username(&req.username)? {
        Some(user) => user,
        None => db.users().find_by_email(&req.username)?.ok_or_else(invalid)?,
    };

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::from(invalid()));
    }

    let session = Session::new(user.id, SESSION_HOURS);
    db.users().create_session(&session)?;

    info!(username = %user.username, "User logged in");
    Ok(Json(json!({
        "token": session.id,
        "user": user,
    })))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user = state.authenticate(&headers).await?;
    Ok(Json(json!({ "user": user })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_corrupt_hash_is_an_error() {
        assert!(verify_password("hunter2", "not-a-phc-string").is_err());
    }
}
