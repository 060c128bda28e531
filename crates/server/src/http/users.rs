//! User endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use gather_core::models::User;
use gather_core::Error;

use super::auth::hash_password;
use super::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /users/create-user
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let username = req.username.trim();
    let email = req.email.trim();
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(
            Error::Validation("username, email and password are required".to_string()).into(),
        );
    }

    let password_hash = hash_password(&req.password)?;
    let user = User::new(username.to_string(), email.to_string(), password_hash);

    let db = state.db.lock().await;
    db.users().create(&user)?;

    info!(username = %user.username, "User created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
        })),
    ))
}

/// GET /users/:user_id
///
/// Profile view: the user plus name/slug summaries of the groups they
/// created and visited.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let db = state.db.lock().await;
    let user = db
        .users()
        .find_by_id(user_id)?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    let created: Vec<_> = db
        .groups()
        .find_by_admin(user.id)?
        .into_iter()
        .map(|g| json!({ "name": g.name, "groupUrl": g.group_url }))
        .collect();
    let visited: Vec<_> = db
        .groups()
        .find_visited_by(user.id)?
        .into_iter()
        .map(|g| json!({ "name": g.name, "groupUrl": g.group_url }))
        .collect();

    let mut body = serde_json::to_value(&user)?;
    body["groupsCreated"] = json!(created);
    body["groupsVisited"] = json!(visited);

    Ok(Json(body))
}

/// GET /users/:user_id/groups
///
/// The groups a user has visited, in full.
pub async fn user_groups(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let db = state.db.lock().await;
    if db.users().find_by_id(user_id)?.is_none() {
        return Err(Error::NotFound("User not found".to_string()).into());
    }
    let groups = db.groups().find_visited_by(user_id)?;
    Ok(Json(json!({ "groups": groups })))
}
