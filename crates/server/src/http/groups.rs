//! Group endpoints

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use gather_core::models::{Group, GroupType};
use gather_core::Error;
use gather_net::{ChatPayload, ServerEvent};

use super::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub group_url: String,
    pub admin_id: Option<Uuid>,
    #[serde(default)]
    pub admin_only_chat: bool,
    pub group_type: Option<String>,
    pub auto_delete_after: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_name: Option<String>,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    pub sender_name: String,
    pub time_stamp: DateTime<Utc>,
    pub user_id: Option<Uuid>,
}

/// GET /groups/exists/:group_url
///
/// 200 with the group when the slug is taken, 202 with a literal
/// `false` body when it is free. The odd 202 is load-bearing: the
/// frontend's create form branches on it.
pub async fn exists(
    State(state): State<AppState>,
    Path(group_url): Path<String>,
) -> ApiResult<Response> {
    let db = state.db.lock().await;
    match db.groups().find_by_url(&group_url)? {
        Some(group) => Ok((StatusCode::OK, Json(group)).into_response()),
        None => Ok((StatusCode::ACCEPTED, Json(false)).into_response()),
    }
}

/// GET /groups/:group_url
///
/// The full group view: fields, admin contact info, the chat log, and
/// the visit entries.
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_url): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let db = state.db.lock().await;
    let group = find_group(&db, &group_url)?;

    let admin = match group.admin_id {
        Some(admin_id) => db
            .users()
            .find_by_id(admin_id)?
            .map(|u| json!({ "username": u.username, "email": u.email })),
        None => None,
    };
    let chats = db.chats().list_for_group(group.id)?;
    let visits = db.groups().list_visits(group.id)?;

    let mut body = serde_json::to_value(&group)?;
    body["admin"] = admin.unwrap_or(serde_json::Value::Null);
    body["chats"] = serde_json::to_value(chats)?;
    body["usersVisited"] = serde_json::to_value(visits)?;

    Ok(Json(body))
}

/// GET /groups/:group_url/should-auto-delete
pub async fn should_auto_delete(
    State(state): State<AppState>,
    Path(group_url): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let db = state.db.lock().await;
    let group = find_group(&db, &group_url)?;
    Ok(Json(json!({ "shouldDelete": group.should_auto_delete() })))
}

/// POST /groups/create-group
pub async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let name = req.name.trim();
    let group_url = req.group_url.trim();
    if name.is_empty() || group_url.is_empty() {
        return Err(Error::Validation("name and groupUrl are required".to_string()).into());
    }

    let group_type = req
        .group_type
        .as_deref()
        .map(GroupType::from_str)
        .unwrap_or_default();

    let group = Group::new(name.to_string(), group_url.to_string(), req.admin_id)
        .with_admin_only_chat(req.admin_only_chat)
        .with_group_type(group_type)
        .with_auto_delete_after(req.auto_delete_after);

    let db = state.db.lock().await;
    db.groups().create(&group)?;

    info!(group_url = %group.group_url, "Group created");
    Ok((StatusCode::CREATED, Json(group)))
}

/// POST /groups/:group_url/send-message
///
/// Persists the message, then fans it out to everyone currently in the
/// group's room.
pub async fn send_message(
    State(state): State<AppState>,
    Path(group_url): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let chat = {
        let db = state.db.lock().await;
        db.chats().append(&group_url, req.sender_name, req.message)?
    };

    state
        .rooms
        .publish(
            &group_url,
            ServerEvent::NewMessage {
                message: ChatPayload {
                    sender_name: chat.sender_name.clone(),
                    message: chat.message.clone(),
                    time_stamp: chat.time_stamp,
                },
            },
        )
        .await;

    Ok(Json(json!({ "lastChat": chat })))
}

/// DELETE /groups/:group_url/delete-message
pub async fn delete_message(
    State(state): State<AppState>,
    Path(group_url): Path<String>,
    Json(req): Json<DeleteMessageRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let db = state.db.lock().await;
    db.chats()
        .delete(&group_url, &req.sender_name, req.time_stamp, req.user_id)?;
    Ok(Json(json!({ "message": "Message deleted" })))
}

/// GET /groups/visited/:user_id
pub async fn visited_groups(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let db = state.db.lock().await;
    let groups = db.groups().find_visited_by(user_id)?;
    Ok(Json(json!({ "groups": groups })))
}

/// GET /groups/created/:admin_id
pub async fn created_groups(
    State(state): State<AppState>,
    Path(admin_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let db = state.db.lock().await;
    let groups = db.groups().find_by_admin(admin_id)?;
    Ok(Json(json!({ "groups": groups })))
}

/// POST /users/:user_id/visit/:group_id
///
/// Records a visit, once per user per group. The client IP is taken
/// from X-Forwarded-For when present.
pub async fn record_visit(
    State(state): State<AppState>,
    Path((user_id, group_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let db = state.db.lock().await;
    if db.users().find_by_id(user_id)?.is_none() {
        return Err(Error::NotFound("User not found".to_string()).into());
    }
    let group = db
        .groups()
        .find_by_id(group_id)?
        .ok_or_else(|| Error::NotFound("Group not found".to_string()))?;

    let recorded = db.groups().record_visit(group.id, Some(user_id), &ip)?;
    Ok(Json(json!({ "recorded": recorded })))
}

fn find_group(db: &gather_core::storage::Database, group_url: &str) -> Result<Group, Error> {
    db.groups()
        .find_by_url(group_url)?
        .ok_or_else(|| Error::NotFound(format!("Group URL doesn't exist: {group_url}")))
}
