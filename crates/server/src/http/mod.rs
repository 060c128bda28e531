//! HTTP API
//!
//! Routes mirror the paths the frontend calls; request and response
//! bodies use camelCase field names throughout.

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

pub mod auth;
pub mod error;
pub mod groups;
pub mod users;

/// Build the API router
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Router::new()
        .route("/groups/create-group", post(groups::create_group))
        .route("/groups/exists/:group_url", get(groups::exists))
        .route("/groups/visited/:user_id", get(groups::visited_groups))
        .route("/groups/created/:admin_id", get(groups::created_groups))
        .route("/groups/:group_url", get(groups::get_group))
        .route(
            "/groups/:group_url/should-auto-delete",
            get(groups::should_auto_delete),
        )
        .route("/groups/:group_url/send-message", post(groups::send_message))
        .route(
            "/groups/:group_url/delete-message",
            delete(groups::delete_message),
        )
        .route("/users/create-user", post(users::create_user))
        .route("/users/:user_id", get(users::get_user))
        .route("/users/:user_id/groups", get(users::user_groups))
        .route("/users/:user_id/visit/:group_id", post(groups::record_visit))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .layer(cors)
        .with_state(state)
}
