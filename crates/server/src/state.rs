//! Shared application state

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use gather_core::models::User;
use gather_core::storage::Database;
use gather_core::{Error, Result};
use gather_net::RoomRegistry;

/// Session lifetime in hours (one week)
pub const SESSION_HOURS: i64 = 24 * 7;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    /// Database behind a mutex; SQLite connections are not Sync and
    /// requests are short, so serializing access is fine here.
    pub db: Arc<Mutex<Database>>,
    /// Room registry shared with the relay for post-write fan-out
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(db: Database, rooms: Arc<RoomRegistry>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            rooms,
        }
    }

    /// Resolve the bearer token in the Authorization header to a user.
    ///
    /// Fails with `Authentication` when the header is missing, malformed,
    /// or names an expired or unknown session.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<User> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| Error::Authentication("Missing bearer token".to_string()))?;

        let session_id = Uuid::parse_str(token)
            .map_err(|_| Error::Authentication("Invalid bearer token".to_string()))?;

        let db = self.db.lock().await;
        let session = db
            .users()
            .find_valid_session(session_id)?
            .ok_or_else(|| Error::Authentication("Session expired or unknown".to_string()))?;

        db.users()
            .find_by_id(session.user_id)?
            .ok_or_else(|| Error::Authentication("Session user no longer exists".to_string()))
    }
}
