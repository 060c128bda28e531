//! User storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{is_unique_violation, parse_datetime, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{Session, User};

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user; both username and email must be unique
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub fn create(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, username, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.email,
                    user.password_hash,
                    user.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict("Email or username already in use".to_string())
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1",
        )?;

        let user = stmt
            .query_row(params![id.to_string()], Self::map_user)
            .optional()?;

        Ok(user)
    }

    /// Find user by username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
        )?;

        let user = stmt.query_row(params![username], Self::map_user).optional()?;

        Ok(user)
    }

    /// Find user by email
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = ?1",
        )?;

        let user = stmt.query_row(params![email], Self::map_user).optional()?;

        Ok(user)
    }

    /// Create a session
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find a valid (non-expired) session
    #[instrument(skip(self))]
    pub fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
        )?;

        let now = Utc::now().to_rfc3339();
        let session = stmt
            .query_row(params![session_id.to_string(), now], |row| {
                Ok(Session {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })
            .optional()?;

        Ok(session)
    }

    /// Delete a session
    pub fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(())
    }

    /// Clean up expired sessions
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }

    fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: parse_datetime(&row.get::<_, String>(4)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_duplicate_username_or_email_conflicts() {
        let db = Database::open_in_memory().unwrap();

        let alice = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "hash".to_string(),
        );
        db.users().create(&alice).unwrap();

        let same_name = User::new(
            "alice".to_string(),
            "other@example.com".to_string(),
            "hash".to_string(),
        );
        assert!(matches!(
            db.users().create(&same_name).unwrap_err(),
            Error::Conflict(_)
        ));

        let same_email = User::new(
            "bob".to_string(),
            "alice@example.com".to_string(),
            "hash".to_string(),
        );
        assert!(matches!(
            db.users().create(&same_email).unwrap_err(),
            Error::Conflict(_)
        ));
    }

    #[test]
    fn test_session_lifecycle() {
        let db = Database::open_in_memory().unwrap();

        let alice = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "hash".to_string(),
        );
        db.users().create(&alice).unwrap();

        let session = Session::new(alice.id, 24);
        db.users().create_session(&session).unwrap();

        let found = db.users().find_valid_session(session.id).unwrap().unwrap();
        assert_eq!(found.user_id, alice.id);

        db.users().delete_session(session.id).unwrap();
        assert!(db.users().find_valid_session(session.id).unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_invalid() {
        let db = Database::open_in_memory().unwrap();

        let alice = User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "hash".to_string(),
        );
        db.users().create(&alice).unwrap();

        // Negative duration: already expired
        let session = Session::new(alice.id, -1);
        db.users().create_session(&session).unwrap();

        assert!(!session.is_valid());
        assert!(db.users().find_valid_session(session.id).unwrap().is_none());
        assert_eq!(db.users().cleanup_expired_sessions().unwrap(), 1);
    }
}
