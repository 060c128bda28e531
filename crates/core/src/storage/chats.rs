//! Chat log storage operations
//!
//! The log is addressed per group slug. Messages are keyed on the wire by
//! the (senderName, timeStamp) pair; timestamps are truncated to
//! milliseconds on append so the pair clients echo back matches exactly.

use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, parse_uuid_opt, OptionalExt};
use crate::error::{Error, Result};
use crate::models::ChatMessage;
use chrono::{DateTime, Utc};

pub struct ChatStore<'a> {
    conn: &'a Connection,
}

/// Group fields needed to authorize chat operations
struct GroupContext {
    group_id: Uuid,
    admin_id: Option<Uuid>,
    admin_username: Option<String>,
    admin_only_chat: bool,
}

impl<'a> ChatStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append a message to a group's chat log.
    ///
    /// Fails with `NotFound` for an unknown slug, and with `Forbidden`
    /// when the group is admin-only chat and the sender name is not the
    /// admin's username. Returns the stored message with its
    /// server-assigned timestamp.
    #[instrument(skip(self, message))]
    pub fn append(
        &self,
        group_url: &str,
        sender_name: Option<String>,
        message: String,
    ) -> Result<ChatMessage> {
        let ctx = self.group_context(group_url)?;

        let chat = ChatMessage::new(sender_name, message);
        if ctx.admin_only_chat && ctx.admin_username.as_deref() != Some(chat.sender_name.as_str())
        {
            return Err(Error::Forbidden(
                "Only the admin can send messages in this group".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO chat_messages (id, group_id, sender_name, message, time_stamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                ctx.group_id.to_string(),
                chat.sender_name,
                chat.message,
                chat.time_stamp.to_rfc3339(),
            ],
        )?;

        Ok(chat)
    }

    /// Delete the first message matching the exact (senderName, timeStamp)
    /// pair, millisecond equality.
    ///
    /// Authorized for the group admin or for a requester whose username
    /// equals the message's sender name; anyone else gets `Forbidden`.
    #[instrument(skip(self))]
    pub fn delete(
        &self,
        group_url: &str,
        sender_name: &str,
        time_stamp: DateTime<Utc>,
        requesting_user_id: Option<Uuid>,
    ) -> Result<()> {
        let ctx = self.group_context(group_url)?;

        let is_admin = match (requesting_user_id, ctx.admin_id) {
            (Some(requester), Some(admin)) => requester == admin,
            _ => false,
        };
        let is_sender = match requesting_user_id {
            Some(requester) => self.username_of(requester)?.as_deref() == Some(sender_name),
            None => false,
        };
        if !is_admin && !is_sender {
            return Err(Error::Forbidden(
                "Only the admin or the message sender can delete this message".to_string(),
            ));
        }

        // Scan the sender's messages for the first millisecond-exact match.
        let mut stmt = self.conn.prepare(
            "SELECT id, time_stamp FROM chat_messages
             WHERE group_id = ?1 AND sender_name = ?2
             ORDER BY rowid",
        )?;
        let candidates = stmt
            .query_map(params![ctx.group_id.to_string(), sender_name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let wanted = time_stamp.timestamp_millis();
        let matched = candidates.into_iter().find_map(|(id, stored)| {
            DateTime::parse_from_rfc3339(&stored)
                .ok()
                .filter(|t| t.timestamp_millis() == wanted)
                .map(|_| id)
        });

        match matched {
            Some(id) => {
                self.conn
                    .execute("DELETE FROM chat_messages WHERE id = ?1", params![id])?;
                Ok(())
            }
            None => Err(Error::NotFound("Message not found".to_string())),
        }
    }

    /// List a group's chat log in insertion order
    #[instrument(skip(self))]
    pub fn list_for_group(&self, group_id: Uuid) -> Result<Vec<ChatMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT sender_name, message, time_stamp FROM chat_messages
             WHERE group_id = ?1 ORDER BY rowid",
        )?;

        let messages = stmt
            .query_map(params![group_id.to_string()], |row| {
                Ok(ChatMessage {
                    sender_name: row.get(0)?,
                    message: row.get(1)?,
                    time_stamp: parse_datetime(&row.get::<_, String>(2)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Message count for a group
    pub fn count_for_group(&self, group_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chat_messages WHERE group_id = ?1",
            params![group_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn group_context(&self, group_url: &str) -> Result<GroupContext> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.admin_id, u.username, g.admin_only_chat
             FROM groups g
             LEFT JOIN users u ON u.id = g.admin_id
             WHERE g.group_url = ?1",
        )?;

        let ctx = stmt
            .query_row(params![group_url], |row| {
                Ok(GroupContext {
                    group_id: parse_uuid(&row.get::<_, String>(0)?)?,
                    admin_id: parse_uuid_opt(row.get::<_, Option<String>>(1)?)?,
                    admin_username: row.get(2)?,
                    admin_only_chat: row.get::<_, i32>(3)? != 0,
                })
            })
            .optional()?;

        ctx.ok_or_else(|| Error::NotFound(format!("Group URL doesn't exist: {group_url}")))
    }

    fn username_of(&self, user_id: Uuid) -> Result<Option<String>> {
        let username = self
            .conn
            .query_row(
                "SELECT username FROM users WHERE id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(username)
    }
}
