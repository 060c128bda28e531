//! Group storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    is_unique_violation, parse_datetime, parse_group_type, parse_uuid, parse_uuid_opt, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{Group, GroupVisit};

pub struct GroupStore<'a> {
    conn: &'a Connection,
}

const GROUP_COLUMNS: &str =
    "id, name, group_url, admin_id, admin_only_chat, group_type, auto_delete_after, visits, created_at";

impl<'a> GroupStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new group with an empty chat log.
    ///
    /// Fails with `Conflict` when the group_url slug is already taken; the
    /// UNIQUE column makes this hold even when two creates race.
    #[instrument(skip(self, group), fields(group_url = %group.group_url))]
    pub fn create(&self, group: &Group) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO groups (id, name, group_url, admin_id, admin_only_chat, group_type, auto_delete_after, visits, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    group.id.to_string(),
                    group.name,
                    group.group_url,
                    group.admin_id.map(|id| id.to_string()),
                    group.admin_only_chat as i32,
                    group.group_type.as_str(),
                    group.auto_delete_after,
                    group.visits,
                    group.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict("Group URL already exists".to_string())
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Find a group by its slug; absence is `Ok(None)`, never an error
    #[instrument(skip(self))]
    pub fn find_by_url(&self, group_url: &str) -> Result<Option<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE group_url = ?1"
        ))?;

        let group = stmt
            .query_row(params![group_url], Self::map_group)
            .optional()?;

        Ok(group)
    }

    /// Find a group by its internal id
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Group>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?1"))?;

        let group = stmt
            .query_row(params![id.to_string()], Self::map_group)
            .optional()?;

        Ok(group)
    }

    /// List groups created by (owned by) a user
    #[instrument(skip(self))]
    pub fn find_by_admin(&self, admin_id: Uuid) -> Result<Vec<Group>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE admin_id = ?1"
        ))?;

        let groups = stmt
            .query_map(params![admin_id.to_string()], Self::map_group)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    /// List groups a user has visited
    #[instrument(skip(self))]
    pub fn find_visited_by(&self, user_id: Uuid) -> Result<Vec<Group>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT g.id, g.name, g.group_url, g.admin_id, g.admin_only_chat, g.group_type, g.auto_delete_after, g.visits, g.created_at
             FROM groups g
             INNER JOIN group_visits v ON v.group_id = g.id
             WHERE v.user_id = ?1",
        )?;

        let groups = stmt
            .query_map(params![user_id.to_string()], Self::map_group)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    /// Record a visit to a group.
    ///
    /// Idempotent per user: a second visit with the same user_id is
    /// skipped. Anonymous visits have nothing to key on and always append.
    /// Returns whether a new entry was written.
    #[instrument(skip(self))]
    pub fn record_visit(
        &self,
        group_id: Uuid,
        user_id: Option<Uuid>,
        ip_address: &str,
    ) -> Result<bool> {
        if let Some(uid) = user_id {
            let already: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM group_visits WHERE group_id = ?1 AND user_id = ?2)",
                params![group_id.to_string(), uid.to_string()],
                |row| row.get(0),
            )?;
            if already {
                return Ok(false);
            }
        }

        self.conn.execute(
            "INSERT INTO group_visits (id, group_id, user_id, ip_address, visit_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                group_id.to_string(),
                user_id.map(|id| id.to_string()),
                ip_address,
                Utc::now().to_rfc3339(),
            ],
        )?;
        self.conn.execute(
            "UPDATE groups SET visits = visits + 1 WHERE id = ?1",
            params![group_id.to_string()],
        )?;
        Ok(true)
    }

    /// List visit entries for a group in insertion order
    #[instrument(skip(self))]
    pub fn list_visits(&self, group_id: Uuid) -> Result<Vec<GroupVisit>> {
        let mut stmt = self.conn.prepare(
            "SELECT ip_address, user_id, visit_time FROM group_visits
             WHERE group_id = ?1 ORDER BY visit_time",
        )?;

        let visits = stmt
            .query_map(params![group_id.to_string()], |row| {
                Ok(GroupVisit {
                    ip_address: row.get(0)?,
                    user_id: parse_uuid_opt(row.get::<_, Option<String>>(1)?)?,
                    visit_time: parse_datetime(&row.get::<_, String>(2)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(visits)
    }

    fn map_group(row: &Row<'_>) -> rusqlite::Result<Group> {
        Ok(Group {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            name: row.get(1)?,
            group_url: row.get(2)?,
            admin_id: parse_uuid_opt(row.get::<_, Option<String>>(3)?)?,
            admin_only_chat: row.get::<_, i32>(4)? != 0,
            group_type: parse_group_type(&row.get::<_, String>(5)?),
            auto_delete_after: row.get(6)?,
            visits: row.get(7)?,
            created_at: parse_datetime(&row.get::<_, String>(8)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupType;
    use crate::storage::Database;

    #[test]
    fn test_create_duplicate_slug_conflicts() {
        let db = Database::open_in_memory().unwrap();

        let first = Group::new("Team".to_string(), "team-x".to_string(), None);
        db.groups().create(&first).unwrap();

        let second = Group::new("Other".to_string(), "team-x".to_string(), None);
        let err = db.groups().create(&second).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Exactly one row survives
        let found = db.groups().find_by_url("team-x").unwrap().unwrap();
        assert_eq!(found.name, "Team");
    }

    #[test]
    fn test_find_by_url_absent_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.groups().find_by_url("never-created").unwrap().is_none());
    }

    #[test]
    fn test_group_fields_roundtrip() {
        let db = Database::open_in_memory().unwrap();

        let group = Group::new("Team".to_string(), "team-x".to_string(), None)
            .with_admin_only_chat(true)
            .with_group_type(GroupType::Strict)
            .with_auto_delete_after(Some(12));
        db.groups().create(&group).unwrap();

        let found = db.groups().find_by_url("team-x").unwrap().unwrap();
        assert!(found.admin_only_chat);
        assert_eq!(found.group_type, GroupType::Strict);
        assert_eq!(found.auto_delete_after, Some(12));
        assert_eq!(found.visits, 0);
    }

    #[test]
    fn test_record_visit_idempotent_per_user() {
        let db = Database::open_in_memory().unwrap();

        let group = Group::new("Team".to_string(), "team-x".to_string(), None);
        db.groups().create(&group).unwrap();

        let user = crate::models::User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "hash".to_string(),
        );
        db.users().create(&user).unwrap();

        assert!(db
            .groups()
            .record_visit(group.id, Some(user.id), "10.0.0.1")
            .unwrap());
        assert!(!db
            .groups()
            .record_visit(group.id, Some(user.id), "10.0.0.1")
            .unwrap());
        assert_eq!(db.groups().list_visits(group.id).unwrap().len(), 1);

        let visited = db.groups().find_visited_by(user.id).unwrap();
        assert_eq!(visited.len(), 1);
        assert_eq!(visited[0].group_url, "team-x");

        // The counter only moves for new entries
        let found = db.groups().find_by_url("team-x").unwrap().unwrap();
        assert_eq!(found.visits, 1);
    }

    #[test]
    fn test_anonymous_visits_may_duplicate() {
        let db = Database::open_in_memory().unwrap();

        let group = Group::new("Team".to_string(), "team-x".to_string(), None);
        db.groups().create(&group).unwrap();

        assert!(db.groups().record_visit(group.id, None, "10.0.0.2").unwrap());
        assert!(db.groups().record_visit(group.id, None, "10.0.0.2").unwrap());
        assert_eq!(db.groups().list_visits(group.id).unwrap().len(), 2);
    }

    #[test]
    fn test_find_by_admin() {
        let db = Database::open_in_memory().unwrap();

        let admin = crate::models::User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "hash".to_string(),
        );
        db.users().create(&admin).unwrap();

        let mine = Group::new("Mine".to_string(), "mine".to_string(), Some(admin.id));
        let other = Group::new("Other".to_string(), "other".to_string(), None);
        db.groups().create(&mine).unwrap();
        db.groups().create(&other).unwrap();

        let created = db.groups().find_by_admin(admin.id).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].group_url, "mine");
    }
}
