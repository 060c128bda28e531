//! Group model - a slug-addressed chat room

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::expiry;

/// Declared participation policy for a group.
///
/// `Strict` expects registered users; `LinkOnly` allows anyone holding the
/// link. The value is stored and returned but no handler branches on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupType {
    #[serde(rename = "strict")]
    Strict,
    #[default]
    #[serde(rename = "link-only")]
    LinkOnly,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Strict => "strict",
            GroupType::LinkOnly => "link-only",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "strict" => GroupType::Strict,
            _ => GroupType::LinkOnly,
        }
    }
}

/// A group chat room addressed by its unique `group_url` slug
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub group_url: String,
    /// Owning user; absent for anonymous groups
    pub admin_id: Option<Uuid>,
    pub admin_only_chat: bool,
    pub group_type: GroupType,
    /// Advisory time-to-live in hours; `None` means no expiry
    pub auto_delete_after: Option<i64>,
    /// Legacy visit counter, informational only
    pub visits: i64,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: String, group_url: String, admin_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            group_url,
            admin_id,
            admin_only_chat: false,
            group_type: GroupType::LinkOnly,
            auto_delete_after: None,
            visits: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_admin_only_chat(mut self, admin_only: bool) -> Self {
        self.admin_only_chat = admin_only;
        self
    }

    pub fn with_group_type(mut self, group_type: GroupType) -> Self {
        self.group_type = group_type;
        self
    }

    pub fn with_auto_delete_after(mut self, hours: Option<i64>) -> Self {
        self.auto_delete_after = hours;
        self
    }

    /// Whether the group has outlived its configured lifetime.
    ///
    /// Advisory only: reports expiry, never deletes anything.
    pub fn should_auto_delete(&self) -> bool {
        expiry::should_auto_delete(self.created_at, self.auto_delete_after, Utc::now())
    }
}

/// A recorded visit to a group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVisit {
    pub ip_address: String,
    pub user_id: Option<Uuid>,
    pub visit_time: DateTime<Utc>,
}
