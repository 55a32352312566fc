use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntityKind, new_id};

pub type CategoryGroupId = Uuid;
pub type CategoryId = Uuid;

/// A top-level grouping of categories (e.g. "Food", "Housing").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub id: CategoryGroupId,
    pub name: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CategoryGroup {
    pub fn new(name: String) -> Self {
        Self {
            id: new_id(EntityKind::CategoryGroup),
            name,
            icon: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// A spending/income category within a group (e.g. "Groceries" in "Food").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub group_id: CategoryGroupId,
    pub name: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(group_id: CategoryGroupId, name: String) -> Self {
        Self {
            id: new_id(EntityKind::Category),
            group_id,
            name,
            icon: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}
