use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntityKind, new_id};

pub type MerchantId = Uuid;

/// A merchant / counterparty a transaction was made with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub name: String,
    /// Client-side icon reference (emoji or asset name), surfaced in stats.
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Merchant {
    pub fn new(name: String) -> Self {
        Self {
            id: new_id(EntityKind::Merchant),
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
