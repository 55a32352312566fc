use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntityKind, new_id};

pub type AccountId = Uuid;

/// An account (bank account, cash, card) holding a balance in a single
/// base currency. Every transaction belongs to exactly one account and its
/// entries are recorded natively in the account's currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// ISO 4217 code of the base currency.
    pub currency: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(name: String, currency: String) -> Self {
        Self {
            id: new_id(EntityKind::Account),
            name,
            currency,
            description: None,
            created_at: Utc::now(),
            archived_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}
