use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, CategoryId, Cents, EntityKind, MerchantId, new_id};

pub type TransactionId = Uuid;
pub type EntryId = Uuid;

/// A recorded transaction against an account, optionally attributed to a
/// merchant. The monetary content lives in its entries; a transaction with
/// several entries is a split (one receipt, several categories).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub merchant_id: Option<MerchantId>,
    /// When the transaction occurred in the real world.
    pub occurred_at: DateTime<Utc>,
    /// When it was recorded in the system.
    pub recorded_at: DateTime<Utc>,
    pub note: Option<String>,
    pub entries: Vec<TransactionEntry>,
}

impl Transaction {
    pub fn new(account_id: AccountId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: new_id(EntityKind::Transaction),
            account_id,
            merchant_id: None,
            occurred_at,
            recorded_at: Utc::now(),
            note: None,
            entries: Vec::new(),
        }
    }

    pub fn with_merchant(mut self, merchant_id: MerchantId) -> Self {
        self.merchant_id = Some(merchant_id);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_entries(mut self, entries: Vec<TransactionEntry>) -> Self {
        self.entries = entries;
        self
    }

    /// Total of all entries in the account's base currency.
    pub fn base_total(&self) -> Cents {
        self.entries.iter().map(|e| e.amount_cents).sum()
    }
}

/// A line item of a transaction, recorded in the account's base currency
/// and denormalized into every supported currency at write time (the
/// `currency_amounts` set). Entry and fan-out are persisted atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub id: EntryId,
    pub transaction_id: TransactionId,
    /// Amount in minor units of the base currency. Sign follows the flow:
    /// negative for spending, positive for income.
    pub amount_cents: Cents,
    /// ISO 4217 code of the base currency (the account's).
    pub currency: String,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
    pub currency_amounts: Vec<CurrencyAmount>,
}

impl TransactionEntry {
    pub fn new(transaction_id: TransactionId, amount_cents: Cents, currency: String) -> Self {
        Self {
            id: new_id(EntityKind::Entry),
            transaction_id,
            amount_cents,
            currency,
            category_id: None,
            description: None,
            currency_amounts: Vec::new(),
        }
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_currency_amounts(mut self, amounts: Vec<CurrencyAmount>) -> Self {
        self.currency_amounts = amounts;
        self
    }

    /// The denormalized amount for a currency, if it was rated at write time.
    pub fn amount_in(&self, currency: &str) -> Option<Cents> {
        self.currency_amounts
            .iter()
            .find(|ca| ca.currency == currency)
            .map(|ca| ca.amount_cents)
    }
}

/// One denormalized equivalent of an entry's amount. Unique per
/// (entry, currency); the base currency row always exists with rate 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub entry_id: EntryId,
    pub currency: String,
    pub amount_cents: Cents,
    /// Multiplicative rate relative to the base currency that produced
    /// `amount_cents` at write time.
    pub rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kind_of;

    #[test]
    fn test_transaction_and_entry_ids_are_tagged() {
        let account = new_id(EntityKind::Account);
        let tx = Transaction::new(account, Utc::now());
        let entry = TransactionEntry::new(tx.id, -1500, "EUR".into());

        assert_eq!(kind_of(tx.id), Some(EntityKind::Transaction));
        assert_eq!(kind_of(entry.id), Some(EntityKind::Entry));
    }

    #[test]
    fn test_base_total_sums_entries() {
        let account = new_id(EntityKind::Account);
        let tx = Transaction::new(account, Utc::now());
        let entries = vec![
            TransactionEntry::new(tx.id, -1500, "EUR".into()),
            TransactionEntry::new(tx.id, -500, "EUR".into()),
        ];
        let tx = tx.with_entries(entries);

        assert_eq!(tx.base_total(), -2000);
    }

    #[test]
    fn test_amount_in_missing_currency() {
        let account = new_id(EntityKind::Account);
        let tx = Transaction::new(account, Utc::now());
        let entry = TransactionEntry::new(tx.id, -1500, "EUR".into());

        assert_eq!(entry.amount_in("USD"), None);
    }
}
