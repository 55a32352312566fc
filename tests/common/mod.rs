// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use soldi::application::{
    FileRateDirectory, LedgerService, NewEntry, NewTransaction, RateDirectory, RateTable,
};
use soldi::domain::Transaction;
use tempfile::TempDir;

/// Helper to create a test service backed by a temporary database, with an
/// empty rate directory (single-currency operation).
pub async fn test_service() -> Result<(LedgerService<FileRateDirectory>, TempDir)> {
    test_service_with(RateTable::default()).await
}

/// Helper to create a test service with a fixed rate table.
pub async fn test_service_with(
    table: RateTable,
) -> Result<(LedgerService<FileRateDirectory>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(
        db_path.to_str().unwrap(),
        FileRateDirectory::from_table(table),
    )
    .await?;
    Ok((service, temp_dir))
}

/// EUR-based table: EUR, USD (1.18), GBP intentionally unrated.
pub fn eur_table_with_usd() -> RateTable {
    RateTable {
        currencies: vec!["EUR".into(), "USD".into(), "GBP".into()],
        rates: HashMap::from([(
            "EUR".to_string(),
            HashMap::from([("USD".to_string(), dec("1.18"))]),
        )]),
    }
}

/// EUR-based table with rates for both USD and GBP.
pub fn eur_table_full() -> RateTable {
    RateTable {
        currencies: vec!["EUR".into(), "USD".into(), "GBP".into()],
        rates: HashMap::from([(
            "EUR".to_string(),
            HashMap::from([
                ("USD".to_string(), dec("1.18")),
                ("GBP".to_string(), dec("0.86")),
            ]),
        )]),
    }
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// A rate directory whose fetches always fail, to exercise the
/// abort-the-whole-write contract.
pub struct FailingRates;

impl RateDirectory for FailingRates {
    async fn supported_currencies(&self) -> Result<Vec<String>> {
        Err(anyhow!("rate provider unreachable"))
    }

    async fn rates(&self, _base: &str) -> Result<HashMap<String, Decimal>> {
        Err(anyhow!("rate provider unreachable"))
    }
}

/// Helper to create a test service whose rate directory always fails.
pub async fn failing_rates_service() -> Result<(LedgerService<FailingRates>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap(), FailingRates).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Record a single-entry transaction with the fewest knobs.
pub async fn record_simple<R: RateDirectory>(
    service: &LedgerService<R>,
    account: &str,
    amount_cents: i64,
    category: Option<&str>,
    date: &str,
) -> Result<Transaction> {
    Ok(service
        .record_transaction(NewTransaction {
            account: account.to_string(),
            merchant: None,
            occurred_at: parse_date(date),
            note: None,
            entries: vec![NewEntry {
                amount_cents,
                category: category.map(|c| c.to_string()),
                description: None,
            }],
        })
        .await?)
}
