mod common;

use anyhow::Result;
use common::{
    dec, eur_table_with_usd, failing_rates_service, parse_date, record_simple, test_service,
    test_service_with,
};
use rust_decimal::Decimal;
use soldi::application::{AppError, NewEntry, NewTransaction};

#[tokio::test]
async fn test_fanout_persists_base_and_rated_currencies() -> Result<()> {
    let (service, _temp) = test_service_with(eur_table_with_usd()).await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;

    let tx = record_simple(&service, "Checking", 1000, None, "2024-01-05").await?;
    let tx = service.get_transaction(tx.id).await?;

    let entry = &tx.entries[0];
    assert_eq!(entry.amount_cents, 1000);
    assert_eq!(entry.currency, "EUR");

    // Base row exact with rate 1, USD converted, GBP silently absent.
    assert_eq!(entry.currency_amounts.len(), 2);
    assert_eq!(entry.amount_in("EUR"), Some(1000));
    assert_eq!(entry.amount_in("USD"), Some(1180));
    assert_eq!(entry.amount_in("GBP"), None);

    let eur = entry
        .currency_amounts
        .iter()
        .find(|ca| ca.currency == "EUR")
        .unwrap();
    assert_eq!(eur.rate, Decimal::ONE);

    let usd = entry
        .currency_amounts
        .iter()
        .find(|ca| ca.currency == "USD")
        .unwrap();
    assert_eq!(usd.rate, dec("1.18"));

    Ok(())
}

#[tokio::test]
async fn test_conversion_truncates_toward_zero() -> Result<()> {
    let mut table = eur_table_with_usd();
    table
        .rates
        .get_mut("EUR")
        .unwrap()
        .insert("USD".to_string(), dec("1.005"));
    let (service, _temp) = test_service_with(table).await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;

    // 999 * 1.005 = 1003.995 -> 1003
    let tx = record_simple(&service, "Checking", 999, None, "2024-01-05").await?;
    let tx = service.get_transaction(tx.id).await?;
    assert_eq!(tx.entries[0].amount_in("USD"), Some(1003));

    // -999 * 1.005 = -1003.995 -> -1003
    let tx = record_simple(&service, "Checking", -999, None, "2024-01-06").await?;
    let tx = service.get_transaction(tx.id).await?;
    assert_eq!(tx.entries[0].amount_in("USD"), Some(-1003));

    Ok(())
}

#[tokio::test]
async fn test_empty_directory_means_single_currency() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Cash".into(), "CHF".into(), None)
        .await?;

    let tx = record_simple(&service, "Cash", -2500, None, "2024-02-01").await?;
    let tx = service.get_transaction(tx.id).await?;

    let entry = &tx.entries[0];
    assert_eq!(entry.currency_amounts.len(), 1);
    assert_eq!(entry.amount_in("CHF"), Some(-2500));

    Ok(())
}

#[tokio::test]
async fn test_failing_rate_directory_aborts_the_write() -> Result<()> {
    let (service, _temp) = failing_rates_service().await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;

    let result = record_simple(&service, "Checking", 1000, None, "2024-01-05").await;
    assert!(result.is_err());

    // Nothing was persisted.
    let page = service
        .list_transactions(Default::default(), 10, None)
        .await?;
    assert!(page.transactions.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rejects_zero_amounts_and_empty_transactions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;

    let result = record_simple(&service, "Checking", 0, None, "2024-01-05").await;
    assert!(result.is_err());

    let result = service
        .record_transaction(NewTransaction {
            account: "Checking".into(),
            merchant: None,
            occurred_at: parse_date("2024-01-05"),
            note: None,
            entries: vec![],
        })
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    Ok(())
}

#[tokio::test]
async fn test_rejects_archived_account_and_unknown_references() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Old".into(), "EUR".into(), None)
        .await?;
    service.archive_account("Old").await?;

    let result = record_simple(&service, "Old", 100, None, "2024-01-05").await;
    assert!(result.is_err());

    let result = record_simple(&service, "Missing", 100, None, "2024-01-05").await;
    assert!(result.is_err());

    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;
    let result = record_simple(&service, "Checking", 100, Some("nope"), "2024-01-05").await;
    assert!(result.is_err());

    // Failed validation persisted nothing.
    let page = service
        .list_transactions(Default::default(), 10, None)
        .await?;
    assert!(page.transactions.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_account_lookup_by_name() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Savings".into(), "EUR".into(), Some("rainy day".into()))
        .await?;

    let account = service.get_account("Savings").await?;
    assert_eq!(account.currency, "EUR");
    assert_eq!(account.description.as_deref(), Some("rainy day"));
    assert!(account.archived_at.is_none());

    service.archive_account("Savings").await?;
    let account = service.get_account("Savings").await?;
    assert!(account.archived_at.is_some());

    let result = service.get_account("Nope").await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_split_transaction_fans_out_every_entry() -> Result<()> {
    let (service, _temp) = test_service_with(eur_table_with_usd()).await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;
    service
        .create_category_group("Food".into(), None)
        .await?;
    service
        .create_category("Food", "Groceries".into(), None)
        .await?;
    service
        .create_category("Food", "Dining".into(), None)
        .await?;

    let tx = service
        .record_transaction(NewTransaction {
            account: "Checking".into(),
            merchant: None,
            occurred_at: parse_date("2024-03-10"),
            note: Some("weekly shop + lunch".into()),
            entries: vec![
                NewEntry {
                    amount_cents: -4200,
                    category: Some("Groceries".into()),
                    description: None,
                },
                NewEntry {
                    amount_cents: -1350,
                    category: Some("Dining".into()),
                    description: None,
                },
            ],
        })
        .await?;

    let tx = service.get_transaction(tx.id).await?;
    assert_eq!(tx.entries.len(), 2);
    assert_eq!(tx.base_total(), -5550);
    for entry in &tx.entries {
        assert_eq!(entry.currency_amounts.len(), 2); // EUR + USD
        assert_eq!(entry.amount_in("EUR"), Some(entry.amount_cents));
    }

    Ok(())
}

#[tokio::test]
async fn test_update_replaces_entries_and_refans() -> Result<()> {
    let (service, _temp) = test_service_with(eur_table_with_usd()).await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;

    let tx = record_simple(&service, "Checking", -1000, None, "2024-01-05").await?;

    service
        .update_transaction(
            tx.id,
            vec![NewEntry {
                amount_cents: -2000,
                category: None,
                description: Some("corrected".into()),
            }],
        )
        .await?;

    let tx = service.get_transaction(tx.id).await?;
    assert_eq!(tx.entries.len(), 1);
    assert_eq!(tx.entries[0].amount_cents, -2000);
    assert_eq!(tx.entries[0].description.as_deref(), Some("corrected"));
    assert_eq!(tx.entries[0].amount_in("USD"), Some(-2360));
    assert_eq!(tx.entries[0].currency_amounts.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_account_name_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;

    let result = service
        .create_account("Checking".into(), "USD".into(), None)
        .await;
    assert!(matches!(result, Err(AppError::AccountAlreadyExists(_))));

    Ok(())
}
