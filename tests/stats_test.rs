mod common;

use anyhow::Result;
use common::{eur_table_full, parse_date, record_simple, test_service, test_service_with};
use soldi::application::{NewEntry, NewTransaction, StatsQuery};
use soldi::domain::{SortOrder, StatsDimension, StatsSortField};

fn query(dimension: StatsDimension, currency: &str, limit: i64) -> StatsQuery {
    StatsQuery {
        dimension,
        from_date: None,
        to_date: None,
        display_currency: currency.to_string(),
        sort_field: StatsSortField::Amount,
        sort_order: SortOrder::Asc,
        limit,
    }
}

#[tokio::test]
async fn test_category_stats_match_hand_computed_totals() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;
    service.create_category_group("Food".into(), None).await?;
    service
        .create_category("Food", "Groceries".into(), None)
        .await?;
    service
        .create_category("Food", "Dining".into(), None)
        .await?;

    record_simple(&service, "Checking", -1500, Some("Groceries"), "2024-01-05").await?;
    record_simple(&service, "Checking", -2000, Some("Groceries"), "2024-01-12").await?;
    record_simple(&service, "Checking", -500, Some("Dining"), "2024-01-10").await?;
    record_simple(&service, "Checking", -750, None, "2024-01-20").await?;

    // Ascending by amount: biggest spend (most negative) first.
    let buckets = service
        .statistics(query(StatsDimension::Category, "EUR", 0))
        .await?;

    assert_eq!(buckets.len(), 3);
    assert_eq!(buckets[0].label, "Groceries");
    assert_eq!(buckets[0].amount_cents, -3500);
    assert_eq!(buckets[0].count, 2);
    assert_eq!(buckets[1].label, "Uncategorized");
    assert_eq!(buckets[1].amount_cents, -750);
    assert_eq!(buckets[2].label, "Dining");
    assert_eq!(buckets[2].amount_cents, -500);
    assert!(buckets.iter().all(|b| b.currency == "EUR"));

    Ok(())
}

#[tokio::test]
async fn test_capped_stats_fold_overflow_into_other() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;
    service.create_category_group("Life".into(), None).await?;
    for name in ["Rent", "Groceries", "Dining", "Transport"] {
        service
            .create_category("Life", name.to_string(), None)
            .await?;
    }

    record_simple(&service, "Checking", -90000, Some("Rent"), "2024-01-01").await?;
    record_simple(&service, "Checking", -30000, Some("Groceries"), "2024-01-02").await?;
    record_simple(&service, "Checking", -12000, Some("Dining"), "2024-01-03").await?;
    record_simple(&service, "Checking", -8000, Some("Transport"), "2024-01-04").await?;

    let buckets = service
        .statistics(query(StatsDimension::Category, "EUR", 3))
        .await?;

    assert_eq!(buckets.len(), 3);
    assert_eq!(buckets[0].label, "Rent");
    assert_eq!(buckets[1].label, "Groceries");
    assert_eq!(buckets[2].label, "Other");
    assert_eq!(buckets[2].amount_cents, -20000);
    assert_eq!(buckets[2].count, 2);
    assert_eq!(buckets[2].icon, None);

    Ok(())
}

#[tokio::test]
async fn test_stats_in_display_currency_use_denormalized_amounts() -> Result<()> {
    let (service, _temp) = test_service_with(eur_table_full()).await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;
    service.create_category_group("Food".into(), None).await?;
    service
        .create_category("Food", "Groceries".into(), None)
        .await?;

    record_simple(&service, "Checking", -1000, Some("Groceries"), "2024-01-05").await?;

    let buckets = service
        .statistics(query(StatsDimension::Category, "USD", 0))
        .await?;

    // -1000 EUR * 1.18 truncated toward zero.
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].amount_cents, -1180);
    assert_eq!(buckets[0].currency, "USD");

    // A currency never fanned out to has no contributions at all.
    let buckets = service
        .statistics(query(StatsDimension::Category, "JPY", 0))
        .await?;
    assert!(buckets.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_merchant_and_month_dimensions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;
    service
        .create_merchant("Esselunga".into(), Some("🛒".into()))
        .await?;

    service
        .record_transaction(NewTransaction {
            account: "Checking".into(),
            merchant: Some("Esselunga".into()),
            occurred_at: parse_date("2024-01-05"),
            note: None,
            entries: vec![NewEntry {
                amount_cents: -4000,
                category: None,
                description: None,
            }],
        })
        .await?;
    record_simple(&service, "Checking", -1000, None, "2024-02-10").await?;

    let buckets = service
        .statistics(query(StatsDimension::Merchant, "EUR", 0))
        .await?;
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].label, "Esselunga");
    assert_eq!(buckets[0].icon.as_deref(), Some("🛒"));
    assert_eq!(buckets[1].label, "No merchant");

    let mut by_month = query(StatsDimension::Month, "EUR", 0);
    by_month.sort_field = StatsSortField::Label;
    let buckets = service.statistics(by_month).await?;
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].label, "2024-01");
    assert_eq!(buckets[0].amount_cents, -4000);
    assert_eq!(buckets[1].label, "2024-02");
    assert_eq!(buckets[1].amount_cents, -1000);

    Ok(())
}

#[tokio::test]
async fn test_date_range_limits_the_aggregation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_account("Checking".into(), "EUR".into(), None)
        .await?;

    record_simple(&service, "Checking", -100, None, "2024-01-15").await?;
    record_simple(&service, "Checking", -200, None, "2024-02-15").await?;

    let mut q = query(StatsDimension::Account, "EUR", 0);
    q.from_date = Some(parse_date("2024-02-01"));
    let buckets = service.statistics(q).await?;

    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].label, "Checking");
    assert_eq!(buckets[0].amount_cents, -200);
    assert_eq!(buckets[0].count, 1);

    Ok(())
}
