use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Category, CategoryGroup, CategoryId, CurrencyAmount, EntryId, GroupedRow,
    Merchant, MerchantId, StatsDimension, Transaction, TransactionCursor, TransactionEntry,
    TransactionId,
};

use super::MIGRATION_001_INITIAL;

/// Storage-level filter for listing transactions (ids already resolved).
#[derive(Debug, Clone, Default)]
pub struct TransactionListFilter {
    pub account_id: Option<AccountId>,
    pub merchant_id: Option<MerchantId>,
    pub category_id: Option<CategoryId>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Repository for persisting and querying the record keeper's entities.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the database.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, currency, description, created_at, archived_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.currency)
        .bind(&account.description)
        .bind(account.created_at.to_rfc3339())
        .bind(account.archived_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, currency, description, created_at, archived_at FROM accounts WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Get an account by name.
    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, currency, description, created_at, archived_at FROM accounts WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by name")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// List all accounts (optionally including archived).
    pub async fn list_accounts(&self, include_archived: bool) -> Result<Vec<Account>> {
        let query = if include_archived {
            "SELECT id, name, currency, description, created_at, archived_at FROM accounts ORDER BY name"
        } else {
            "SELECT id, name, currency, description, created_at, archived_at FROM accounts WHERE archived_at IS NULL ORDER BY name"
        };

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Archive an account (soft delete).
    pub async fn archive_account(&self, id: AccountId) -> Result<()> {
        sqlx::query("UPDATE accounts SET archived_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to archive account")?;
        Ok(())
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        Ok(Account {
            id: parse_id(row.get("id")).context("Invalid account ID")?,
            name: row.get("name"),
            currency: row.get("currency"),
            description: row.get("description"),
            created_at: parse_timestamp(row.get("created_at"))?,
            archived_at: row
                .get::<Option<String>, _>("archived_at")
                .map(parse_timestamp)
                .transpose()?,
        })
    }

    // ========================
    // Merchant operations
    // ========================

    /// Save a new merchant to the database.
    pub async fn save_merchant(&self, merchant: &Merchant) -> Result<()> {
        sqlx::query("INSERT INTO merchants (id, name, icon, created_at) VALUES (?, ?, ?, ?)")
            .bind(merchant.id.to_string())
            .bind(&merchant.name)
            .bind(&merchant.icon)
            .bind(merchant.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to save merchant")?;
        Ok(())
    }

    /// Get a merchant by name.
    pub async fn get_merchant_by_name(&self, name: &str) -> Result<Option<Merchant>> {
        let row = sqlx::query("SELECT id, name, icon, created_at FROM merchants WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch merchant by name")?;

        row.as_ref().map(Self::row_to_merchant).transpose()
    }

    /// List all merchants.
    pub async fn list_merchants(&self) -> Result<Vec<Merchant>> {
        let rows = sqlx::query("SELECT id, name, icon, created_at FROM merchants ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list merchants")?;

        rows.iter().map(Self::row_to_merchant).collect()
    }

    fn row_to_merchant(row: &sqlx::sqlite::SqliteRow) -> Result<Merchant> {
        Ok(Merchant {
            id: parse_id(row.get("id")).context("Invalid merchant ID")?,
            name: row.get("name"),
            icon: row.get("icon"),
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }

    // ========================
    // Category operations
    // ========================

    /// Save a new category group to the database.
    pub async fn save_category_group(&self, group: &CategoryGroup) -> Result<()> {
        sqlx::query("INSERT INTO category_groups (id, name, icon, created_at) VALUES (?, ?, ?, ?)")
            .bind(group.id.to_string())
            .bind(&group.name)
            .bind(&group.icon)
            .bind(group.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to save category group")?;
        Ok(())
    }

    /// Get a category group by name.
    pub async fn get_category_group_by_name(&self, name: &str) -> Result<Option<CategoryGroup>> {
        let row =
            sqlx::query("SELECT id, name, icon, created_at FROM category_groups WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to fetch category group by name")?;

        row.as_ref().map(Self::row_to_category_group).transpose()
    }

    /// List all category groups.
    pub async fn list_category_groups(&self) -> Result<Vec<CategoryGroup>> {
        let rows =
            sqlx::query("SELECT id, name, icon, created_at FROM category_groups ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .context("Failed to list category groups")?;

        rows.iter().map(Self::row_to_category_group).collect()
    }

    fn row_to_category_group(row: &sqlx::sqlite::SqliteRow) -> Result<CategoryGroup> {
        Ok(CategoryGroup {
            id: parse_id(row.get("id")).context("Invalid category group ID")?,
            name: row.get("name"),
            icon: row.get("icon"),
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }

    /// Save a new category to the database.
    pub async fn save_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            "INSERT INTO categories (id, group_id, name, icon, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(category.id.to_string())
        .bind(category.group_id.to_string())
        .bind(&category.name)
        .bind(&category.icon)
        .bind(category.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save category")?;
        Ok(())
    }

    /// Get a category by name.
    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, group_id, name, icon, created_at FROM categories WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category by name")?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    /// List all categories with their group names.
    pub async fn list_categories(&self) -> Result<Vec<(Category, String)>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.group_id, c.name, c.icon, c.created_at, g.name AS group_name
            FROM categories c
            JOIN category_groups g ON g.id = c.group_id
            ORDER BY g.name, c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        rows.iter()
            .map(|row| Ok((Self::row_to_category(row)?, row.get("group_name"))))
            .collect()
    }

    fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
        Ok(Category {
            id: parse_id(row.get("id")).context("Invalid category ID")?,
            group_id: parse_id(row.get("group_id")).context("Invalid category group ID")?,
            name: row.get("name"),
            icon: row.get("icon"),
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Save a transaction with its entries and their denormalized currency
    /// amounts in a single database transaction. Either everything lands
    /// or nothing does.
    pub async fn save_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_id, merchant_id, occurred_at, recorded_at, note)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.account_id.to_string())
        .bind(transaction.merchant_id.map(|id| id.to_string()))
        .bind(transaction.occurred_at.to_rfc3339())
        .bind(transaction.recorded_at.to_rfc3339())
        .bind(&transaction.note)
        .execute(&mut *tx)
        .await
        .context("Failed to save transaction")?;

        for entry in &transaction.entries {
            Self::insert_entry(&mut tx, entry).await?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }

    /// Replace the entries of a transaction: old entries and their currency
    /// amounts go, new ones come, atomically.
    pub async fn replace_entries(
        &self,
        transaction_id: TransactionId,
        entries: &[TransactionEntry],
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query(
            "DELETE FROM entry_currencies WHERE entry_id IN (SELECT id FROM entries WHERE transaction_id = ?)",
        )
        .bind(transaction_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to delete old currency amounts")?;

        sqlx::query("DELETE FROM entries WHERE transaction_id = ?")
            .bind(transaction_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete old entries")?;

        for entry in entries {
            Self::insert_entry(&mut tx, entry).await?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }

    async fn insert_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        entry: &TransactionEntry,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entries (id, transaction_id, amount_cents, currency, category_id, description)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.transaction_id.to_string())
        .bind(entry.amount_cents)
        .bind(&entry.currency)
        .bind(entry.category_id.map(|id| id.to_string()))
        .bind(&entry.description)
        .execute(&mut **tx)
        .await
        .context("Failed to save entry")?;

        for amount in &entry.currency_amounts {
            sqlx::query(
                r#"
                INSERT INTO entry_currencies (entry_id, currency, amount_cents, rate)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(amount.entry_id.to_string())
            .bind(&amount.currency)
            .bind(amount.amount_cents)
            .bind(amount.rate.to_string())
            .execute(&mut **tx)
            .await
            .context("Failed to save currency amount")?;
        }

        Ok(())
    }

    /// Get a transaction by ID, with entries and currency amounts.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            "SELECT id, account_id, merchant_id, occurred_at, recorded_at, note FROM transactions WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => {
                let mut transaction = Self::row_to_transaction(&row)?;
                transaction.entries = self.load_entries(transaction.id).await?;
                Ok(Some(transaction))
            }
            None => Ok(None),
        }
    }

    /// List transactions newest first with keyset pagination. `after` is
    /// the sort key of the last row of the previous page.
    pub async fn list_transactions(
        &self,
        filter: &TransactionListFilter,
        limit: i64,
        after: Option<&TransactionCursor>,
    ) -> Result<Vec<Transaction>> {
        let mut query = String::from(
            "SELECT id, account_id, merchant_id, occurred_at, recorded_at, note FROM transactions WHERE 1=1",
        );

        let account_id_str = filter.account_id.map(|id| id.to_string());
        let merchant_id_str = filter.merchant_id.map(|id| id.to_string());
        let category_id_str = filter.category_id.map(|id| id.to_string());
        let from_date_str = filter.from_date.map(|dt| dt.to_rfc3339());
        let to_date_str = filter.to_date.map(|dt| dt.to_rfc3339());
        let after_parts = after.map(|c| (c.occurred_at.to_rfc3339(), c.id.to_string()));

        if account_id_str.is_some() {
            query.push_str(" AND account_id = ?");
        }
        if merchant_id_str.is_some() {
            query.push_str(" AND merchant_id = ?");
        }
        if category_id_str.is_some() {
            query.push_str(" AND id IN (SELECT transaction_id FROM entries WHERE category_id = ?)");
        }
        if from_date_str.is_some() {
            query.push_str(" AND occurred_at >= ?");
        }
        if to_date_str.is_some() {
            query.push_str(" AND occurred_at <= ?");
        }
        if after_parts.is_some() {
            // Strictly after the cursor position under (occurred_at, id) DESC.
            query.push_str(" AND (occurred_at < ? OR (occurred_at = ? AND id < ?))");
        }

        query.push_str(" ORDER BY occurred_at DESC, id DESC");
        query.push_str(&format!(" LIMIT {}", limit));

        let mut sql_query = sqlx::query(&query);
        if let Some(ref s) = account_id_str {
            sql_query = sql_query.bind(s);
        }
        if let Some(ref s) = merchant_id_str {
            sql_query = sql_query.bind(s);
        }
        if let Some(ref s) = category_id_str {
            sql_query = sql_query.bind(s);
        }
        if let Some(ref s) = from_date_str {
            sql_query = sql_query.bind(s);
        }
        if let Some(ref s) = to_date_str {
            sql_query = sql_query.bind(s);
        }
        if let Some((ref occurred, ref id)) = after_parts {
            sql_query = sql_query.bind(occurred).bind(occurred).bind(id);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut transaction = Self::row_to_transaction(row)?;
            transaction.entries = self.load_entries(transaction.id).await?;
            transactions.push(transaction);
        }

        Ok(transactions)
    }

    async fn load_entries(&self, transaction_id: TransactionId) -> Result<Vec<TransactionEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, transaction_id, amount_cents, currency, category_id, description
            FROM entries
            WHERE transaction_id = ?
            ORDER BY id
            "#,
        )
        .bind(transaction_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load entries")?;

        let mut entries: Vec<TransactionEntry> =
            rows.iter().map(Self::row_to_entry).collect::<Result<_>>()?;

        let amount_rows = sqlx::query(
            r#"
            SELECT ec.entry_id, ec.currency, ec.amount_cents, ec.rate
            FROM entry_currencies ec
            JOIN entries e ON e.id = ec.entry_id
            WHERE e.transaction_id = ?
            ORDER BY ec.currency
            "#,
        )
        .bind(transaction_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load currency amounts")?;

        let mut by_entry: HashMap<EntryId, Vec<CurrencyAmount>> = HashMap::new();
        for row in &amount_rows {
            let amount = Self::row_to_currency_amount(row)?;
            by_entry.entry(amount.entry_id).or_default().push(amount);
        }

        for entry in &mut entries {
            entry.currency_amounts = by_entry.remove(&entry.id).unwrap_or_default();
        }

        Ok(entries)
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        Ok(Transaction {
            id: parse_id(row.get("id")).context("Invalid transaction ID")?,
            account_id: parse_id(row.get("account_id")).context("Invalid account ID")?,
            merchant_id: row
                .get::<Option<String>, _>("merchant_id")
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid merchant ID")?,
            occurred_at: parse_timestamp(row.get("occurred_at"))?,
            recorded_at: parse_timestamp(row.get("recorded_at"))?,
            note: row.get("note"),
            entries: Vec::new(),
        })
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<TransactionEntry> {
        Ok(TransactionEntry {
            id: parse_id(row.get("id")).context("Invalid entry ID")?,
            transaction_id: parse_id(row.get("transaction_id"))
                .context("Invalid transaction ID")?,
            amount_cents: row.get("amount_cents"),
            currency: row.get("currency"),
            category_id: row
                .get::<Option<String>, _>("category_id")
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid category ID")?,
            description: row.get("description"),
            currency_amounts: Vec::new(),
        })
    }

    fn row_to_currency_amount(row: &sqlx::sqlite::SqliteRow) -> Result<CurrencyAmount> {
        let rate_str: String = row.get("rate");
        Ok(CurrencyAmount {
            entry_id: parse_id(row.get("entry_id")).context("Invalid entry ID")?,
            currency: row.get("currency"),
            amount_cents: row.get("amount_cents"),
            rate: Decimal::from_str(&rate_str).context("Invalid rate")?,
        })
    }

    // ========================
    // Statistics
    // ========================

    /// Sum the denormalized amounts of one display currency, grouped along
    /// the requested dimension. Entries whose fan-out had no rate for the
    /// display currency contribute nothing, consistent with the write-time
    /// omission.
    pub async fn grouped_totals(
        &self,
        dimension: StatsDimension,
        display_currency: &str,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<GroupedRow>> {
        let (label_expr, icon_expr, joins) = match dimension {
            StatsDimension::Category => (
                "COALESCE(c.name, 'Uncategorized')",
                "c.icon",
                " LEFT JOIN categories c ON c.id = e.category_id",
            ),
            StatsDimension::CategoryGroup => (
                "COALESCE(g.name, 'Uncategorized')",
                "g.icon",
                " LEFT JOIN categories c ON c.id = e.category_id LEFT JOIN category_groups g ON g.id = c.group_id",
            ),
            StatsDimension::Merchant => (
                "COALESCE(m.name, 'No merchant')",
                "m.icon",
                " LEFT JOIN merchants m ON m.id = t.merchant_id",
            ),
            StatsDimension::Account => ("a.name", "NULL", " JOIN accounts a ON a.id = t.account_id"),
            StatsDimension::Currency => ("e.currency", "NULL", ""),
            StatsDimension::Month => ("strftime('%Y-%m', t.occurred_at)", "NULL", ""),
        };

        let mut query = format!(
            r#"
            SELECT {label_expr} AS label, {icon_expr} AS icon,
                   SUM(ec.amount_cents) AS amount_cents, COUNT(*) AS entry_count
            FROM entry_currencies ec
            JOIN entries e ON e.id = ec.entry_id
            JOIN transactions t ON t.id = e.transaction_id{joins}
            WHERE ec.currency = ?
            "#,
        );

        let from_date_str = from_date.map(|dt| dt.to_rfc3339());
        let to_date_str = to_date.map(|dt| dt.to_rfc3339());

        if from_date_str.is_some() {
            query.push_str(" AND t.occurred_at >= ?");
        }
        if to_date_str.is_some() {
            query.push_str(" AND t.occurred_at <= ?");
        }
        query.push_str(" GROUP BY label");

        let mut sql_query = sqlx::query(&query).bind(display_currency);
        if let Some(ref s) = from_date_str {
            sql_query = sql_query.bind(s);
        }
        if let Some(ref s) = to_date_str {
            sql_query = sql_query.bind(s);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to compute grouped totals")?;

        Ok(rows
            .iter()
            .map(|row| GroupedRow {
                label: row.get("label"),
                amount_cents: row.get("amount_cents"),
                count: row.get("entry_count"),
                icon: row.get("icon"),
            })
            .collect())
    }
}

fn parse_id(s: String) -> Result<Uuid> {
    Uuid::parse_str(&s).context("Invalid UUID")
}

fn parse_timestamp(s: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&s)
        .context("Invalid timestamp")?
        .with_timezone(&Utc))
}
