use chrono::{DateTime, Utc};

use crate::domain::{
    Account, Category, CategoryGroup, Cents, CurrencyAmount, GroupedRow, Merchant, SortOrder,
    StatsBucket, StatsDimension, StatsSortField, Transaction, TransactionCursor, TransactionEntry,
    TransactionId, aggregate_buckets, fan_out,
};
use crate::storage::{Repository, TransactionListFilter};

use super::{AppError, RateDirectory};

/// Application service providing high-level operations over the record
/// keeper. This is the primary interface for any client (CLI, API, TUI).
///
/// The rate directory is injected so the multi-currency write path stays
/// testable without touching a real provider.
pub struct LedgerService<R: RateDirectory> {
    repo: Repository,
    rates: R,
}

/// A new transaction to record, referencing entities by name.
pub struct NewTransaction {
    pub account: String,
    pub merchant: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub entries: Vec<NewEntry>,
}

/// A line item of a new transaction, in the account's base currency.
pub struct NewEntry {
    pub amount_cents: Cents,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Filter for listing transactions, by entity names.
#[derive(Default)]
pub struct TransactionFilter {
    pub account: Option<String>,
    pub merchant: Option<String>,
    pub category: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// One page of a transaction listing. `next_cursor` is present when more
/// rows remain; passing it back resumes where this page stopped.
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub next_cursor: Option<String>,
}

/// Parameters of a statistics query.
pub struct StatsQuery {
    pub dimension: StatsDimension,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub display_currency: String,
    pub sort_field: StatsSortField,
    pub sort_order: SortOrder,
    /// 0 or negative means unlimited.
    pub limit: i64,
}

impl<R: RateDirectory> LedgerService<R> {
    /// Create a new service over an existing repository.
    pub fn new(repo: Repository, rates: R) -> Self {
        Self { repo, rates }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, rates: R) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, rates))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, rates: R) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, rates))
    }

    // ========================
    // Account operations
    // ========================

    /// Create a new account.
    pub async fn create_account(
        &self,
        name: String,
        currency: String,
        description: Option<String>,
    ) -> Result<Account, AppError> {
        if self.repo.get_account_by_name(&name).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(name));
        }

        let mut account = Account::new(name, currency.to_uppercase());
        if let Some(desc) = description {
            account = account.with_description(desc);
        }

        self.repo.save_account(&account).await?;
        Ok(account)
    }

    /// Get an account by name.
    pub async fn get_account(&self, name: &str) -> Result<Account, AppError> {
        self.repo
            .get_account_by_name(name)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(name.to_string()))
    }

    /// List all accounts.
    pub async fn list_accounts(&self, include_archived: bool) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts(include_archived).await?)
    }

    /// Archive an account (soft delete).
    pub async fn archive_account(&self, name: &str) -> Result<Account, AppError> {
        let account = self.get_account(name).await?;
        self.repo.archive_account(account.id).await?;
        Ok(account)
    }

    // ========================
    // Merchant operations
    // ========================

    /// Create a new merchant.
    pub async fn create_merchant(
        &self,
        name: String,
        icon: Option<String>,
    ) -> Result<Merchant, AppError> {
        if self.repo.get_merchant_by_name(&name).await?.is_some() {
            return Err(AppError::MerchantAlreadyExists(name));
        }

        let mut merchant = Merchant::new(name);
        if let Some(icon) = icon {
            merchant = merchant.with_icon(icon);
        }

        self.repo.save_merchant(&merchant).await?;
        Ok(merchant)
    }

    /// List all merchants.
    pub async fn list_merchants(&self) -> Result<Vec<Merchant>, AppError> {
        Ok(self.repo.list_merchants().await?)
    }

    // ========================
    // Category operations
    // ========================

    /// Create a new category group.
    pub async fn create_category_group(
        &self,
        name: String,
        icon: Option<String>,
    ) -> Result<CategoryGroup, AppError> {
        if self.repo.get_category_group_by_name(&name).await?.is_some() {
            return Err(AppError::CategoryGroupAlreadyExists(name));
        }

        let mut group = CategoryGroup::new(name);
        if let Some(icon) = icon {
            group = group.with_icon(icon);
        }

        self.repo.save_category_group(&group).await?;
        Ok(group)
    }

    /// Create a new category within an existing group.
    pub async fn create_category(
        &self,
        group_name: &str,
        name: String,
        icon: Option<String>,
    ) -> Result<Category, AppError> {
        let group = self
            .repo
            .get_category_group_by_name(group_name)
            .await?
            .ok_or_else(|| AppError::CategoryGroupNotFound(group_name.to_string()))?;

        if self.repo.get_category_by_name(&name).await?.is_some() {
            return Err(AppError::CategoryAlreadyExists(name));
        }

        let mut category = Category::new(group.id, name);
        if let Some(icon) = icon {
            category = category.with_icon(icon);
        }

        self.repo.save_category(&category).await?;
        Ok(category)
    }

    /// List all categories with their group names.
    pub async fn list_categories(&self) -> Result<Vec<(Category, String)>, AppError> {
        Ok(self.repo.list_categories().await?)
    }

    /// List all category groups.
    pub async fn list_category_groups(&self) -> Result<Vec<CategoryGroup>, AppError> {
        Ok(self.repo.list_category_groups().await?)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record a new transaction: validate the references, fetch the
    /// currency directory, fan every entry out across the supported
    /// currencies, and persist everything in one atomic write.
    ///
    /// A failing directory aborts the whole operation with nothing
    /// persisted; a single currency missing from the rate map merely has
    /// no denormalized row.
    pub async fn record_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<Transaction, AppError> {
        if new.entries.is_empty() {
            return Err(AppError::InvalidAmount(
                "Transaction must have at least one entry".to_string(),
            ));
        }
        for entry in &new.entries {
            if entry.amount_cents == 0 {
                return Err(AppError::InvalidAmount(
                    "Entry amount must be non-zero".to_string(),
                ));
            }
        }

        let account = self.get_account(&new.account).await?;
        if account.is_archived() {
            return Err(AppError::AccountArchived(account.name));
        }

        let merchant_id = match &new.merchant {
            Some(name) => Some(
                self.repo
                    .get_merchant_by_name(name)
                    .await?
                    .ok_or_else(|| AppError::MerchantNotFound(name.clone()))?
                    .id,
            ),
            None => None,
        };

        let mut transaction = Transaction::new(account.id, new.occurred_at);
        if let Some(id) = merchant_id {
            transaction = transaction.with_merchant(id);
        }
        if let Some(note) = new.note {
            transaction = transaction.with_note(note);
        }

        let entries = self
            .build_entries(transaction.id, &account.currency, new.entries)
            .await?;
        let transaction = transaction.with_entries(entries);

        self.repo.save_transaction(&transaction).await?;
        Ok(transaction)
    }

    /// Replace the entries of an existing transaction. The new entries are
    /// fanned out with current rates; old entries and their denormalized
    /// amounts are removed in the same atomic write that adds the new ones.
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        entries: Vec<NewEntry>,
    ) -> Result<Transaction, AppError> {
        if entries.is_empty() {
            return Err(AppError::InvalidAmount(
                "Transaction must have at least one entry".to_string(),
            ));
        }
        for entry in &entries {
            if entry.amount_cents == 0 {
                return Err(AppError::InvalidAmount(
                    "Entry amount must be non-zero".to_string(),
                ));
            }
        }

        let transaction = self
            .repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))?;

        let account = self
            .repo
            .get_account(transaction.account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(transaction.account_id.to_string()))?;

        let entries = self
            .build_entries(transaction.id, &account.currency, entries)
            .await?;
        self.repo.replace_entries(transaction.id, &entries).await?;

        Ok(transaction.with_entries(entries))
    }

    /// Resolve categories, fetch the directory, and fan out each entry.
    async fn build_entries(
        &self,
        transaction_id: TransactionId,
        base_currency: &str,
        new_entries: Vec<NewEntry>,
    ) -> Result<Vec<TransactionEntry>, AppError> {
        let supported = self
            .rates
            .supported_currencies()
            .await
            .map_err(AppError::RateDirectory)?;
        let rates = self
            .rates
            .rates(base_currency)
            .await
            .map_err(AppError::RateDirectory)?;

        let mut entries = Vec::with_capacity(new_entries.len());
        for new in new_entries {
            let category_id = match &new.category {
                Some(name) => Some(
                    self.repo
                        .get_category_by_name(name)
                        .await?
                        .ok_or_else(|| AppError::CategoryNotFound(name.clone()))?
                        .id,
                ),
                None => None,
            };

            let mut entry = TransactionEntry::new(
                transaction_id,
                new.amount_cents,
                base_currency.to_string(),
            );
            if let Some(id) = category_id {
                entry = entry.with_category(id);
            }
            if let Some(desc) = new.description {
                entry = entry.with_description(desc);
            }

            let amounts = fan_out(entry.amount_cents, base_currency, &supported, &rates)
                .into_iter()
                .map(|row| CurrencyAmount {
                    entry_id: entry.id,
                    currency: row.currency,
                    amount_cents: row.amount_cents,
                    rate: row.rate,
                })
                .collect();

            entries.push(entry.with_currency_amounts(amounts));
        }

        Ok(entries)
    }

    /// Get a transaction with its entries and denormalized amounts.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    /// List transactions, newest first, with keyset pagination. `cursor`
    /// is the opaque token returned by a previous page.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<TransactionPage, AppError> {
        let after = match cursor {
            Some(token) => Some(TransactionCursor::decode(token)?),
            None => None,
        };

        let list_filter = self.resolve_filter(filter).await?;

        // Fetch one extra row to learn whether another page exists.
        let mut transactions = self
            .repo
            .list_transactions(&list_filter, limit as i64 + 1, after.as_ref())
            .await?;

        let next_cursor = if transactions.len() > limit {
            transactions.truncate(limit);
            transactions.last().map(|tx| {
                TransactionCursor {
                    occurred_at: tx.occurred_at,
                    id: tx.id,
                }
                .encode()
            })
        } else {
            None
        };

        Ok(TransactionPage {
            transactions,
            next_cursor,
        })
    }

    async fn resolve_filter(
        &self,
        filter: TransactionFilter,
    ) -> Result<TransactionListFilter, AppError> {
        let account_id = match &filter.account {
            Some(name) => Some(self.get_account(name).await?.id),
            None => None,
        };
        let merchant_id = match &filter.merchant {
            Some(name) => Some(
                self.repo
                    .get_merchant_by_name(name)
                    .await?
                    .ok_or_else(|| AppError::MerchantNotFound(name.clone()))?
                    .id,
            ),
            None => None,
        };
        let category_id = match &filter.category {
            Some(name) => Some(
                self.repo
                    .get_category_by_name(name)
                    .await?
                    .ok_or_else(|| AppError::CategoryNotFound(name.clone()))?
                    .id,
            ),
            None => None,
        };

        Ok(TransactionListFilter {
            account_id,
            merchant_id,
            category_id,
            from_date: filter.from_date,
            to_date: filter.to_date,
        })
    }

    // ========================
    // Statistics
    // ========================

    /// Grouped, ranked, capped statistics over the recorded entries,
    /// expressed in the query's display currency. The repository produces
    /// the grouped rows; shaping (sort, cap, "Other" bucket) is pure.
    pub async fn statistics(&self, query: StatsQuery) -> Result<Vec<StatsBucket>, AppError> {
        let rows: Vec<GroupedRow> = self
            .repo
            .grouped_totals(
                query.dimension,
                &query.display_currency,
                query.from_date,
                query.to_date,
            )
            .await?;

        Ok(aggregate_buckets(
            rows,
            query.sort_field,
            query.sort_order,
            query.limit,
            &query.display_currency,
        ))
    }
}
