use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{
    FileRateDirectory, LedgerService, NewEntry, NewTransaction, StatsQuery, TransactionFilter,
};
use crate::domain::{
    SortOrder, StatsDimension, StatsSortField, Transaction, format_cents, parse_cents,
};

/// Soldi - Multi-Currency Personal Finance Record Keeper
#[derive(Parser)]
#[command(name = "soldi")]
#[command(about = "A local-first personal finance record keeper with multi-currency fan-out")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "soldi.db")]
    pub database: String,

    /// Exchange rate table file (JSON); absent means single-currency operation
    #[arg(short, long, default_value = "rates.json")]
    pub rates: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Merchant management commands
    #[command(subcommand)]
    Merchant(MerchantCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Record a transaction
    Record {
        /// Amount in the account's currency (e.g. "-12.34" for spending)
        amount: String,

        /// Account name
        #[arg(long)]
        account: String,

        /// Merchant name
        #[arg(short, long)]
        merchant: Option<String>,

        /// Category name
        #[arg(short, long)]
        category: Option<String>,

        /// Description of the entry
        #[arg(short, long)]
        description: Option<String>,

        /// Transaction date (YYYY-MM-DD); defaults to now
        #[arg(long)]
        date: Option<String>,
    },

    /// Show a transaction with its per-currency amounts
    Show {
        /// Transaction ID
        id: String,
    },

    /// Replace the entry of a transaction (re-runs the currency fan-out)
    Update {
        /// Transaction ID
        id: String,

        /// New amount in the account's currency
        amount: String,

        /// Category name
        #[arg(short, long)]
        category: Option<String>,

        /// Description of the entry
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List transactions, newest first
    List {
        /// Filter by account name
        #[arg(long)]
        account: Option<String>,

        /// Filter by merchant name
        #[arg(short, long)]
        merchant: Option<String>,

        /// Filter by category name
        #[arg(short, long)]
        category: Option<String>,

        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Page size
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Continuation token from a previous page
        #[arg(long)]
        cursor: Option<String>,
    },

    /// Aggregated statistics over recorded entries
    Stats {
        /// Grouping dimension: category, group, merchant, account, currency, month
        #[arg(long, default_value = "category")]
        by: String,

        /// Display currency for the aggregated amounts
        #[arg(long, default_value = "EUR")]
        currency: String,

        /// Sort field: amount, count, label
        #[arg(long, default_value = "amount")]
        sort: String,

        /// Sort order: asc, desc
        #[arg(long, default_value = "desc")]
        order: String,

        /// Maximum buckets; overflow folds into "Other" (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: i64,

        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Add {
        /// Account name
        name: String,

        /// Base currency (ISO 4217 code)
        #[arg(short, long, default_value = "EUR")]
        currency: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List accounts
    List {
        /// Include archived accounts
        #[arg(long)]
        all: bool,
    },

    /// Archive an account
    Archive {
        /// Account name
        name: String,
    },

    /// Show an account's details
    Show {
        /// Account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum MerchantCommands {
    /// Create a new merchant
    Add {
        /// Merchant name
        name: String,

        /// Icon reference (emoji or asset name)
        #[arg(short, long)]
        icon: Option<String>,
    },

    /// List merchants
    List,
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category group
    Group {
        /// Group name
        name: String,

        /// Icon reference
        #[arg(short, long)]
        icon: Option<String>,
    },

    /// Create a new category within a group
    Add {
        /// Category name
        name: String,

        /// Group name
        #[arg(short, long)]
        group: String,

        /// Icon reference
        #[arg(short, long)]
        icon: Option<String>,
    },

    /// List categories
    List,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let rates = FileRateDirectory::load(&self.rates)?;

        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database, rates).await?;
                println!("Initialized database: {}", self.database);
            }

            Commands::Account(cmd) => {
                let service = LedgerService::connect(&self.database, rates).await?;
                run_account_command(&service, cmd).await?;
            }

            Commands::Merchant(cmd) => {
                let service = LedgerService::connect(&self.database, rates).await?;
                run_merchant_command(&service, cmd).await?;
            }

            Commands::Category(cmd) => {
                let service = LedgerService::connect(&self.database, rates).await?;
                run_category_command(&service, cmd).await?;
            }

            Commands::Record {
                amount,
                account,
                merchant,
                category,
                description,
                date,
            } => {
                let service = LedgerService::connect(&self.database, rates).await?;
                let amount_cents = parse_cents(&amount)
                    .with_context(|| format!("Invalid amount: {}", amount))?;
                let occurred_at = match date {
                    Some(d) => parse_date(&d)?,
                    None => Utc::now(),
                };

                let transaction = service
                    .record_transaction(NewTransaction {
                        account,
                        merchant,
                        occurred_at,
                        note: None,
                        entries: vec![NewEntry {
                            amount_cents,
                            category,
                            description,
                        }],
                    })
                    .await?;

                println!("Recorded transaction: {}", transaction.id);
                print_fanout(&transaction);
            }

            Commands::Show { id } => {
                let service = LedgerService::connect(&self.database, rates).await?;
                let id: Uuid = id.parse().context("Invalid transaction ID")?;
                let transaction = service.get_transaction(id).await?;
                print_transaction(&transaction);
            }

            Commands::Update {
                id,
                amount,
                category,
                description,
            } => {
                let service = LedgerService::connect(&self.database, rates).await?;
                let id: Uuid = id.parse().context("Invalid transaction ID")?;
                let amount_cents = parse_cents(&amount)
                    .with_context(|| format!("Invalid amount: {}", amount))?;

                let transaction = service
                    .update_transaction(
                        id,
                        vec![NewEntry {
                            amount_cents,
                            category,
                            description,
                        }],
                    )
                    .await?;

                println!("Updated transaction: {}", transaction.id);
                print_fanout(&transaction);
            }

            Commands::List {
                account,
                merchant,
                category,
                from,
                to,
                limit,
                cursor,
            } => {
                let service = LedgerService::connect(&self.database, rates).await?;
                let filter = TransactionFilter {
                    account,
                    merchant,
                    category,
                    from_date: from.as_deref().map(parse_date).transpose()?,
                    to_date: to.as_deref().map(parse_end_date).transpose()?,
                };

                let page = service
                    .list_transactions(filter, limit, cursor.as_deref())
                    .await?;

                if page.transactions.is_empty() {
                    println!("No transactions found.");
                } else {
                    println!("{:<12} {:<38} {:<12} {:<10}", "DATE", "ID", "AMOUNT", "CURRENCY");
                    println!("{}", "-".repeat(74));
                    for tx in &page.transactions {
                        let currency = tx
                            .entries
                            .first()
                            .map(|e| e.currency.as_str())
                            .unwrap_or("-");
                        println!(
                            "{:<12} {:<38} {:>12} {:<10}",
                            tx.occurred_at.format("%Y-%m-%d"),
                            tx.id,
                            format_cents(tx.base_total()),
                            currency
                        );
                    }
                }

                if let Some(token) = page.next_cursor {
                    println!();
                    println!("More results available. Next page:");
                    println!("  soldi list --cursor {}", token);
                }
            }

            Commands::Stats {
                by,
                currency,
                sort,
                order,
                limit,
                from,
                to,
            } => {
                let service = LedgerService::connect(&self.database, rates).await?;
                let dimension = StatsDimension::from_str(&by).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Invalid dimension '{}'. Valid: category, group, merchant, account, currency, month",
                        by
                    )
                })?;
                let sort_field = StatsSortField::from_str(&sort).ok_or_else(|| {
                    anyhow::anyhow!("Invalid sort field '{}'. Valid: amount, count, label", sort)
                })?;
                let sort_order = SortOrder::from_str(&order).ok_or_else(|| {
                    anyhow::anyhow!("Invalid sort order '{}'. Valid: asc, desc", order)
                })?;

                let buckets = service
                    .statistics(StatsQuery {
                        dimension,
                        from_date: from.as_deref().map(parse_date).transpose()?,
                        to_date: to.as_deref().map(parse_end_date).transpose()?,
                        display_currency: currency.to_uppercase(),
                        sort_field,
                        sort_order,
                        limit,
                    })
                    .await?;

                if buckets.is_empty() {
                    println!("No data.");
                } else {
                    println!("{:<24} {:>14} {:>8}", "LABEL", "AMOUNT", "COUNT");
                    println!("{}", "-".repeat(48));
                    for bucket in &buckets {
                        let label = match &bucket.icon {
                            Some(icon) => format!("{} {}", icon, bucket.label),
                            None => bucket.label.clone(),
                        };
                        println!(
                            "{:<24} {:>10} {} {:>8}",
                            label,
                            format_cents(bucket.amount_cents),
                            bucket.currency,
                            bucket.count
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

async fn run_account_command(
    service: &LedgerService<FileRateDirectory>,
    cmd: AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Add {
            name,
            currency,
            description,
        } => {
            let account = service
                .create_account(name, currency, description)
                .await?;
            println!("Created account: {} ({})", account.name, account.currency);
        }

        AccountCommands::List { all } => {
            let accounts = service.list_accounts(all).await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<20} {:<8} {:<10}", "NAME", "CURRENCY", "STATUS");
                println!("{}", "-".repeat(40));
                for account in accounts {
                    let status = if account.is_archived() { "archived" } else { "active" };
                    println!("{:<20} {:<8} {:<10}", account.name, account.currency, status);
                }
            }
        }

        AccountCommands::Archive { name } => {
            service.archive_account(&name).await?;
            println!("Archived account: {}", name);
        }

        AccountCommands::Show { name } => {
            let account = service.get_account(&name).await?;
            println!("Account: {}", account.name);
            println!("  Currency:  {}", account.currency);
            if let Some(description) = &account.description {
                println!("  About:     {}", description);
            }
            println!(
                "  Created:   {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(archived_at) = account.archived_at {
                println!("  Archived:  {}", archived_at.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }
    Ok(())
}

async fn run_merchant_command(
    service: &LedgerService<FileRateDirectory>,
    cmd: MerchantCommands,
) -> Result<()> {
    match cmd {
        MerchantCommands::Add { name, icon } => {
            let merchant = service.create_merchant(name, icon).await?;
            println!("Created merchant: {}", merchant.name);
        }

        MerchantCommands::List => {
            let merchants = service.list_merchants().await?;
            if merchants.is_empty() {
                println!("No merchants found.");
            } else {
                for merchant in merchants {
                    match merchant.icon {
                        Some(icon) => println!("{} {}", icon, merchant.name),
                        None => println!("{}", merchant.name),
                    }
                }
            }
        }
    }
    Ok(())
}

async fn run_category_command(
    service: &LedgerService<FileRateDirectory>,
    cmd: CategoryCommands,
) -> Result<()> {
    match cmd {
        CategoryCommands::Group { name, icon } => {
            let group = service.create_category_group(name, icon).await?;
            println!("Created category group: {}", group.name);
        }

        CategoryCommands::Add { name, group, icon } => {
            let category = service.create_category(&group, name, icon).await?;
            println!("Created category: {}", category.name);
        }

        CategoryCommands::List => {
            let categories = service.list_categories().await?;
            if categories.is_empty() {
                println!("No categories found.");
            } else {
                println!("{:<20} {:<20}", "GROUP", "CATEGORY");
                println!("{}", "-".repeat(40));
                for (category, group_name) in categories {
                    println!("{:<20} {:<20}", group_name, category.name);
                }
            }
        }
    }
    Ok(())
}

fn print_transaction(transaction: &Transaction) {
    println!("Transaction: {}", transaction.id);
    println!(
        "  Occurred:  {}",
        transaction.occurred_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Recorded:  {}",
        transaction.recorded_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(note) = &transaction.note {
        println!("  Note:      {}", note);
    }
    print_fanout(transaction);
}

fn print_fanout(transaction: &Transaction) {
    for entry in &transaction.entries {
        println!(
            "  Entry {} {} {}",
            entry.id,
            format_cents(entry.amount_cents),
            entry.currency
        );
        for amount in &entry.currency_amounts {
            println!(
                "    {:<6} {:>12}  (rate {})",
                amount.currency,
                format_cents(amount.amount_cents),
                amount.rate
            );
        }
    }
}

/// Parse a YYYY-MM-DD date as midnight UTC.
fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {}", date_str))?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .context("Invalid time")?
        .and_utc())
}

/// Parse a YYYY-MM-DD date as the end of that day, so `--to` is inclusive.
fn parse_end_date(date_str: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {}", date_str))?;
    Ok(date
        .and_hms_opt(23, 59, 59)
        .context("Invalid time")?
        .and_utc())
}
