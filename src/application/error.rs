use thiserror::Error;

use crate::domain::CursorError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Account is archived: {0}")]
    AccountArchived(String),

    #[error("Merchant not found: {0}")]
    MerchantNotFound(String),

    #[error("Merchant already exists: {0}")]
    MerchantAlreadyExists(String),

    #[error("Category group not found: {0}")]
    CategoryGroupNotFound(String),

    #[error("Category group already exists: {0}")]
    CategoryGroupAlreadyExists(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category already exists: {0}")]
    CategoryAlreadyExists(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid continuation token")]
    InvalidCursor(#[from] CursorError),

    #[error("Rate directory unavailable: {0}")]
    RateDirectory(#[source] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
