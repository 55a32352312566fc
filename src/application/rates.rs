use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

/// External rate/currency directory consumed by the write path.
///
/// A failing directory aborts the whole write: no entry is ever persisted
/// with a partial or absent fan-out. Individual currencies missing from a
/// returned rate map are normal steady-state behavior, handled downstream.
pub trait RateDirectory {
    /// All currencies amounts should be denormalized into.
    fn supported_currencies(&self) -> impl Future<Output = Result<Vec<String>>>;

    /// Multiplicative rates relative to `base`. The base currency itself
    /// need not appear.
    fn rates(&self, base: &str) -> impl Future<Output = Result<HashMap<String, Decimal>>>;
}

/// A fixed rate table loaded from a JSON file:
///
/// ```json
/// {
///   "currencies": ["EUR", "USD", "GBP"],
///   "rates": { "EUR": { "USD": "1.18", "GBP": "0.86" } }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateTable {
    #[serde(default)]
    pub currencies: Vec<String>,
    /// base currency -> (target currency -> rate)
    #[serde(default)]
    pub rates: HashMap<String, HashMap<String, Decimal>>,
}

/// File-backed [`RateDirectory`] used by the CLI. A missing file yields an
/// empty directory: fan-out then produces only the base-currency row, which
/// is plain single-currency operation rather than an error.
#[derive(Debug, Clone, Default)]
pub struct FileRateDirectory {
    table: RateTable,
}

impl FileRateDirectory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rates file: {}", path.display()))?;
        let table: RateTable = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse rates file: {}", path.display()))?;
        Ok(Self { table })
    }

    pub fn from_table(table: RateTable) -> Self {
        Self { table }
    }
}

impl RateDirectory for FileRateDirectory {
    async fn supported_currencies(&self) -> Result<Vec<String>> {
        Ok(self.table.currencies.clone())
    }

    async fn rates(&self, base: &str) -> Result<HashMap<String, Decimal>> {
        Ok(self.table.rates.get(base).cloned().unwrap_or_default())
    }
}
