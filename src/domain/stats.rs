use serde::{Deserialize, Serialize};

use super::Cents;

/// Label used for the overflow bucket when results are capped.
pub const OTHER_LABEL: &str = "Other";

/// A pre-grouped aggregate row as produced by the storage layer, already
/// expressed in the caller's display currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedRow {
    pub label: String,
    pub amount_cents: Cents,
    pub count: i64,
    pub icon: Option<String>,
}

/// A ranked statistics bucket ready for presentation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsBucket {
    pub label: String,
    pub amount_cents: Cents,
    pub count: i64,
    pub currency: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsSortField {
    Amount,
    Count,
    Label,
}

impl StatsSortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsSortField::Amount => "amount",
            StatsSortField::Count => "count",
            StatsSortField::Label => "label",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "amount" => Some(StatsSortField::Amount),
            "count" => Some(StatsSortField::Count),
            "label" => Some(StatsSortField::Label),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatsSortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grouping dimension for statistics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsDimension {
    Category,
    CategoryGroup,
    Merchant,
    Account,
    Currency,
    Month,
}

impl StatsDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsDimension::Category => "category",
            StatsDimension::CategoryGroup => "group",
            StatsDimension::Merchant => "merchant",
            StatsDimension::Account => "account",
            StatsDimension::Currency => "currency",
            StatsDimension::Month => "month",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "category" => Some(StatsDimension::Category),
            "group" | "category-group" => Some(StatsDimension::CategoryGroup),
            "merchant" => Some(StatsDimension::Merchant),
            "account" => Some(StatsDimension::Account),
            "currency" => Some(StatsDimension::Currency),
            "month" => Some(StatsDimension::Month),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatsDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sort, cap, and overflow-bucket pre-grouped aggregate rows.
///
/// Rows are stably sorted by `sort_field` (labels compare
/// case-insensitively); stability decides which of the tied rows survive a
/// cap. With `limit <= 0` or enough room, the sorted rows pass through
/// unchanged. Otherwise the first `limit - 1` rows are kept and everything
/// else collapses into a trailing "Other" row (summed amount and count, no
/// icon) — appended after the kept rows even when its total would outrank
/// them under the active order. `limit == 1` collapses everything.
///
/// Total over any input; an empty `rows` yields an empty result.
pub fn aggregate_buckets(
    rows: Vec<GroupedRow>,
    sort_field: StatsSortField,
    sort_order: SortOrder,
    limit: i64,
    display_currency: &str,
) -> Vec<StatsBucket> {
    let mut rows = rows;
    rows.sort_by(|a, b| {
        let ord = match sort_field {
            StatsSortField::Amount => a.amount_cents.cmp(&b.amount_cents),
            StatsSortField::Count => a.count.cmp(&b.count),
            StatsSortField::Label => a.label.to_lowercase().cmp(&b.label.to_lowercase()),
        };
        match sort_order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    let to_bucket = |row: GroupedRow| StatsBucket {
        label: row.label,
        amount_cents: row.amount_cents,
        count: row.count,
        currency: display_currency.to_string(),
        icon: row.icon,
    };

    if limit <= 0 || rows.len() as i64 <= limit {
        return rows.into_iter().map(to_bucket).collect();
    }

    let keep = (limit - 1) as usize;
    let overflow = rows.split_off(keep);

    let mut buckets: Vec<StatsBucket> = rows.into_iter().map(to_bucket).collect();
    buckets.push(StatsBucket {
        label: OTHER_LABEL.to_string(),
        amount_cents: overflow.iter().map(|r| r.amount_cents).sum(),
        count: overflow.iter().map(|r| r.count).sum(),
        currency: display_currency.to_string(),
        icon: None,
    });
    buckets
}
