use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::Cents;

/// One converted amount produced by [`fan_out`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutRow {
    pub currency: String,
    pub amount_cents: Cents,
    pub rate: Decimal,
}

/// Denormalize a base-currency amount into its equivalents across all
/// supported currencies, using the supplied rates. Computed once at write
/// time so reads never convert.
///
/// The base currency always yields exactly one row with rate 1 and the
/// original amount untouched (no arithmetic, no rounding loss). Every other
/// supported currency that has a rate yields `trunc(amount × rate)`,
/// truncated toward zero. Supported currencies with no rate are omitted:
/// no row, no error.
///
/// Pure and deterministic; the caller is responsible for aborting the whole
/// write when it cannot obtain the currency list or rates at all.
pub fn fan_out(
    base_amount: Cents,
    base_currency: &str,
    supported: &[String],
    rates: &HashMap<String, Decimal>,
) -> Vec<FanOutRow> {
    let mut rows = Vec::with_capacity(supported.len().max(1));
    rows.push(FanOutRow {
        currency: base_currency.to_string(),
        amount_cents: base_amount,
        rate: Decimal::ONE,
    });

    for currency in supported {
        if currency == base_currency {
            continue;
        }
        let Some(rate) = rates.get(currency) else {
            continue;
        };
        let converted = Decimal::from(base_amount) * rate;
        // Amounts that no longer fit in 64-bit minor units are dropped,
        // same as a missing rate.
        let Some(amount_cents) = converted.trunc().to_i64() else {
            continue;
        };
        rows.push(FanOutRow {
            currency: currency.clone(),
            amount_cents,
            rate: *rate,
        });
    }

    rows
}
