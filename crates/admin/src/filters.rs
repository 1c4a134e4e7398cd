//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use boletos_core::{format_brl, format_date_br};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount as Brazilian reais.
///
/// Usage in templates: `{{ invoice.amount|brl }}` renders `R$ 1.234,50`.
/// Values that are not decimals are rendered unchanged.
#[askama::filter_fn]
pub fn brl(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(raw
        .parse::<Decimal>()
        .map_or(raw, format_brl))
}

/// Formats an ISO date as `dd/mm/yyyy`.
///
/// Usage in templates: `{{ invoice.due_date|date_br }}`
#[askama::filter_fn]
pub fn date_br(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_or(raw, format_date_br))
}
