//! Money parsing and Brazilian-locale formatting.
//!
//! Amounts are `Decimal` in reais. Display uses the `R$ 1.234,56` convention;
//! input accepts both `1234.56` and `1.234,56`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Errors that can occur when parsing an amount typed into a form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input string is empty.
    #[error("amount cannot be empty")]
    Empty,
    /// The input is not a decimal number.
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
}

/// Parse an amount as typed by a user.
///
/// Strips an optional `R$` prefix and whitespace. When the input contains a
/// comma it is read as the decimal separator and dots are treated as
/// thousands separators.
///
/// # Errors
///
/// Returns [`AmountError`] if the input is empty or not a number.
pub fn parse_amount(input: &str) -> Result<Decimal, AmountError> {
    let trimmed = input.trim().trim_start_matches("R$").trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    Decimal::from_str(&normalized).map_err(|_| AmountError::Invalid(input.trim().to_string()))
}

/// Format an amount as Brazilian reais, e.g. `R$ 1.234,56`.
#[must_use]
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{frac_part}")
}

/// Format a date as `dd/mm/yyyy`.
#[must_use]
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
