//! Installment due-date preview.
//!
//! Runs the same scheduler and count limits as the issuance form, without
//! touching the backend.

use boletos_admin::config::HolidaySettings;
use boletos_core::issuance::{MAX_INSTALLMENTS, MIN_INSTALLMENTS};
use boletos_core::{
    HolidayCalendar, Interval, ValidationErrors, format_brl, format_date_br,
    installment_description, schedule_due_dates,
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::CliError;

/// Arguments of `boletos-cli schedule`.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub start: NaiveDate,
    pub count: u32,
    pub every_days: Option<u32>,
    pub skip_non_business_days: bool,
    pub holidays: HolidaySettings,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
}

impl PreviewRequest {
    fn interval(&self) -> Interval {
        self.every_days.map_or(Interval::Monthly, Interval::EveryDays)
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&self.count) {
            errors.push(
                "count",
                format!(
                    "Installment count must be between {MIN_INSTALLMENTS} and {MAX_INSTALLMENTS}."
                ),
            );
        }
        if self.every_days == Some(0) {
            errors.push("every_days", "Interval must be at least one day.");
        }
        if self.amount.is_some_and(|amount| amount <= Decimal::ZERO) {
            errors.push("amount", "Amount must be greater than zero.");
        }
        errors.into_result(())
    }
}

/// Table lines for the preview, one per installment.
///
/// # Errors
///
/// Returns `ValidationErrors` for an out-of-range count, a zero-day
/// interval or a non-positive amount.
pub fn preview_lines(
    request: &PreviewRequest,
    calendar: &HolidayCalendar,
) -> Result<Vec<String>, ValidationErrors> {
    request.validate()?;

    let total = request.count as usize;
    let dates = schedule_due_dates(
        request.start,
        request.count,
        request.interval(),
        request.skip_non_business_days,
        calendar,
    );

    Ok(dates
        .into_iter()
        .enumerate()
        .map(|(i, due)| {
            let amount = request.amount.map(format_brl).unwrap_or_default();
            format!(
                "{:>3}  {}  {}  {:>14}  {}",
                i + 1,
                format_date_br(due),
                due.weekday(),
                amount,
                installment_description(request.description.as_deref(), i + 1, total)
            )
        })
        .collect())
}

/// Print the preview.
///
/// # Errors
///
/// Returns `CliError` if the holiday file cannot be loaded or the
/// arguments are invalid.
#[allow(clippy::print_stdout)]
pub fn run(request: &PreviewRequest) -> Result<(), CliError> {
    let calendar = if request.skip_non_business_days {
        request.holidays.build_calendar()?
    } else {
        HolidayCalendar::none()
    };

    for line in preview_lines(request, &calendar)? {
        println!("{line}");
    }
    if let Some(amount) = request.amount {
        println!(
            "Total: {}",
            format_brl(amount * Decimal::from(request.count))
        );
    }
    Ok(())
}
