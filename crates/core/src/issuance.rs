//! Issuance plans: from a submitted form to the rows of one batch insert.
//!
//! Validation is all-or-nothing. If any installment fails, no rows are
//! produced and nothing is written.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::holidays::HolidayCalendar;
use crate::schedule::{Interval, schedule_due_dates};
use crate::types::{CustomerId, InvoiceStatus, NewInvoice};
use crate::validation::ValidationErrors;

/// Smallest installment count of a parceled plan.
pub const MIN_INSTALLMENTS: u32 = 2;
/// Largest installment count of a parceled plan.
pub const MAX_INSTALLMENTS: u32 = 120;

/// One hand-entered installment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualInstallment {
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

/// How the invoices of one submission are laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallmentPlan {
    /// One invoice.
    Single { amount: Decimal, due_date: NaiveDate },
    /// `count` invoices of the same amount, dated by the scheduler.
    Auto {
        count: u32,
        amount: Decimal,
        first_due: NaiveDate,
        interval: Interval,
        skip_non_business_days: bool,
    },
    /// Independently entered installments.
    Manual(Vec<ManualInstallment>),
}

impl InstallmentPlan {
    /// Number of invoices this plan creates.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Auto { count, .. } => *count as usize,
            Self::Manual(rows) => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the invoices are installments of one obligation.
    #[must_use]
    pub const fn is_parceled(&self) -> bool {
        !matches!(self, Self::Single { .. })
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        match self {
            Self::Single { amount, .. } => check_amount(&mut errors, "amount", *amount),
            Self::Auto {
                count,
                amount,
                interval,
                ..
            } => {
                check_count(&mut errors, *count as usize);
                check_amount(&mut errors, "amount", *amount);
                if *interval == Interval::EveryDays(0) {
                    errors.push("interval_days", "Interval must be at least one day.");
                }
            }
            Self::Manual(rows) => {
                check_count(&mut errors, rows.len());
                for (i, row) in rows.iter().enumerate() {
                    check_amount(&mut errors, &format!("amount_{}", i + 1), row.amount);
                }
            }
        }
        errors
    }
}

fn check_amount(errors: &mut ValidationErrors, field: &str, amount: Decimal) {
    if amount <= Decimal::ZERO {
        errors.push(field, "Amount must be greater than zero.");
    }
}

fn check_count(errors: &mut ValidationErrors, count: usize) {
    if !(MIN_INSTALLMENTS as usize..=MAX_INSTALLMENTS as usize).contains(&count) {
        errors.push(
            "count",
            format!("Installment count must be between {MIN_INSTALLMENTS} and {MAX_INSTALLMENTS}."),
        );
    }
}

/// Description of installment `index` (1-based) out of `total`.
///
/// `"Rent (Installment 2/3)"`, or only the suffix for a blank description.
#[must_use]
pub fn installment_description(description: Option<&str>, index: usize, total: usize) -> String {
    let suffix = format!("(Installment {index}/{total})");
    match description.map(str::trim) {
        Some(text) if !text.is_empty() => format!("{text} {suffix}"),
        _ => suffix,
    }
}

/// Produce the rows to insert for `plan`.
///
/// Every row starts `pending` with `created_at` as given.
///
/// # Errors
///
/// Returns [`ValidationErrors`] when any amount is not positive or the
/// installment count is out of range. No rows are returned in that case.
pub fn build_invoices(
    customer_id: CustomerId,
    description: Option<&str>,
    plan: &InstallmentPlan,
    calendar: &HolidayCalendar,
    created_at: DateTime<Utc>,
) -> Result<Vec<NewInvoice>, ValidationErrors> {
    plan.validate().into_result(())?;

    let row = |amount: Decimal, due_date: NaiveDate, description: Option<String>| NewInvoice {
        customer_id,
        amount,
        due_date,
        description,
        status: InvoiceStatus::Pending,
        created_at,
    };

    let rows = match plan {
        InstallmentPlan::Single { amount, due_date } => {
            let description = description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string);
            vec![row(*amount, *due_date, description)]
        }
        InstallmentPlan::Auto {
            count,
            amount,
            first_due,
            interval,
            skip_non_business_days,
        } => {
            let total = *count as usize;
            schedule_due_dates(*first_due, *count, *interval, *skip_non_business_days, calendar)
                .into_iter()
                .enumerate()
                .map(|(i, due)| {
                    row(
                        *amount,
                        due,
                        Some(installment_description(description, i + 1, total)),
                    )
                })
                .collect()
        }
        InstallmentPlan::Manual(installments) => {
            let total = installments.len();
            installments
                .iter()
                .enumerate()
                .map(|(i, inst)| {
                    row(
                        inst.amount,
                        inst.due_date,
                        Some(installment_description(description, i + 1, total)),
                    )
                })
                .collect()
        }
    };

    Ok(rows)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hundred() -> Decimal {
        Decimal::ONE_HUNDRED
    }

    #[test]
    fn test_installment_description() {
        assert_eq!(
            installment_description(Some("Rent"), 2, 3),
            "Rent (Installment 2/3)"
        );
        assert_eq!(
            installment_description(Some("  "), 1, 2),
            "(Installment 1/2)"
        );
        assert_eq!(installment_description(None, 1, 2), "(Installment 1/2)");
    }

    #[test]
    fn test_auto_plan_three_monthly_from_monday() {
        let plan = InstallmentPlan::Auto {
            count: 3,
            amount: hundred(),
            first_due: date(2025, 1, 6),
            interval: Interval::Monthly,
            skip_non_business_days: false,
        };
        let rows = build_invoices(
            CustomerId::new(1),
            Some("Course"),
            &plan,
            &HolidayCalendar::none(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.amount == hundred()));
        assert!(rows.iter().all(|r| r.status == InvoiceStatus::Pending));
        let dues: Vec<NaiveDate> = rows.iter().map(|r| r.due_date).collect();
        assert_eq!(dues, vec![date(2025, 1, 6), date(2025, 2, 6), date(2025, 3, 6)]);
        assert_eq!(
            rows[2].description.as_deref(),
            Some("Course (Installment 3/3)")
        );
    }

    #[test]
    fn test_single_keeps_description_unsuffixed() {
        let plan = InstallmentPlan::Single {
            amount: hundred(),
            due_date: date(2025, 2, 1),
        };
        let rows = build_invoices(
            CustomerId::new(1),
            Some(" Consulting "),
            &plan,
            &HolidayCalendar::none(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description.as_deref(), Some("Consulting"));
        assert!(!plan.is_parceled());
    }

    #[test]
    fn test_single_rejects_zero_amount() {
        let plan = InstallmentPlan::Single {
            amount: Decimal::ZERO,
            due_date: date(2025, 2, 1),
        };
        let errors = build_invoices(
            CustomerId::new(1),
            None,
            &plan,
            &HolidayCalendar::none(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(errors.message_for("amount").is_some());
    }

    #[test]
    fn test_manual_rejects_when_any_amount_non_positive() {
        let plan = InstallmentPlan::Manual(vec![
            ManualInstallment {
                amount: hundred(),
                due_date: date(2025, 2, 1),
            },
            ManualInstallment {
                amount: -Decimal::ONE,
                due_date: date(2025, 3, 1),
            },
        ]);
        let errors = build_invoices(
            CustomerId::new(1),
            None,
            &plan,
            &HolidayCalendar::none(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(errors.message_for("amount_2").is_some());
        assert!(errors.message_for("amount_1").is_none());
    }

    #[test]
    fn test_manual_keeps_entered_dates() {
        let plan = InstallmentPlan::Manual(vec![
            ManualInstallment {
                amount: hundred(),
                due_date: date(2025, 2, 1),
            },
            ManualInstallment {
                amount: Decimal::TEN,
                due_date: date(2025, 2, 15),
            },
        ]);
        let rows = build_invoices(
            CustomerId::new(4),
            None,
            &plan,
            &HolidayCalendar::none(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(rows[1].due_date, date(2025, 2, 15));
        assert_eq!(rows[1].amount, Decimal::TEN);
        assert_eq!(rows[1].description.as_deref(), Some("(Installment 2/2)"));
    }

    #[test]
    fn test_count_out_of_range() {
        let plan = InstallmentPlan::Auto {
            count: 1,
            amount: hundred(),
            first_due: date(2025, 1, 6),
            interval: Interval::EveryDays(0),
            skip_non_business_days: true,
        };
        let errors = build_invoices(
            CustomerId::new(1),
            None,
            &plan,
            &HolidayCalendar::none(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(errors.message_for("count").is_some());
        assert!(errors.message_for("interval_days").is_some());
    }
}
