//! Boletos Core - Shared domain library.
//!
//! This crate provides the receivables domain used by every Boletos component:
//! - `admin` - Server-rendered billing panel
//! - `cli` - Command-line tools for schedule previews and reports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything here operates on records that were already loaded
//! from the backend, which keeps it trivially testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, statuses and the customer/invoice records
//! - [`schedule`] - Installment due-date generation with business-day adjustment
//! - [`holidays`] - Holiday calendars used by the scheduler
//! - [`issuance`] - Turning an issuance request into the rows to insert
//! - [`reports`] - Pending balances, monthly revenue and the dashboard summary
//! - [`validation`] - Field-level validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod holidays;
pub mod issuance;
pub mod reports;
pub mod schedule;
pub mod types;
pub mod validation;

pub use holidays::{HolidayCalendar, HolidayError};
pub use issuance::{InstallmentPlan, ManualInstallment, build_invoices, installment_description};
pub use reports::{
    CustomerBalance, DashboardSummary, MonthlyRevenue, UpcomingInvoice, balance_by_customer,
    monthly_revenue,
};
pub use schedule::{Interval, next_business_day, schedule_due_dates};
pub use types::*;
pub use validation::{FieldError, ValidationErrors};
