//! Aggregations over loaded customers and invoices.
//!
//! Everything here is pure: callers load the tables, these functions only
//! fold them. Degraded input (empty tables, rows missing columns) yields
//! empty or defaulted results rather than errors.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::types::{Customer, CustomerId, Invoice, InvoiceId};

/// Number of rows in the top debtors table.
pub const TOP_DEBTORS: usize = 10;
/// Number of rows in the upcoming due dates table.
pub const UPCOMING_LIMIT: usize = 15;

/// Placeholder shown when a row has neither a customer name nor an id.
const UNKNOWN_CUSTOMER: &str = "—";

/// Outstanding amount owed by one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerBalance {
    /// `None` for pending invoices that reference no customer.
    pub customer_id: Option<CustomerId>,
    /// `None` when the customer is unknown or unnamed.
    pub customer_name: Option<String>,
    pub pending_balance: Decimal,
    pub invoice_count: usize,
}

impl CustomerBalance {
    /// Name, falling back to the id, then to a dash.
    #[must_use]
    pub fn label(&self) -> String {
        match (&self.customer_name, self.customer_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => UNKNOWN_CUSTOMER.to_string(),
        }
    }
}

/// Received revenue for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub total: Decimal,
}

impl MonthlyRevenue {
    /// Sortable `YYYY-MM` key.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// `MM/YYYY`, as shown under each chart bar.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{:02}/{:04}", self.month, self.year)
    }

    /// Height of this bar in percent of the tallest bar.
    #[must_use]
    pub fn share_of(&self, max: Decimal) -> u32 {
        if max <= Decimal::ZERO {
            return 0;
        }
        (self.total * Decimal::ONE_HUNDRED / max)
            .round()
            .to_u32()
            .unwrap_or(0)
    }
}

/// A pending invoice in the upcoming due dates table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingInvoice {
    pub invoice_id: InvoiceId,
    pub customer_name: Option<String>,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub attachment_url: Option<String>,
    /// Days past the due date; zero when not yet due or undated.
    pub days_overdue: i64,
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_pending: Decimal,
    pub total_issued: Decimal,
    pub total_received: Decimal,
    /// Received over issued, in percent with one decimal place.
    pub percent_received: Decimal,
    pub pending_count: usize,
    pub paid_count: usize,
    pub invoice_count: usize,
    pub active_customers: usize,
    pub total_customers: usize,
    pub top_debtors: Vec<CustomerBalance>,
    pub upcoming: Vec<UpcomingInvoice>,
    pub revenue: Vec<MonthlyRevenue>,
}

fn names_by_id(customers: &[Customer]) -> HashMap<CustomerId, &str> {
    customers
        .iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| (c.id, c.name.as_str()))
        .collect()
}

/// Pending balance per customer, ordered by customer id.
///
/// Pending invoices without a customer reference collapse into one row with
/// neither id nor name, listed first.
#[must_use]
pub fn balance_by_customer(invoices: &[Invoice], customers: &[Customer]) -> Vec<CustomerBalance> {
    let names = names_by_id(customers);
    let mut groups: BTreeMap<Option<CustomerId>, (Decimal, usize)> = BTreeMap::new();

    for invoice in invoices.iter().filter(|i| i.is_pending()) {
        let entry = groups
            .entry(invoice.customer_id)
            .or_insert((Decimal::ZERO, 0));
        entry.0 += invoice.amount;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(customer_id, (pending_balance, invoice_count))| CustomerBalance {
            customer_id,
            customer_name: customer_id
                .and_then(|id| names.get(&id))
                .map(|name| (*name).to_string()),
            pending_balance,
            invoice_count,
        })
        .collect()
}

/// Paid revenue bucketed by calendar month, oldest first.
///
/// Each paid invoice counts in the month of `paid_at`, else `created_at`.
/// Invoices with neither are left out.
#[must_use]
pub fn monthly_revenue(invoices: &[Invoice]) -> Vec<MonthlyRevenue> {
    let mut buckets: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();

    for invoice in invoices.iter().filter(|i| i.is_paid()) {
        let Some(at) = invoice.revenue_timestamp() else {
            continue;
        };
        *buckets.entry((at.year(), at.month())).or_default() += invoice.amount;
    }

    buckets
        .into_iter()
        .map(|((year, month), total)| MonthlyRevenue { year, month, total })
        .collect()
}

fn upcoming_invoices(
    invoices: &[Invoice],
    names: &HashMap<CustomerId, &str>,
    today: NaiveDate,
) -> Vec<UpcomingInvoice> {
    let mut pending: Vec<&Invoice> = invoices.iter().filter(|i| i.is_pending()).collect();
    // undated rows sort last
    pending.sort_by_key(|i| (i.due_date.is_none(), i.due_date, i.id));

    pending
        .into_iter()
        .take(UPCOMING_LIMIT)
        .map(|invoice| UpcomingInvoice {
            invoice_id: invoice.id,
            customer_name: invoice
                .customer_id
                .and_then(|id| names.get(&id))
                .map(|name| (*name).to_string()),
            amount: invoice.amount,
            due_date: invoice.due_date,
            description: invoice.description.clone(),
            attachment_url: invoice.attachment_url.clone(),
            days_overdue: invoice
                .due_date
                .map_or(0, |due| (today - due).num_days().max(0)),
        })
        .collect()
}

impl DashboardSummary {
    /// Fold both tables into the dashboard figures as of `today`.
    #[must_use]
    pub fn compute(invoices: &[Invoice], customers: &[Customer], today: NaiveDate) -> Self {
        let names = names_by_id(customers);
        let balances = balance_by_customer(invoices, customers);

        let total_pending: Decimal = balances.iter().map(|b| b.pending_balance).sum();
        let total_issued: Decimal = invoices.iter().map(|i| i.amount).sum();
        let total_received: Decimal = invoices
            .iter()
            .filter(|i| i.is_paid())
            .map(|i| i.amount)
            .sum();
        let percent_received = if total_issued > Decimal::ZERO {
            (total_received * Decimal::ONE_HUNDRED / total_issued).round_dp(1)
        } else {
            Decimal::ZERO
        };

        let active_customers = invoices
            .iter()
            .filter_map(|i| i.customer_id)
            .collect::<HashSet<_>>()
            .len();

        let mut top_debtors = balances;
        top_debtors.sort_by(|a, b| b.pending_balance.cmp(&a.pending_balance));
        top_debtors.truncate(TOP_DEBTORS);

        Self {
            total_pending,
            total_issued,
            total_received,
            percent_received,
            pending_count: invoices.iter().filter(|i| i.is_pending()).count(),
            paid_count: invoices.iter().filter(|i| i.is_paid()).count(),
            invoice_count: invoices.len(),
            active_customers,
            total_customers: customers.len(),
            top_debtors,
            upcoming: upcoming_invoices(invoices, &names, today),
            revenue: monthly_revenue(invoices),
        }
    }

    /// Largest monthly total, used to scale the revenue chart.
    #[must_use]
    pub fn revenue_peak(&self) -> Decimal {
        self.revenue
            .iter()
            .map(|m| m.total)
            .max()
            .unwrap_or(Decimal::ZERO)
    }
}
