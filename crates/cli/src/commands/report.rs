//! Receivables report from the live backend.
//!
//! # Environment Variables
//!
//! Same as the admin panel: `SUPABASE_URL`, `SUPABASE_KEY` and the
//! optional table and bucket names.

use boletos_admin::backend::SupabaseClient;
use boletos_admin::config::AdminConfig;
use boletos_admin::services::{load_customers, load_invoices};
use boletos_core::{DashboardSummary, format_brl, format_date_br};

use super::CliError;

/// Plain-text rendering of the dashboard summary.
#[must_use]
pub fn render_summary(summary: &DashboardSummary) -> String {
    let mut out = vec![
        format!(
            "Outstanding: {} ({} invoices)",
            format_brl(summary.total_pending),
            summary.pending_count
        ),
        format!(
            "Issued:      {} ({} invoices)",
            format_brl(summary.total_issued),
            summary.invoice_count
        ),
        format!(
            "Received:    {} ({:.1}% of issued, {} paid)",
            format_brl(summary.total_received),
            summary.percent_received,
            summary.paid_count
        ),
        format!(
            "Customers:   {} with invoices, {} registered",
            summary.active_customers, summary.total_customers
        ),
    ];

    if !summary.top_debtors.is_empty() {
        out.push(String::new());
        out.push("Largest balances:".to_string());
        for debtor in &summary.top_debtors {
            out.push(format!(
                "  {:<30} {:>14}",
                debtor.label(),
                format_brl(debtor.pending_balance)
            ));
        }
    }

    if !summary.upcoming.is_empty() {
        out.push(String::new());
        out.push("Next due:".to_string());
        for invoice in &summary.upcoming {
            let due = invoice.due_date.map(format_date_br).unwrap_or_default();
            let overdue = if invoice.days_overdue > 0 {
                format!("  {} days overdue", invoice.days_overdue)
            } else {
                String::new()
            };
            out.push(format!(
                "  #{:<6} {:<10} {:<24} {:>14}{overdue}",
                invoice.invoice_id,
                due,
                invoice.customer_name.as_deref().unwrap_or("—"),
                format_brl(invoice.amount)
            ));
        }
    }

    if !summary.revenue.is_empty() {
        out.push(String::new());
        out.push("Monthly revenue:".to_string());
        for month in &summary.revenue {
            out.push(format!("  {}  {:>14}", month.label(), format_brl(month.total)));
        }
    }

    out.join("\n")
}

/// Load both tables and print the summary.
///
/// # Errors
///
/// Returns `CliError` if configuration is missing or the backend fails.
#[allow(clippy::print_stdout)]
pub async fn run(json: bool) -> Result<(), CliError> {
    let config = AdminConfig::from_env()?;
    let client = SupabaseClient::new(&config.supabase)?;

    tracing::info!("Loading tables from {}", config.supabase.url);
    let customers = load_customers(&client).await?;
    let invoices = load_invoices(&client).await?;

    let today = chrono::Local::now().date_naive();
    let summary = DashboardSummary::compute(&invoices, &customers, today);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render_summary(&summary));
    }
    Ok(())
}
