//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use boletos_core::{
    CustomerBalance, DashboardSummary, MonthlyRevenue, UpcomingInvoice, format_brl, format_date_br,
};
use tracing::instrument;

use super::Notice;
use crate::{
    backend::Backend,
    filters,
    services::{load_customers, load_invoices},
    state::AppState,
};

/// Headline figures, preformatted.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub total_pending: String,
    pub total_issued: String,
    pub total_received: String,
    pub percent_received: String,
    pub pending_count: usize,
    pub paid_count: usize,
    pub invoice_count: usize,
    pub active_customers: usize,
    pub total_customers: usize,
}

impl From<&DashboardSummary> for DashboardMetrics {
    fn from(summary: &DashboardSummary) -> Self {
        Self {
            total_pending: format_brl(summary.total_pending),
            total_issued: format_brl(summary.total_issued),
            total_received: format_brl(summary.total_received),
            percent_received: format!("{:.1}%", summary.percent_received),
            pending_count: summary.pending_count,
            paid_count: summary.paid_count,
            invoice_count: summary.invoice_count,
            active_customers: summary.active_customers,
            total_customers: summary.total_customers,
        }
    }
}

/// Row of the top debtors table.
#[derive(Debug, Clone)]
pub struct DebtorView {
    pub customer: String,
    pub balance: String,
    pub invoice_count: usize,
}

impl From<&CustomerBalance> for DebtorView {
    fn from(balance: &CustomerBalance) -> Self {
        Self {
            customer: balance.label(),
            balance: format_brl(balance.pending_balance),
            invoice_count: balance.invoice_count,
        }
    }
}

/// Row of the upcoming due dates table.
#[derive(Debug, Clone)]
pub struct UpcomingView {
    pub id: String,
    pub customer: String,
    pub amount: String,
    pub due_date: String,
    pub description: String,
    pub attachment_url: Option<String>,
    pub days_overdue: i64,
}

impl From<&UpcomingInvoice> for UpcomingView {
    fn from(invoice: &UpcomingInvoice) -> Self {
        Self {
            id: invoice.invoice_id.to_string(),
            customer: invoice
                .customer_name
                .clone()
                .unwrap_or_else(|| "—".to_string()),
            amount: format_brl(invoice.amount),
            due_date: invoice.due_date.map(format_date_br).unwrap_or_default(),
            description: invoice.description.clone().unwrap_or_default(),
            attachment_url: invoice.attachment_url.clone(),
            days_overdue: invoice.days_overdue,
        }
    }
}

/// One bar of the monthly revenue chart.
#[derive(Debug, Clone)]
pub struct RevenueBarView {
    pub label: String,
    pub total: String,
    /// Bar height in percent of the tallest month.
    pub share: u32,
}

impl RevenueBarView {
    fn new(month: &MonthlyRevenue, peak: rust_decimal::Decimal) -> Self {
        Self {
            label: month.label(),
            total: format_brl(month.total),
            share: month.share_of(peak),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub current_path: String,
    pub notice: Option<Notice>,
    pub metrics: DashboardMetrics,
    pub debtors: Vec<DebtorView>,
    pub upcoming: Vec<UpcomingView>,
    pub revenue: Vec<RevenueBarView>,
}

/// Dashboard page handler.
///
/// Backend failures render an empty dashboard with an error banner.
#[instrument(skip(state))]
pub async fn index<B: Backend>(State(state): State<AppState<B>>) -> DashboardTemplate {
    let today = chrono::Local::now().date_naive();
    let loaded = async {
        let customers = load_customers(state.backend()).await?;
        let invoices = load_invoices(state.backend()).await?;
        Ok::<_, crate::backend::BackendError>((customers, invoices))
    }
    .await;

    let (customers, invoices, notice) = match loaded {
        Ok((customers, invoices)) => (customers, invoices, None),
        Err(e) => {
            tracing::error!("Failed to load dashboard data: {e}");
            (
                Vec::new(),
                Vec::new(),
                Some(Notice::error(format!("Could not load data: {e}"))),
            )
        }
    };

    let summary = DashboardSummary::compute(&invoices, &customers, today);
    let peak = summary.revenue_peak();

    DashboardTemplate {
        current_path: "/".to_string(),
        notice,
        metrics: DashboardMetrics::from(&summary),
        debtors: summary.top_debtors.iter().map(DebtorView::from).collect(),
        upcoming: summary.upcoming.iter().map(UpcomingView::from).collect(),
        revenue: summary
            .revenue
            .iter()
            .map(|month| RevenueBarView::new(month, peak))
            .collect(),
    }
}
