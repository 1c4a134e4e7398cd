//! Settlement handlers: mark a pending invoice paid or written off.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use boletos_core::{
    Customer, Invoice, InvoiceId, InvoiceStatus, ValidationErrors, format_brl, format_date_br,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use super::{customer_label, customer_names};
use crate::{
    backend::{Backend, BackendError},
    filters,
    routes::{Notice, SelectOption},
    services::{ServiceError, load_customers, load_invoices, settle_invoice},
    state::AppState,
};

/// Query of the settle page after a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct SettledQuery {
    pub settled: Option<String>,
    pub status: Option<String>,
    /// Set when only the status could be stored.
    pub partial: Option<String>,
}

/// Submitted settlement.
#[derive(Debug, Default, Deserialize)]
pub struct SettleForm {
    #[serde(default)]
    pub invoice_id: String,
    #[serde(default)]
    pub status: String,
}

/// Pending invoice row.
#[derive(Debug, Clone)]
pub struct PendingView {
    pub id: String,
    pub customer: String,
    pub amount: String,
    pub due_date: String,
    pub description: String,
    pub attachment_url: Option<String>,
}

/// Settle page template.
#[derive(Template, WebTemplate)]
#[template(path = "invoices/settle.html")]
pub struct SettleTemplate {
    pub current_path: String,
    pub notice: Option<Notice>,
    pub pending: Vec<PendingView>,
    pub options: Vec<SelectOption>,
    pub errors: ValidationErrors,
}

impl SettleTemplate {
    pub fn error(&self, name: &str) -> &str {
        self.errors.message_for(name).unwrap_or_default()
    }
}

/// Pending invoices, earliest due date first.
fn pending_rows(invoices: &[Invoice], customers: &[Customer]) -> Vec<PendingView> {
    let names = customer_names(customers);
    let mut pending: Vec<&Invoice> = invoices.iter().filter(|i| i.is_pending()).collect();
    pending.sort_by_key(|i| (i.due_date.is_none(), i.due_date, i.id));

    pending
        .into_iter()
        .map(|invoice| PendingView {
            id: invoice.id.to_string(),
            customer: customer_label(invoice, &names),
            amount: format_brl(invoice.amount),
            due_date: invoice.due_date.map(format_date_br).unwrap_or_default(),
            description: invoice.description.clone().unwrap_or_default(),
            attachment_url: invoice.attachment_url.clone(),
        })
        .collect()
}

/// Notice for the page shown after a successful settlement.
fn settled_notice(query: &SettledQuery) -> Option<Notice> {
    let id = query.settled.as_deref()?;
    let status = query
        .status
        .as_deref()
        .map_or(InvoiceStatus::Paid, InvoiceStatus::from_stored);
    let message = format!("Invoice {id} marked as {}.", status.label().to_lowercase());
    Some(if query.partial.is_some() {
        Notice::warning(format!(
            "{message} The payment date could not be stored; only the status was updated."
        ))
    } else {
        Notice::success(message)
    })
}

async fn render<B: Backend>(
    state: &AppState<B>,
    notice: Option<Notice>,
    selected: Option<&str>,
    errors: ValidationErrors,
) -> SettleTemplate {
    let loaded = async {
        let invoices = load_invoices(state.backend()).await?;
        let customers = load_customers(state.backend()).await?;
        Ok::<_, BackendError>((invoices, customers))
    }
    .await;

    let (pending, notice) = match loaded {
        Ok((invoices, customers)) => {
            let pending = pending_rows(&invoices, &customers);
            let notice = notice.or_else(|| {
                pending
                    .is_empty()
                    .then(|| Notice::success("No pending invoices."))
            });
            (pending, notice)
        }
        Err(e) => {
            tracing::error!("Failed to load invoices: {e}");
            (
                Vec::new(),
                Some(Notice::error(format!("Could not load invoices: {e}"))),
            )
        }
    };

    let options = pending
        .iter()
        .map(|row| SelectOption {
            value: row.id.clone(),
            label: format!(
                "{} | {} | {} | {}",
                row.id, row.customer, row.amount, row.due_date
            ),
            selected: selected == Some(row.id.as_str()),
        })
        .collect();

    SettleTemplate {
        current_path: "/invoices/settle".to_string(),
        notice,
        pending,
        options,
        errors,
    }
}

/// Pending invoices page handler.
#[instrument(skip(state))]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    Query(query): Query<SettledQuery>,
) -> SettleTemplate {
    render(&state, settled_notice(&query), None, ValidationErrors::default()).await
}

/// Settle one invoice.
///
/// The invoice is looked up in a fresh load, so an invoice settled
/// elsewhere in the meantime is rejected.
#[instrument(skip(state))]
pub async fn settle<B: Backend>(
    State(state): State<AppState<B>>,
    Form(form): Form<SettleForm>,
) -> Response {
    let selected = Some(form.invoice_id.as_str());
    let Ok(id) = form.invoice_id.parse::<InvoiceId>() else {
        let errors = ValidationErrors::single("invoice_id", "Choose an invoice.");
        return render(&state, None, None, errors).await.into_response();
    };
    let Ok(status) = form.status.parse::<InvoiceStatus>() else {
        let errors = ValidationErrors::single("status", "Choose paid or written off.");
        return render(&state, None, selected, errors).await.into_response();
    };

    let invoice = match load_invoices(state.backend()).await {
        Ok(invoices) => invoices.into_iter().find(|invoice| invoice.id == id),
        Err(e) => {
            tracing::error!("Failed to load invoices: {e}");
            let notice = Some(Notice::error(format!("Could not load invoices: {e}")));
            return render(&state, notice, selected, ValidationErrors::default())
                .await
                .into_response();
        }
    };
    let Some(invoice) = invoice else {
        let errors = ValidationErrors::single("invoice_id", "Invoice not found.");
        return render(&state, None, None, errors).await.into_response();
    };

    let result = settle_invoice(
        state.backend(),
        &invoice,
        status,
        Utc::now(),
        state.settle_status_only_fallback(),
    )
    .await;

    match result {
        Ok(outcome) => {
            let mut target = format!(
                "/invoices/settle?settled={}&status={}",
                outcome.invoice_id, outcome.status
            );
            if !outcome.paid_at_recorded {
                target.push_str("&partial=1");
            }
            Redirect::to(&target).into_response()
        }
        Err(ServiceError::Invalid(errors)) => {
            render(&state, None, selected, errors).await.into_response()
        }
        Err(ServiceError::Backend(e)) => {
            tracing::error!("Failed to settle invoice: {e}");
            let notice = Some(Notice::error(format!("Could not settle invoice: {e}")));
            render(&state, notice, selected, ValidationErrors::default())
                .await
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_notice() {
        let query = SettledQuery {
            settled: Some("7".to_string()),
            status: Some("written-off".to_string()),
            partial: Some("1".to_string()),
        };
        let notice = settled_notice(&query).unwrap_or_else(|| Notice::error("missing"));
        assert_eq!(notice.kind, "warning");
        assert!(notice.message.starts_with("Invoice 7 marked as written off."));

        assert_eq!(settled_notice(&SettledQuery::default()), None);
    }
}
