//! Invoice edit handlers.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use boletos_core::{
    Customer, Invoice, InvoiceId, InvoiceStatus, ValidationErrors, format_brl, format_date_br,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use super::form::{MultipartForm, parse_edit_form};
use super::{customer_label, customer_names, require_known_customer};
use crate::{
    backend::{Backend, BackendError},
    error::AppError,
    filters,
    routes::{Notice, SelectOption, customer_options},
    services::{ServiceError, edit_invoice, load_customers, load_invoices},
    state::AppState,
};

/// Query of the picker; `id` jumps straight to the form.
#[derive(Debug, Default, Deserialize)]
pub struct PickerQuery {
    pub id: Option<String>,
}

/// Query of the edit form after a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct SavedQuery {
    pub saved: Option<String>,
}

/// Invoice picker template.
#[derive(Template, WebTemplate)]
#[template(path = "invoices/pick.html")]
pub struct EditPickerTemplate {
    pub current_path: String,
    pub notice: Option<Notice>,
    pub options: Vec<SelectOption>,
}

/// Edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "invoices/edit.html")]
pub struct EditFormTemplate {
    pub current_path: String,
    pub notice: Option<Notice>,
    pub invoice_id: String,
    pub customers: Vec<SelectOption>,
    pub statuses: Vec<SelectOption>,
    pub values: HashMap<String, String>,
    pub errors: ValidationErrors,
    pub attachment_url: Option<String>,
}

impl EditFormTemplate {
    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map_or("", String::as_str)
    }

    pub fn error(&self, name: &str) -> &str {
        self.errors.message_for(name).unwrap_or_default()
    }
}

/// Picker label: `ID | customer | amount | due date`.
fn picker_label(invoice: &Invoice, customer: &str) -> String {
    format!(
        "{} | {} | {} | {}",
        invoice.id,
        customer,
        format_brl(invoice.amount),
        invoice.due_date.map(format_date_br).unwrap_or_default()
    )
}

/// Picker options ordered by customer name, then due date.
fn picker_options(invoices: &[Invoice], customers: &[Customer]) -> Vec<SelectOption> {
    let names = customer_names(customers);
    let mut rows: Vec<(String, &Invoice)> = invoices
        .iter()
        .map(|invoice| (customer_label(invoice, &names), invoice))
        .collect();
    rows.sort_by(|(a_name, a), (b_name, b)| {
        a_name
            .to_lowercase()
            .cmp(&b_name.to_lowercase())
            .then(a.due_date.cmp(&b.due_date))
            .then(a.id.cmp(&b.id))
    });

    rows.into_iter()
        .map(|(name, invoice)| SelectOption {
            value: invoice.id.to_string(),
            label: picker_label(invoice, &name),
            selected: false,
        })
        .collect()
}

fn status_options(selected: &str) -> Vec<SelectOption> {
    InvoiceStatus::ALL
        .iter()
        .map(|status| SelectOption {
            value: status.as_str().to_string(),
            label: status.label().to_string(),
            selected: status.as_str() == selected,
        })
        .collect()
}

/// Form values prefilled from the stored invoice.
fn invoice_values(invoice: &Invoice) -> HashMap<String, String> {
    HashMap::from([
        (
            "customer_id".to_string(),
            invoice.customer_id.map(|id| id.to_string()).unwrap_or_default(),
        ),
        ("amount".to_string(), invoice.amount.to_string()),
        (
            "due_date".to_string(),
            invoice
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ),
        ("status".to_string(), invoice.status.as_str().to_string()),
        (
            "description".to_string(),
            invoice.description.clone().unwrap_or_default(),
        ),
    ])
}

fn form_page(
    invoice: &Invoice,
    customers: &[Customer],
    values: HashMap<String, String>,
    errors: ValidationErrors,
    notice: Option<Notice>,
) -> EditFormTemplate {
    let status = values.get("status").cloned().unwrap_or_default();
    EditFormTemplate {
        current_path: "/invoices/edit".to_string(),
        notice,
        invoice_id: invoice.id.to_string(),
        customers: customer_options(customers, values.get("customer_id").map(String::as_str)),
        statuses: status_options(&status),
        values,
        errors,
        attachment_url: invoice.attachment_url.clone(),
    }
}

/// Load both tables and find one invoice.
async fn load_invoice<B: Backend>(
    backend: &B,
    id: InvoiceId,
) -> Result<(Invoice, Vec<Customer>), AppError> {
    let invoices = load_invoices(backend).await?;
    let invoice = invoices
        .into_iter()
        .find(|invoice| invoice.id == id)
        .ok_or_else(|| AppError::NotFound(format!("invoice {id}")))?;
    let customers = load_customers(backend).await?;
    Ok((invoice, customers))
}

/// Invoice picker handler.
#[instrument(skip(state))]
pub async fn picker<B: Backend>(
    State(state): State<AppState<B>>,
    Query(query): Query<PickerQuery>,
) -> Response {
    if let Some(id) = query.id.as_deref().and_then(|id| id.parse::<InvoiceId>().ok()) {
        return Redirect::to(&format!("/invoices/{id}/edit")).into_response();
    }

    let loaded = async {
        let invoices = load_invoices(state.backend()).await?;
        let customers = load_customers(state.backend()).await?;
        Ok::<_, BackendError>((invoices, customers))
    }
    .await;

    let (options, notice) = match loaded {
        Ok((invoices, _)) if invoices.is_empty() => {
            (Vec::new(), Some(Notice::warning("No invoices yet.")))
        }
        Ok((invoices, customers)) => (picker_options(&invoices, &customers), None),
        Err(e) => {
            tracing::error!("Failed to load invoices: {e}");
            (
                Vec::new(),
                Some(Notice::error(format!("Could not load invoices: {e}"))),
            )
        }
    };

    EditPickerTemplate {
        current_path: "/invoices/edit".to_string(),
        notice,
        options,
    }
    .into_response()
}

/// Edit form handler.
///
/// # Errors
///
/// Returns 404 for an unknown invoice and 502 if the backend is unreachable.
#[instrument(skip(state))]
pub async fn edit_form<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<InvoiceId>,
    Query(query): Query<SavedQuery>,
) -> Result<EditFormTemplate, AppError> {
    let (invoice, customers) = load_invoice(state.backend(), id).await?;
    let notice = query
        .saved
        .is_some()
        .then(|| Notice::success(format!("Invoice {id} saved.")));

    Ok(form_page(
        &invoice,
        &customers,
        invoice_values(&invoice),
        ValidationErrors::default(),
        notice,
    ))
}

/// Save an edit.
///
/// Without a new file the stored attachment is kept.
///
/// # Errors
///
/// Returns 400 for an unreadable multipart body, 404 for an unknown
/// invoice and 502 if the invoice cannot be loaded.
#[instrument(skip(state, multipart))]
pub async fn update<B: Backend>(
    State(state): State<AppState<B>>,
    Path(id): Path<InvoiceId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = MultipartForm::read(multipart).await?;
    let (invoice, customers) = load_invoice(state.backend(), id).await?;

    let parsed = parse_edit_form(&form).and_then(|request| {
        require_known_customer(&customers, request.customer_id).map(|()| request)
    });
    let request = match parsed {
        Ok(request) => request,
        Err(errors) => {
            let notice = Some(Notice::error("Please fix the highlighted fields."));
            return Ok(
                form_page(&invoice, &customers, form.into_values(), errors, notice)
                    .into_response(),
            );
        }
    };

    match edit_invoice(state.backend(), id, &request, Utc::now()).await {
        Ok(_) => Ok(Redirect::to(&format!("/invoices/{id}/edit?saved=1")).into_response()),
        Err(ServiceError::Invalid(errors)) => {
            let notice = Some(Notice::error("Please fix the highlighted fields."));
            Ok(form_page(&invoice, &customers, form.into_values(), errors, notice).into_response())
        }
        Err(ServiceError::Backend(e)) => {
            tracing::error!("Failed to update invoice: {e}");
            let notice = Some(Notice::error(format!("Could not save invoice: {e}")));
            Ok(form_page(
                &invoice,
                &customers,
                form.into_values(),
                ValidationErrors::default(),
                notice,
            )
            .into_response())
        }
    }
}
