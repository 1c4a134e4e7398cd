//! Invoice issuance handlers.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Query, State},
    response::{IntoResponse, Response},
};
use boletos_core::issuance::{MAX_INSTALLMENTS, MIN_INSTALLMENTS};
use boletos_core::{Customer, InvoiceId, ValidationErrors, format_brl};
use chrono::{Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use super::form::{IssueMode, MultipartForm, installment_count_in_range, parse_issue_form};
use super::require_known_customer;
use crate::{
    backend::Backend,
    error::AppError,
    filters,
    routes::{Notice, SelectOption, customer_options},
    services::{IssueOutcome, ServiceError, issue_invoices, load_customers},
    state::AppState,
};

/// Default number of installment rows in manual mode.
const DEFAULT_MANUAL_ROWS: usize = 2;

/// Query parameters selecting the form layout.
#[derive(Debug, Default, Deserialize)]
pub struct IssueQuery {
    pub mode: Option<String>,
    pub count: Option<usize>,
}

/// Tab linking to one form layout.
#[derive(Debug, Clone)]
pub struct ModeLink {
    pub value: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// One editable row in manual mode.
#[derive(Debug, Clone)]
pub struct ManualRowView {
    pub index: usize,
    pub amount: String,
    pub due_date: String,
    pub amount_error: String,
    pub due_date_error: String,
    pub attachment_error: String,
}

/// Issuance form template.
#[derive(Template, WebTemplate)]
#[template(path = "invoices/new.html")]
pub struct IssueFormTemplate {
    pub current_path: String,
    pub notice: Option<Notice>,
    pub customers: Vec<SelectOption>,
    pub mode: &'static str,
    pub modes: Vec<ModeLink>,
    pub values: HashMap<String, String>,
    pub errors: ValidationErrors,
    pub rows: Vec<ManualRowView>,
    pub row_count: usize,
    pub min_installments: u32,
    pub max_installments: u32,
    pub holidays_enabled: bool,
}

impl IssueFormTemplate {
    /// Submitted (or default) value of a field.
    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map_or("", String::as_str)
    }

    pub fn error(&self, name: &str) -> &str {
        self.errors.message_for(name).unwrap_or_default()
    }

    pub fn is_monthly(&self) -> bool {
        self.value("interval") != "days"
    }

    pub fn skip_checked(&self) -> bool {
        matches!(self.value("skip_non_business_days"), "on" | "true" | "1")
    }
}

/// Created invoice row on the result page.
#[derive(Debug, Clone)]
pub struct IssuedView {
    pub id: String,
    pub amount: Decimal,
    /// ISO date, formatted by the template.
    pub due_date: String,
    pub description: String,
    pub attachment_url: Option<String>,
}

/// Issuance result template.
#[derive(Template, WebTemplate)]
#[template(path = "invoices/issued.html")]
pub struct IssueResultTemplate {
    pub current_path: String,
    pub notice: Option<Notice>,
    pub invoices: Vec<IssuedView>,
    pub plan_total: String,
    pub parceled: bool,
    pub warnings: Vec<String>,
}

impl From<&IssueOutcome> for IssueResultTemplate {
    fn from(outcome: &IssueOutcome) -> Self {
        let count = outcome.invoices.len();
        let message = if outcome.parceled {
            format!(
                "{count} installments created, {} in total.",
                format_brl(outcome.plan_total)
            )
        } else {
            "Invoice created.".to_string()
        };
        let notice = if outcome.is_complete() {
            Notice::success(message)
        } else {
            Notice::warning(format!(
                "{message} Invoices without attachment: {}.",
                join_ids(&outcome.missing_attachments)
            ))
        };

        Self {
            current_path: "/invoices/new".to_string(),
            notice: Some(notice),
            invoices: outcome
                .invoices
                .iter()
                .map(|invoice| IssuedView {
                    id: invoice.id.to_string(),
                    amount: invoice.amount,
                    due_date: invoice.due_date.map(|d| d.to_string()).unwrap_or_default(),
                    description: invoice.description.clone().unwrap_or_default(),
                    attachment_url: invoice.attachment_url.clone(),
                })
                .collect(),
            plan_total: format_brl(outcome.plan_total),
            parceled: outcome.parceled,
            warnings: outcome.warnings.clone(),
        }
    }
}

fn join_ids(ids: &[InvoiceId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Default field values for a fresh form.
fn default_values(mode: IssueMode, rows: usize, today: NaiveDate) -> HashMap<String, String> {
    let iso = |date: NaiveDate| date.format("%Y-%m-%d").to_string();
    let mut values = HashMap::from([
        ("mode".to_string(), mode.as_str().to_string()),
        ("due_date".to_string(), iso(today)),
        ("first_due".to_string(), iso(today)),
        ("count".to_string(), rows.to_string()),
        ("interval".to_string(), "monthly".to_string()),
        ("interval_days".to_string(), "30".to_string()),
        ("skip_non_business_days".to_string(), "on".to_string()),
    ]);
    for i in 0..rows {
        let due = today
            .checked_add_months(Months::new(u32::try_from(i).unwrap_or(0)))
            .unwrap_or(today);
        values.insert(format!("due_date_{}", i + 1), iso(due));
    }
    values
}

/// Assemble the form page from loaded customers and current values.
fn form_page<B: Backend>(
    state: &AppState<B>,
    customers: &[Customer],
    values: HashMap<String, String>,
    errors: ValidationErrors,
    notice: Option<Notice>,
) -> IssueFormTemplate {
    let mode = values
        .get("mode")
        .and_then(|m| m.parse::<IssueMode>().ok())
        .unwrap_or_default();
    let row_count = values
        .get("count")
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|c| installment_count_in_range(*c))
        .unwrap_or(DEFAULT_MANUAL_ROWS);
    let field = |name: String| {
        let value = values.get(&name).cloned().unwrap_or_default();
        let error = errors.message_for(&name).unwrap_or_default().to_string();
        (value, error)
    };
    let rows = (1..=row_count)
        .map(|index| {
            let (amount, amount_error) = field(format!("amount_{index}"));
            let (due_date, due_date_error) = field(format!("due_date_{index}"));
            let (_, attachment_error) = field(format!("attachment_{index}"));
            ManualRowView {
                index,
                amount,
                due_date,
                amount_error,
                due_date_error,
                attachment_error,
            }
        })
        .collect();

    let notice = notice.or_else(|| {
        customers
            .is_empty()
            .then(|| Notice::warning("Register a customer before issuing invoices."))
    });

    IssueFormTemplate {
        current_path: "/invoices/new".to_string(),
        notice,
        customers: customer_options(customers, values.get("customer_id").map(String::as_str)),
        mode: mode.as_str(),
        modes: IssueMode::ALL
            .iter()
            .map(|m| ModeLink {
                value: m.as_str(),
                label: m.label(),
                active: *m == mode,
            })
            .collect(),
        values,
        errors,
        rows,
        row_count,
        min_installments: MIN_INSTALLMENTS,
        max_installments: MAX_INSTALLMENTS,
        holidays_enabled: state.holidays_enabled(),
    }
}

async fn customers_or_notice<B: Backend>(state: &AppState<B>) -> (Vec<Customer>, Option<Notice>) {
    match load_customers(state.backend()).await {
        Ok(customers) => (customers, None),
        Err(e) => {
            tracing::error!("Failed to fetch customers: {e}");
            (
                Vec::new(),
                Some(Notice::error(format!("Could not load customers: {e}"))),
            )
        }
    }
}

/// Issuance form handler.
#[instrument(skip(state))]
pub async fn new_form<B: Backend>(
    State(state): State<AppState<B>>,
    Query(query): Query<IssueQuery>,
) -> IssueFormTemplate {
    let mode = query
        .mode
        .as_deref()
        .and_then(|m| m.parse().ok())
        .unwrap_or_default();
    let rows = query
        .count
        .filter(|c| installment_count_in_range(*c))
        .unwrap_or(DEFAULT_MANUAL_ROWS);
    let today = chrono::Local::now().date_naive();

    let (customers, notice) = customers_or_notice(&state).await;
    form_page(
        &state,
        &customers,
        default_values(mode, rows, today),
        ValidationErrors::default(),
        notice,
    )
}

/// Issue invoice(s) from a multipart submission.
///
/// # Errors
///
/// Returns 400 if the multipart body cannot be read. Validation and
/// backend failures re-render the form instead.
#[instrument(skip(state, multipart))]
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = MultipartForm::read(multipart).await?;
    let (customers, load_notice) = customers_or_notice(&state).await;

    let parsed = parse_issue_form(&form).and_then(|request| {
        require_known_customer(&customers, request.customer_id).map(|()| request)
    });

    let request = match parsed {
        Ok(request) => request,
        Err(errors) => {
            // With no customers the form is hidden; form_page explains why.
            let notice = load_notice.or_else(|| {
                (!customers.is_empty())
                    .then(|| Notice::error("Please fix the highlighted fields."))
            });
            return Ok(form_page(&state, &customers, form.into_values(), errors, notice)
                .into_response());
        }
    };

    match issue_invoices(state.backend(), &request, state.calendar(), Utc::now()).await {
        Ok(outcome) => Ok(IssueResultTemplate::from(&outcome).into_response()),
        Err(ServiceError::Invalid(errors)) => {
            let notice = Some(Notice::error("Please fix the highlighted fields."));
            Ok(form_page(&state, &customers, form.into_values(), errors, notice).into_response())
        }
        Err(ServiceError::Backend(e)) => {
            tracing::error!("Failed to issue invoices: {e}");
            let notice = Some(Notice::error(format!(
                "Could not create invoices, nothing was saved: {e}"
            )));
            Ok(form_page(
                &state,
                &customers,
                form.into_values(),
                ValidationErrors::default(),
                notice,
            )
            .into_response())
        }
    }
}
