//! Customer list and registration handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use boletos_core::{Customer, ValidationErrors};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use super::Notice;
use crate::{
    backend::Backend,
    filters,
    services::{CustomerForm, ServiceError, load_customers, register_customer},
    state::AppState,
};

/// Query parameters of the customer list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Name of a customer that was just registered.
    pub created: Option<String>,
}

/// Customer view for templates.
#[derive(Debug, Clone)]
pub struct CustomerView {
    pub id: String,
    pub name: String,
    pub document: String,
    pub email: String,
    pub phone: String,
    pub created_at: String,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.to_string(),
            name: customer.display_name(),
            document: customer.document.clone().unwrap_or_default(),
            email: customer.email.clone().unwrap_or_default(),
            phone: customer.phone.clone().unwrap_or_default(),
            created_at: customer
                .created_at
                .map(|at| at.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Customers list page template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub current_path: String,
    pub notice: Option<Notice>,
    pub customers: Vec<CustomerView>,
}

/// Registration form template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/new.html")]
pub struct CustomerFormTemplate {
    pub current_path: String,
    pub notice: Option<Notice>,
    pub form: CustomerForm,
    pub errors: ValidationErrors,
}

/// Customers list page handler.
#[instrument(skip(state))]
pub async fn index<B: Backend>(
    State(state): State<AppState<B>>,
    Query(query): Query<ListQuery>,
) -> CustomersIndexTemplate {
    let (customers, notice) = match load_customers(state.backend()).await {
        Ok(customers) => (
            customers.iter().map(CustomerView::from).collect(),
            query
                .created
                .map(|name| Notice::success(format!("Customer {name} registered."))),
        ),
        Err(e) => {
            tracing::error!("Failed to fetch customers: {e}");
            (
                Vec::new(),
                Some(Notice::error(format!("Could not load customers: {e}"))),
            )
        }
    };

    CustomersIndexTemplate {
        current_path: "/customers".to_string(),
        notice,
        customers,
    }
}

/// Empty registration form.
pub async fn new_form() -> CustomerFormTemplate {
    CustomerFormTemplate {
        current_path: "/customers/new".to_string(),
        notice: None,
        form: CustomerForm::default(),
        errors: ValidationErrors::default(),
    }
}

/// Register a customer.
///
/// Validation and backend failures re-render the form with the submitted
/// values. Success redirects to the list.
#[instrument(skip(state, form))]
pub async fn create<B: Backend>(
    State(state): State<AppState<B>>,
    Form(form): Form<CustomerForm>,
) -> Response {
    match register_customer(state.backend(), &form, Utc::now()).await {
        Ok(customer) => {
            let target = format!(
                "/customers?created={}",
                urlencoding::encode(&customer.display_name())
            );
            Redirect::to(&target).into_response()
        }
        Err(ServiceError::Invalid(errors)) => CustomerFormTemplate {
            current_path: "/customers/new".to_string(),
            notice: Some(Notice::error("Please fix the highlighted fields.")),
            form,
            errors,
        }
        .into_response(),
        Err(ServiceError::Backend(e)) => {
            tracing::error!("Failed to register customer: {e}");
            CustomerFormTemplate {
                current_path: "/customers/new".to_string(),
                notice: Some(Notice::error(format!("Could not register customer: {e}"))),
                form,
                errors: ValidationErrors::default(),
            }
            .into_response()
        }
    }
}
