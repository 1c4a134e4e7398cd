//! Invoice pages: issue, edit and settle.

use std::collections::HashMap;

use axum::{Router, routing::get};
use boletos_core::{Customer, CustomerId, Invoice, ValidationErrors};

use crate::backend::Backend;
use crate::state::AppState;

pub mod edit;
pub mod form;
pub mod issue;
pub mod settle;

/// Invoice routes.
pub fn routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/invoices/new", get(issue::new_form::<B>).post(issue::create::<B>))
        .route("/invoices/edit", get(edit::picker::<B>))
        .route(
            "/invoices/{id}/edit",
            get(edit::edit_form::<B>).post(edit::update::<B>),
        )
        .route(
            "/invoices/settle",
            get(settle::index::<B>).post(settle::settle::<B>),
        )
}

/// Customer names keyed by id.
pub(crate) fn customer_names(customers: &[Customer]) -> HashMap<CustomerId, String> {
    customers
        .iter()
        .map(|customer| (customer.id, customer.display_name()))
        .collect()
}

/// Name of an invoice's customer, or a dash when unknown.
pub(crate) fn customer_label(invoice: &Invoice, names: &HashMap<CustomerId, String>) -> String {
    invoice
        .customer_id
        .and_then(|id| names.get(&id).cloned())
        .unwrap_or_else(|| "—".to_string())
}

/// Require `customer_id` to be one of the loaded customers.
///
/// An empty list rejects every id, whether no customer exists or the load
/// failed.
pub(crate) fn require_known_customer(
    customers: &[Customer],
    customer_id: CustomerId,
) -> Result<(), ValidationErrors> {
    if customers.is_empty() {
        return Err(ValidationErrors::single(
            "customer_id",
            "No customers available. Register a customer first.",
        ));
    }
    if customers.iter().any(|c| c.id == customer_id) {
        Ok(())
    } else {
        Err(ValidationErrors::single("customer_id", "Unknown customer."))
    }
}
