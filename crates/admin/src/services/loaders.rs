//! Full-table loads, one per page view.

use boletos_core::{Customer, Invoice};
use tracing::instrument;

use crate::backend::{Backend, BackendError};

/// Every customer, sorted by name (case-insensitive), then id.
///
/// # Errors
///
/// Returns `BackendError` if the table cannot be read.
#[instrument(skip(backend))]
pub async fn load_customers<B: Backend>(backend: &B) -> Result<Vec<Customer>, BackendError> {
    let mut customers = backend.fetch_customers().await?;
    customers.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });
    tracing::debug!(count = customers.len(), "Loaded customers");
    Ok(customers)
}

/// Every invoice, in backend order.
///
/// # Errors
///
/// Returns `BackendError` if the table cannot be read.
#[instrument(skip(backend))]
pub async fn load_invoices<B: Backend>(backend: &B) -> Result<Vec<Invoice>, BackendError> {
    let invoices = backend.fetch_invoices().await?;
    tracing::debug!(count = invoices.len(), "Loaded invoices");
    Ok(invoices)
}
