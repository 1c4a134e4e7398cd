//! Persistence backend for customers, invoices and attachments.
//!
//! Handlers never talk to Supabase directly. They go through [`Backend`],
//! which has two implementations:
//!
//! - [`SupabaseClient`] - PostgREST tables plus Storage over `reqwest`
//! - [`InMemoryBackend`] - process-local tables for tests and demos
//!
//! All methods take `&self`; implementations use interior mutability or
//! remote storage. Every call is one round-trip with no transactional link
//! to any other call.

use std::future::Future;

use boletos_core::{
    AttachmentPatch, Customer, Invoice, InvoiceId, InvoiceUpdate, NewCustomer, NewInvoice,
    Settlement,
};
use thiserror::Error;

pub mod memory;
pub mod supabase;

pub use memory::InMemoryBackend;
pub use supabase::SupabaseClient;

/// Errors returned by a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A write targeted a row that does not exist.
    #[error("{table} row {id} not found")]
    MissingRow { table: &'static str, id: i64 },

    /// An insert returned no rows.
    #[error("insert into {0} returned no rows")]
    EmptyInsert(&'static str),

    /// A column the payload references does not exist in the table.
    #[error("column {0} is not present")]
    UnknownColumn(String),
}

impl BackendError {
    /// Status code for responses that carried one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Table and object-store operations used by the panel.
pub trait Backend: Send + Sync + Clone + 'static {
    /// Fetch every customer row.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the request fails or the rows cannot be decoded.
    fn fetch_customers(&self) -> impl Future<Output = Result<Vec<Customer>, BackendError>> + Send;

    /// Fetch every invoice row.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the request fails or the rows cannot be decoded.
    fn fetch_invoices(&self) -> impl Future<Output = Result<Vec<Invoice>, BackendError>> + Send;

    /// Insert one customer and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the insert is rejected.
    fn insert_customer(
        &self,
        customer: &NewCustomer,
    ) -> impl Future<Output = Result<Customer, BackendError>> + Send;

    /// Insert all rows in one request and return them in input order.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the insert is rejected; no row is written then.
    fn insert_invoices(
        &self,
        invoices: &[NewInvoice],
    ) -> impl Future<Output = Result<Vec<Invoice>, BackendError>> + Send;

    /// Overwrite the editable columns of one invoice.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the update is rejected.
    fn update_invoice(
        &self,
        id: InvoiceId,
        update: &InvoiceUpdate,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Write a settlement (status and optionally `paid_at`).
    ///
    /// # Errors
    ///
    /// Returns `Err` if the update is rejected.
    fn settle_invoice(
        &self,
        id: InvoiceId,
        settlement: &Settlement,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Link an uploaded attachment to an invoice.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the update is rejected.
    fn attach(
        &self,
        id: InvoiceId,
        patch: &AttachmentPatch,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Store bytes under `path` in the attachment bucket.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the upload is rejected.
    fn upload_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Public URL of an object. Pure; does not check that it exists.
    fn public_url(&self, path: &str) -> String;

    /// Cheap read used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}
