//! Business logic services for admin.
//!
//! # Services
//!
//! - `attachments` - Attachment validation, object paths and uploads
//! - `customers` - Customer registration
//! - `invoices` - Issuing, editing and settling invoices
//! - `loaders` - Full-table reads used by every page
//!
//! Services are generic over [`Backend`](crate::backend::Backend) and take
//! the current time as an argument, so tests can drive them against the
//! in-memory backend with fixed clocks.

pub mod attachments;
pub mod customers;
pub mod invoices;
pub mod loaders;

pub use attachments::{Attachment, AttachmentError, AttachmentKind, upload_attachment};
pub use customers::{CustomerForm, register_customer};
pub use invoices::{
    EditRequest, IssueOutcome, IssueRequest, SettleOutcome, edit_invoice, issue_invoices,
    settle_invoice,
};
pub use loaders::{load_customers, load_invoices};

use boletos_core::ValidationErrors;
use thiserror::Error;

use crate::backend::BackendError;

/// Failure of a service call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The submission was rejected before any write.
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),

    /// The backend rejected a read or write.
    #[error("{0}")]
    Backend(#[from] BackendError),
}
