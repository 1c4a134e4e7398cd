//! Core types for Boletos.
//!
//! This module provides type-safe wrappers for the receivables domain and the
//! records exchanged with the backend tables.

pub mod customer;
pub mod id;
pub mod invoice;
pub mod money;
pub mod status;
pub mod timestamp;

pub use customer::{Customer, NewCustomer};
pub use id::*;
pub use invoice::{AttachmentPatch, Invoice, InvoiceUpdate, NewInvoice, Settlement};
pub use money::{AmountError, format_brl, format_date_br, parse_amount};
pub use status::InvoiceStatus;
