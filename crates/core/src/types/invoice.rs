//! Invoice (boleto) records and the write payloads that touch them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CustomerId, InvoiceId};
use super::status::InvoiceStatus;
use super::timestamp::{lenient_date, lenient_timestamp, null_as_default};

/// An invoice row as read from the `invoices` table.
///
/// Every column other than `id` may be missing from a row; absent columns
/// fall back to `None`, zero or `Pending` instead of failing the load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }

    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Timestamp used to bucket revenue: payment time, else creation time.
    #[must_use]
    pub fn revenue_timestamp(&self) -> Option<DateTime<Utc>> {
        self.paid_at.or(self.created_at)
    }
}

/// Insert payload for one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewInvoice {
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

/// Full overwrite sent by the edit form.
///
/// `attachment_url` is omitted from the payload when no new file was
/// supplied, which leaves the stored URL untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceUpdate {
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub status: InvoiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
}

/// Status change written by the settlement flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub status: InvoiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Settlement {
    /// The full settlement: status plus payment timestamp.
    #[must_use]
    pub const fn new(status: InvoiceStatus, paid_at: DateTime<Utc>) -> Self {
        Self {
            status,
            paid_at: Some(paid_at),
        }
    }

    /// The reduced payload that only touches `status`.
    #[must_use]
    pub const fn status_only(self) -> Self {
        Self {
            status: self.status,
            paid_at: None,
        }
    }
}

/// Second-phase patch that links an uploaded attachment to its invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentPatch {
    pub attachment_url: String,
}
