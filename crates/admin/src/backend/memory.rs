//! In-memory backend for tests and local demos.
//!
//! Mirrors the observable behavior of the Supabase tables: ids are assigned
//! on insert, patches touch only the columns they carry, and a patch on a
//! missing row fails. Failure switches let tests exercise the degraded
//! paths (unavailable backend, rejected uploads, a table without `paid_at`).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use boletos_core::{
    AttachmentPatch, Customer, CustomerId, Invoice, InvoiceId, InvoiceUpdate, NewCustomer,
    NewInvoice, Settlement,
};
use tokio::sync::RwLock;

use super::{Backend, BackendError};

/// An object stored by [`InMemoryBackend::upload_object`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    invoices: BTreeMap<InvoiceId, Invoice>,
    objects: BTreeMap<String, StoredObject>,
    next_customer_id: i64,
    next_invoice_id: i64,
}

#[derive(Debug, Default)]
struct Switches {
    unavailable: AtomicBool,
    reject_uploads: AtomicBool,
    without_paid_at: AtomicBool,
}

/// Thread-safe in-memory tables.
///
/// # Example
///
/// ```rust,ignore
/// use boletos_admin::backend::{Backend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// let customer = backend.insert_customer(&new_customer).await?;
/// assert_eq!(backend.customers().await.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<Tables>>,
    switches: Arc<Switches>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryBackend {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tables pre-filled with rows, keeping their ids.
    #[must_use]
    pub fn with_rows(customers: Vec<Customer>, invoices: Vec<Invoice>) -> Self {
        let next_customer_id = customers.iter().map(|c| c.id.as_i64()).max().unwrap_or(0);
        let next_invoice_id = invoices.iter().map(|i| i.id.as_i64()).max().unwrap_or(0);
        let tables = Tables {
            customers: customers.into_iter().map(|c| (c.id, c)).collect(),
            invoices: invoices.into_iter().map(|i| (i.id, i)).collect(),
            objects: BTreeMap::new(),
            next_customer_id,
            next_invoice_id,
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
            ..Self::default()
        }
    }

    /// Make every call fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.switches.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make object uploads fail.
    pub fn set_reject_uploads(&self, reject: bool) {
        self.switches.reject_uploads.store(reject, Ordering::SeqCst);
    }

    /// Behave like a table with no `paid_at` column.
    pub fn set_without_paid_at(&self, without: bool) {
        self.switches.without_paid_at.store(without, Ordering::SeqCst);
    }

    /// Number of successful writes (inserts, patches, uploads).
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of the customers table, ordered by id.
    pub async fn customers(&self) -> Vec<Customer> {
        self.tables.read().await.customers.values().cloned().collect()
    }

    /// Snapshot of the invoices table, ordered by id.
    pub async fn invoices(&self) -> Vec<Invoice> {
        self.tables.read().await.invoices.values().cloned().collect()
    }

    /// One invoice by id.
    pub async fn invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.tables.read().await.invoices.get(&id).cloned()
    }

    /// Snapshot of the object store, keyed by path.
    pub async fn objects(&self) -> BTreeMap<String, StoredObject> {
        self.tables.read().await.objects.clone()
    }

    fn available(&self) -> Result<(), BackendError> {
        if self.switches.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    async fn with_invoice<F>(&self, id: InvoiceId, apply: F) -> Result<(), BackendError>
    where
        F: FnOnce(&mut Invoice) + Send,
    {
        self.available()?;
        let mut tables = self.tables.write().await;
        let invoice = tables
            .invoices
            .get_mut(&id)
            .ok_or(BackendError::MissingRow {
                table: "invoices",
                id: id.as_i64(),
            })?;
        apply(invoice);
        drop(tables);
        self.record_write();
        Ok(())
    }
}

impl Backend for InMemoryBackend {
    async fn fetch_customers(&self) -> Result<Vec<Customer>, BackendError> {
        self.available()?;
        Ok(self.customers().await)
    }

    async fn fetch_invoices(&self) -> Result<Vec<Invoice>, BackendError> {
        self.available()?;
        Ok(self.invoices().await)
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer, BackendError> {
        self.available()?;
        let mut tables = self.tables.write().await;
        tables.next_customer_id += 1;
        let row = Customer {
            id: CustomerId::new(tables.next_customer_id),
            name: customer.name.clone(),
            document: customer.document.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            created_at: Some(customer.created_at),
        };
        tables.customers.insert(row.id, row.clone());
        drop(tables);
        self.record_write();
        Ok(row)
    }

    async fn insert_invoices(&self, invoices: &[NewInvoice]) -> Result<Vec<Invoice>, BackendError> {
        self.available()?;
        let mut tables = self.tables.write().await;
        let mut rows = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            tables.next_invoice_id += 1;
            let row = Invoice {
                id: InvoiceId::new(tables.next_invoice_id),
                customer_id: Some(invoice.customer_id),
                amount: invoice.amount,
                due_date: Some(invoice.due_date),
                description: invoice.description.clone(),
                status: invoice.status,
                attachment_url: None,
                created_at: Some(invoice.created_at),
                paid_at: None,
            };
            tables.invoices.insert(row.id, row.clone());
            rows.push(row);
        }
        drop(tables);
        self.record_write();
        Ok(rows)
    }

    async fn update_invoice(&self, id: InvoiceId, update: &InvoiceUpdate) -> Result<(), BackendError> {
        let update = update.clone();
        self.with_invoice(id, move |invoice| {
            invoice.customer_id = Some(update.customer_id);
            invoice.amount = update.amount;
            invoice.due_date = Some(update.due_date);
            invoice.description = update.description;
            invoice.status = update.status;
            if let Some(url) = update.attachment_url {
                invoice.attachment_url = Some(url);
            }
        })
        .await
    }

    async fn settle_invoice(&self, id: InvoiceId, settlement: &Settlement) -> Result<(), BackendError> {
        if settlement.paid_at.is_some() && self.switches.without_paid_at.load(Ordering::SeqCst) {
            return Err(BackendError::UnknownColumn("paid_at".to_string()));
        }
        let settlement = *settlement;
        self.with_invoice(id, move |invoice| {
            invoice.status = settlement.status;
            if let Some(paid_at) = settlement.paid_at {
                invoice.paid_at = Some(paid_at);
            }
        })
        .await
    }

    async fn attach(&self, id: InvoiceId, patch: &AttachmentPatch) -> Result<(), BackendError> {
        let url = patch.attachment_url.clone();
        self.with_invoice(id, move |invoice| invoice.attachment_url = Some(url))
            .await
    }

    async fn upload_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        self.available()?;
        if self.switches.reject_uploads.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 400,
                body: "upload rejected".to_string(),
            });
        }
        self.tables.write().await.objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        self.record_write();
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://boletos/{path}")
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.available()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boletos_core::InvoiceStatus;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn new_invoice(customer: i64) -> NewInvoice {
        NewInvoice {
            customer_id: CustomerId::new(customer),
            amount: Decimal::ONE_HUNDRED,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            description: None,
            status: InvoiceStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let backend = InMemoryBackend::new();
        let rows = backend
            .insert_invoices(&[new_invoice(1), new_invoice(1)])
            .await
            .unwrap();
        assert_eq!(rows[0].id, InvoiceId::new(1));
        assert_eq!(rows[1].id, InvoiceId::new(2));
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_patch_missing_row_fails() {
        let backend = InMemoryBackend::new();
        let err = backend
            .attach(
                InvoiceId::new(9),
                &AttachmentPatch {
                    attachment_url: "x".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingRow { id: 9, .. }));
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_without_paid_at_rejects_full_settlement_only() {
        let backend = InMemoryBackend::new();
        let rows = backend.insert_invoices(&[new_invoice(1)]).await.unwrap();
        backend.set_without_paid_at(true);

        let full = Settlement::new(InvoiceStatus::Paid, Utc::now());
        assert!(backend.settle_invoice(rows[0].id, &full).await.is_err());
        backend
            .settle_invoice(rows[0].id, &full.status_only())
            .await
            .unwrap();

        let stored = backend.invoice(rows[0].id).await.unwrap();
        assert!(stored.is_paid());
        assert!(stored.paid_at.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_fails_reads() {
        let backend = InMemoryBackend::new();
        backend.set_unavailable(true);
        assert!(backend.fetch_customers().await.is_err());
        assert!(backend.ping().await.is_err());
    }
}
