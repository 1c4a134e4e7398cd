//! Invoice writes: issuing, editing and settling.
//!
//! Issuance is a two-phase write. All rows go in with one batch insert,
//! then attachments are uploaded and linked one invoice at a time. A
//! failure in the second phase does not undo the first; it is reported in
//! [`IssueOutcome::missing_attachments`] instead.

use boletos_core::{
    AttachmentPatch, CustomerId, HolidayCalendar, InstallmentPlan, Invoice, InvoiceId,
    InvoiceStatus, InvoiceUpdate, Settlement, ValidationErrors, build_invoices,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use super::ServiceError;
use super::attachments::{Attachment, AttachmentKind, upload_attachment};
use crate::backend::Backend;

// =============================================================================
// Issue
// =============================================================================

/// A validated issuance form.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub customer_id: CustomerId,
    pub description: Option<String>,
    pub plan: InstallmentPlan,
    /// Shared by every created invoice, stored once under the first id.
    pub global_attachment: Option<Attachment>,
    /// Per-installment files by position; these win over the global one.
    pub installment_attachments: Vec<Option<Attachment>>,
}

/// Result of a successful batch insert.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    /// Created rows, with `attachment_url` set where linking succeeded.
    pub invoices: Vec<Invoice>,
    pub plan_total: Decimal,
    pub parceled: bool,
    /// Invoices that should have an attachment but were left without one.
    pub missing_attachments: Vec<InvoiceId>,
    pub warnings: Vec<String>,
}

impl IssueOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_attachments.is_empty()
    }
}

/// Insert every invoice of `request.plan`, then upload and link attachments.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` if the plan fails validation and
/// `ServiceError::Backend` if the batch insert is rejected. Nothing is
/// written in either case. Attachment failures after the insert are not
/// errors.
#[instrument(
    skip(backend, request, calendar),
    fields(customer_id = %request.customer_id, installments = request.plan.len())
)]
pub async fn issue_invoices<B: Backend>(
    backend: &B,
    request: &IssueRequest,
    calendar: &HolidayCalendar,
    now: DateTime<Utc>,
) -> Result<IssueOutcome, ServiceError> {
    let rows = build_invoices(
        request.customer_id,
        request.description.as_deref(),
        &request.plan,
        calendar,
        now,
    )?;
    let plan_total: Decimal = rows.iter().map(|row| row.amount).sum();

    let mut invoices = backend.insert_invoices(&rows).await?;
    tracing::info!(count = invoices.len(), total = %plan_total, "Invoices created");

    let mut warnings = Vec::new();
    let mut missing_attachments = Vec::new();

    let global_url = match (&request.global_attachment, invoices.first()) {
        (Some(attachment), Some(first)) => {
            match upload_attachment(backend, first.id, AttachmentKind::Global, attachment, now).await
            {
                Ok(url) => Some(url),
                Err(err) => {
                    tracing::warn!(error = %err, invoice_id = %first.id, "Global attachment upload failed");
                    warnings.push(format!("Could not upload the shared attachment: {err}"));
                    None
                }
            }
        }
        _ => None,
    };

    for (index, invoice) in invoices.iter_mut().enumerate() {
        let own = request
            .installment_attachments
            .get(index)
            .and_then(Option::as_ref);
        let wanted = own.is_some() || request.global_attachment.is_some();

        let url = match own {
            Some(attachment) => {
                match upload_attachment(backend, invoice.id, AttachmentKind::Installment, attachment, now)
                    .await
                {
                    Ok(url) => Some(url),
                    Err(err) => {
                        tracing::warn!(error = %err, invoice_id = %invoice.id, "Installment attachment upload failed");
                        warnings.push(format!(
                            "Could not upload the attachment of invoice {}: {err}",
                            invoice.id
                        ));
                        None
                    }
                }
            }
            None => global_url.clone(),
        };

        let Some(url) = url else {
            if wanted {
                missing_attachments.push(invoice.id);
            }
            continue;
        };

        let patch = AttachmentPatch {
            attachment_url: url.clone(),
        };
        match backend.attach(invoice.id, &patch).await {
            Ok(()) => invoice.attachment_url = Some(url),
            Err(err) => {
                tracing::warn!(error = %err, invoice_id = %invoice.id, "Attachment link failed");
                warnings.push(format!(
                    "Could not link the attachment to invoice {}: {err}",
                    invoice.id
                ));
                missing_attachments.push(invoice.id);
            }
        }
    }

    Ok(IssueOutcome {
        invoices,
        plan_total,
        parceled: request.plan.is_parceled(),
        missing_attachments,
        warnings,
    })
}

// =============================================================================
// Edit
// =============================================================================

/// A submitted edit form.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub description: Option<String>,
    /// Replacement file; `None` keeps the stored URL.
    pub attachment: Option<Attachment>,
}

/// Overwrite an invoice's editable columns.
///
/// A replacement file is uploaded first; its URL is written with the rest
/// of the update. Returns the payload that was written.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` for a non-positive amount, or
/// `ServiceError::Backend` if the upload or the update is rejected.
#[instrument(skip(backend, request), fields(invoice_id = %id))]
pub async fn edit_invoice<B: Backend>(
    backend: &B,
    id: InvoiceId,
    request: &EditRequest,
    now: DateTime<Utc>,
) -> Result<InvoiceUpdate, ServiceError> {
    if request.amount <= Decimal::ZERO {
        return Err(ValidationErrors::single("amount", "Amount must be greater than zero.").into());
    }

    let attachment_url = match &request.attachment {
        Some(attachment) => {
            Some(upload_attachment(backend, id, AttachmentKind::Replacement, attachment, now).await?)
        }
        None => None,
    };

    let update = InvoiceUpdate {
        customer_id: request.customer_id,
        amount: request.amount,
        due_date: request.due_date,
        description: request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        status: request.status,
        attachment_url,
    };

    backend.update_invoice(id, &update).await?;
    tracing::info!(status = %update.status, "Invoice updated");
    Ok(update)
}

// =============================================================================
// Settle
// =============================================================================

/// What a settlement actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleOutcome {
    pub invoice_id: InvoiceId,
    pub status: InvoiceStatus,
    /// `false` when only the status could be stored.
    pub paid_at_recorded: bool,
}

/// Move a pending invoice to paid or written-off with `paid_at = now`.
///
/// When the full write is rejected and `status_only_fallback` is set, the
/// write is retried without `paid_at` and the first error is logged.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` if the invoice is not pending or the
/// target status is `pending`, and `ServiceError::Backend` if the write
/// (and the fallback, when enabled) is rejected.
#[instrument(skip(backend, invoice), fields(invoice_id = %invoice.id))]
pub async fn settle_invoice<B: Backend>(
    backend: &B,
    invoice: &Invoice,
    status: InvoiceStatus,
    now: DateTime<Utc>,
    status_only_fallback: bool,
) -> Result<SettleOutcome, ServiceError> {
    if !invoice.is_pending() {
        return Err(
            ValidationErrors::single("invoice_id", "Only pending invoices can be settled.").into(),
        );
    }
    if status == InvoiceStatus::Pending {
        return Err(ValidationErrors::single("status", "Choose paid or written off.").into());
    }

    let settlement = Settlement::new(status, now);
    let paid_at_recorded = match backend.settle_invoice(invoice.id, &settlement).await {
        Ok(()) => true,
        Err(err) if status_only_fallback => {
            tracing::warn!(
                error = %err,
                "Settlement with paid_at rejected, retrying with status only"
            );
            backend
                .settle_invoice(invoice.id, &settlement.status_only())
                .await?;
            false
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(status = %status, paid_at_recorded, "Invoice settled");
    Ok(SettleOutcome {
        invoice_id: invoice.id,
        status,
        paid_at_recorded,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use boletos_core::{Interval, ManualInstallment};
    use chrono::TimeZone;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    fn pdf(name: &str) -> Attachment {
        Attachment::new(name, b"%PDF-1.4".to_vec()).unwrap()
    }

    fn auto_request(count: u32) -> IssueRequest {
        IssueRequest {
            customer_id: CustomerId::new(1),
            description: Some("Rent".to_string()),
            plan: InstallmentPlan::Auto {
                count,
                amount: d("100"),
                first_due: date(2025, 1, 6),
                interval: Interval::Monthly,
                skip_non_business_days: false,
            },
            global_attachment: None,
            installment_attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_issue_auto_plan() {
        let backend = InMemoryBackend::new();
        let outcome = issue_invoices(&backend, &auto_request(3), &HolidayCalendar::none(), now())
            .await
            .unwrap();

        assert_eq!(outcome.invoices.len(), 3);
        assert_eq!(outcome.plan_total, d("300"));
        assert!(outcome.parceled);
        assert!(outcome.is_complete());

        let stored = backend.invoices().await;
        let dues: Vec<_> = stored.iter().filter_map(|i| i.due_date).collect();
        assert_eq!(dues, vec![date(2025, 1, 6), date(2025, 2, 6), date(2025, 3, 6)]);
        assert!(stored.iter().all(Invoice::is_pending));
        assert_eq!(
            stored[2].description.as_deref(),
            Some("Rent (Installment 3/3)")
        );
    }

    #[tokio::test]
    async fn test_issue_invalid_plan_writes_nothing() {
        let backend = InMemoryBackend::new();
        let request = IssueRequest {
            plan: InstallmentPlan::Manual(vec![
                ManualInstallment {
                    amount: d("50"),
                    due_date: date(2025, 2, 1),
                },
                ManualInstallment {
                    amount: d("0"),
                    due_date: date(2025, 3, 1),
                },
            ]),
            ..auto_request(2)
        };

        let err = issue_invoices(&backend, &request, &HolidayCalendar::none(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(ref e) if e.message_for("amount_2").is_some()));
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_global_attachment_shared_and_installment_wins() {
        let backend = InMemoryBackend::new();
        let request = IssueRequest {
            global_attachment: Some(pdf("carne.pdf")),
            installment_attachments: vec![None, Some(pdf("second.pdf"))],
            ..auto_request(3)
        };

        let outcome = issue_invoices(&backend, &request, &HolidayCalendar::none(), now())
            .await
            .unwrap();
        assert!(outcome.is_complete());

        let first_id = outcome.invoices[0].id;
        let urls: Vec<_> = backend
            .invoices()
            .await
            .into_iter()
            .map(|i| i.attachment_url.unwrap())
            .collect();
        assert_eq!(urls[0], urls[2]);
        assert!(urls[0].contains(&format!("{first_id}/global_")));
        assert!(urls[1].ends_with("_second.pdf"));
        assert!(urls[1].contains("/installment_"));
        assert_eq!(backend.objects().await.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_invoices() {
        let backend = InMemoryBackend::new();
        backend.set_reject_uploads(true);
        let request = IssueRequest {
            global_attachment: Some(pdf("carne.pdf")),
            ..auto_request(2)
        };

        let outcome = issue_invoices(&backend, &request, &HolidayCalendar::none(), now())
            .await
            .unwrap();
        assert_eq!(backend.invoices().await.len(), 2);
        assert_eq!(outcome.missing_attachments.len(), 2);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.invoices.iter().all(|i| i.attachment_url.is_none()));
    }

    fn edit_request(attachment: Option<Attachment>) -> EditRequest {
        EditRequest {
            customer_id: CustomerId::new(1),
            amount: d("250.75"),
            due_date: date(2025, 4, 1),
            status: InvoiceStatus::Pending,
            description: Some("  ".to_string()),
            attachment,
        }
    }

    async fn seeded_with_attachment() -> (InMemoryBackend, InvoiceId) {
        let backend = InMemoryBackend::new();
        let request = IssueRequest {
            plan: InstallmentPlan::Single {
                amount: d("100"),
                due_date: date(2025, 3, 1),
            },
            global_attachment: Some(pdf("old.pdf")),
            ..auto_request(1)
        };
        let outcome = issue_invoices(&backend, &request, &HolidayCalendar::none(), now())
            .await
            .unwrap();
        (backend, outcome.invoices[0].id)
    }

    #[tokio::test]
    async fn test_edit_keeps_attachment_without_file() {
        let (backend, id) = seeded_with_attachment().await;
        let before = backend.invoice(id).await.unwrap().attachment_url;

        edit_invoice(&backend, id, &edit_request(None), now()).await.unwrap();

        let after = backend.invoice(id).await.unwrap();
        assert_eq!(after.amount, d("250.75"));
        assert_eq!(after.due_date, Some(date(2025, 4, 1)));
        assert_eq!(after.description, None);
        assert_eq!(after.attachment_url, before);
    }

    #[tokio::test]
    async fn test_edit_replaces_attachment_with_file() {
        let (backend, id) = seeded_with_attachment().await;

        edit_invoice(&backend, id, &edit_request(Some(pdf("new.pdf"))), now())
            .await
            .unwrap();

        let url = backend.invoice(id).await.unwrap().attachment_url.unwrap();
        assert!(url.contains("/replacement_"));
        assert!(url.ends_with("_new.pdf"));
    }

    #[tokio::test]
    async fn test_edit_rejects_non_positive_amount() {
        let (backend, id) = seeded_with_attachment().await;
        let writes = backend.write_count();
        let request = EditRequest {
            amount: d("-1"),
            ..edit_request(None)
        };

        let err = edit_invoice(&backend, id, &request, now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
        assert_eq!(backend.write_count(), writes);
    }

    async fn seeded_pending() -> (InMemoryBackend, Invoice) {
        let backend = InMemoryBackend::new();
        let outcome = issue_invoices(&backend, &auto_request(2), &HolidayCalendar::none(), now())
            .await
            .unwrap();
        let invoice = outcome.invoices[0].clone();
        (backend, invoice)
    }

    #[tokio::test]
    async fn test_settle_sets_paid_at() {
        let (backend, invoice) = seeded_pending().await;

        let outcome = settle_invoice(&backend, &invoice, InvoiceStatus::Paid, now(), true)
            .await
            .unwrap();
        assert!(outcome.paid_at_recorded);

        let stored = backend.invoice(invoice.id).await.unwrap();
        assert!(stored.is_paid());
        assert_eq!(stored.paid_at, Some(now()));
    }

    #[tokio::test]
    async fn test_settle_falls_back_to_status_only() {
        let (backend, invoice) = seeded_pending().await;
        backend.set_without_paid_at(true);

        let outcome = settle_invoice(&backend, &invoice, InvoiceStatus::WrittenOff, now(), true)
            .await
            .unwrap();
        assert!(!outcome.paid_at_recorded);

        let stored = backend.invoice(invoice.id).await.unwrap();
        assert_eq!(stored.status, InvoiceStatus::WrittenOff);
        assert_eq!(stored.paid_at, None);
    }

    #[tokio::test]
    async fn test_settle_without_fallback_surfaces_error() {
        let (backend, invoice) = seeded_pending().await;
        backend.set_without_paid_at(true);

        let err = settle_invoice(&backend, &invoice, InvoiceStatus::Paid, now(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Backend(_)));
        assert!(backend.invoice(invoice.id).await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_settle_rejects_non_pending() {
        let (backend, mut invoice) = seeded_pending().await;
        invoice.status = InvoiceStatus::Paid;

        let err = settle_invoice(&backend, &invoice, InvoiceStatus::Paid, now(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(ref e) if e.message_for("invoice_id").is_some()));

        invoice.status = InvoiceStatus::Pending;
        let err = settle_invoice(&backend, &invoice, InvoiceStatus::Pending, now(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(ref e) if e.message_for("status").is_some()));
    }
}
