//! Attachment files (boleto PDFs and receipt images).
//!
//! Files live in the object store under
//! `{invoice_id}/{kind}_{uploaded_at}_{file_name}`. The invoice row keeps
//! only the public URL.

use boletos_core::InvoiceId;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use crate::backend::{Backend, BackendError};

/// Largest accepted attachment.
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Extensions accepted by the upload fields, with their content types.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
];

/// Why an uploaded file was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("Only PDF, PNG and JPEG files are accepted (got '{0}').")]
    UnsupportedType(String),
    #[error("File is larger than {} MB.", MAX_ATTACHMENT_BYTES / (1024 * 1024))]
    TooLarge,
    #[error("File is empty.")]
    Empty,
}

/// A validated file ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Validate an uploaded file by extension and size.
    ///
    /// The content type is taken from the extension, not from the browser.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentError` for empty, oversized or non PDF/PNG/JPEG files.
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Result<Self, AttachmentError> {
        let file_name = sanitize_file_name(file_name);
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        let content_type = ALLOWED_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, content_type)| *content_type)
            .ok_or_else(|| AttachmentError::UnsupportedType(file_name.clone()))?;

        if bytes.is_empty() {
            return Err(AttachmentError::Empty);
        }
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge);
        }

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

/// Role of an attachment, used as the object name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// One file shared by every invoice of an issuance.
    Global,
    /// File for a single installment.
    Installment,
    /// File that replaces an invoice's attachment when editing.
    Replacement,
}

impl AttachmentKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Installment => "installment",
            Self::Replacement => "replacement",
        }
    }
}

/// Keep the last path component and replace characters outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Object path for an attachment.
#[must_use]
pub fn object_path(
    invoice_id: InvoiceId,
    kind: AttachmentKind,
    uploaded_at: DateTime<Utc>,
    file_name: &str,
) -> String {
    format!(
        "{invoice_id}/{}_{}_{file_name}",
        kind.prefix(),
        uploaded_at.format("%Y-%m-%dT%H-%M-%S%.6f")
    )
}

/// Upload an attachment under `invoice_id` and return its public URL.
///
/// # Errors
///
/// Returns `BackendError` if the object store rejects the upload.
#[instrument(skip(backend, attachment), fields(file_name = %attachment.file_name))]
pub async fn upload_attachment<B: Backend>(
    backend: &B,
    invoice_id: InvoiceId,
    kind: AttachmentKind,
    attachment: &Attachment,
    uploaded_at: DateTime<Utc>,
) -> Result<String, BackendError> {
    let path = object_path(invoice_id, kind, uploaded_at, &attachment.file_name);
    backend
        .upload_object(&path, attachment.bytes.clone(), attachment.content_type)
        .await?;
    tracing::info!(path = %path, "Attachment uploaded");
    Ok(backend.public_url(&path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_attachment_content_type_from_extension() {
        let attachment = Attachment::new("Boleto Março.PDF", vec![1, 2, 3]).unwrap();
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.file_name, "Boleto_Mar_o.PDF");

        let image = Attachment::new("receipt.jpeg", vec![1]).unwrap();
        assert_eq!(image.content_type, "image/jpeg");
    }

    #[test]
    fn test_attachment_rejects_other_types() {
        assert_eq!(
            Attachment::new("notes.txt", vec![1]),
            Err(AttachmentError::UnsupportedType("notes.txt".to_string()))
        );
        assert_eq!(
            Attachment::new("noext", vec![1]).unwrap_err().to_string(),
            "Only PDF, PNG and JPEG files are accepted (got 'noext')."
        );
    }

    #[test]
    fn test_attachment_size_limits() {
        assert_eq!(Attachment::new("a.pdf", vec![]), Err(AttachmentError::Empty));
        assert_eq!(
            Attachment::new("a.pdf", vec![0; MAX_ATTACHMENT_BYTES + 1]),
            Err(AttachmentError::TooLarge)
        );
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("C:\\Users\\ana\\boleto.pdf"), "boleto.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("   "), "file");
    }

    proptest! {
        #[test]
        fn prop_sanitized_names_are_single_safe_components(raw in "\\PC{0,40}") {
            let name = sanitize_file_name(&raw);
            prop_assert!(!name.is_empty());
            prop_assert!(
                name.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            );
        }
    }

    #[test]
    fn test_object_path_layout() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 10, 20, 30).unwrap();
        assert_eq!(
            object_path(InvoiceId::new(42), AttachmentKind::Global, at, "boleto.pdf"),
            "42/global_2025-03-04T10-20-30.000000_boleto.pdf"
        );
        assert!(
            object_path(InvoiceId::new(1), AttachmentKind::Replacement, at, "x.png")
                .starts_with("1/replacement_")
        );
    }
}
