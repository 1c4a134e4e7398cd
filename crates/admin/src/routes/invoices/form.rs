//! Multipart form reading and parsing for the invoice pages.
//!
//! Browsers send every input of a multipart form, including empty file
//! inputs. A file field with an empty file name is treated as absent.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use boletos_core::issuance::{MAX_INSTALLMENTS, MIN_INSTALLMENTS};
use boletos_core::types::customer::non_empty;
use boletos_core::{
    CustomerId, InstallmentPlan, Interval, InvoiceStatus, ManualInstallment, ValidationErrors,
    parse_amount,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::services::{Attachment, EditRequest, IssueRequest};

/// A file part of a multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields and files of one multipart submission.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Drain a multipart body into memory.
    ///
    /// # Errors
    ///
    /// Returns `MultipartError` if the body is malformed or over the limit.
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if !file_name.is_empty() {
                        form.files.insert(
                            name,
                            UploadedFile {
                                file_name,
                                bytes: bytes.to_vec(),
                            },
                        );
                    }
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// Build a form from already-split parts.
    pub fn from_parts(
        fields: impl IntoIterator<Item = (String, String)>,
        files: impl IntoIterator<Item = (String, UploadedFile)>,
    ) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            files: files.into_iter().collect(),
        }
    }

    /// Value of a text field, empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// Text fields, for re-rendering a rejected form.
    pub fn into_values(self) -> HashMap<String, String> {
        self.fields
    }
}

/// Layout of an issuance form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueMode {
    #[default]
    Single,
    Auto,
    Manual,
}

impl IssueMode {
    pub const ALL: [Self; 3] = [Self::Single, Self::Auto, Self::Manual];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "Single invoice",
            Self::Auto => "Installments (automatic)",
            Self::Manual => "Installments (manual)",
        }
    }
}

impl FromStr for IssueMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single" => Ok(Self::Single),
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown issue mode: {other}")),
        }
    }
}

/// Parse a date typed as `YYYY-MM-DD` (date inputs) or `dd/mm/yyyy`.
pub fn parse_form_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

/// Whether `count` is an accepted installment count.
pub fn installment_count_in_range(count: usize) -> bool {
    (MIN_INSTALLMENTS as usize..=MAX_INSTALLMENTS as usize).contains(&count)
}

fn is_checked(form: &MultipartForm, name: &str) -> bool {
    matches!(form.text(name).trim(), "on" | "true" | "1")
}

fn amount_field(errors: &mut ValidationErrors, form: &MultipartForm, name: &str) -> Decimal {
    match parse_amount(form.text(name)) {
        Ok(amount) => amount,
        Err(e) => {
            errors.push(name, format!("Enter a valid amount ({e})."));
            Decimal::ZERO
        }
    }
}

fn date_field(errors: &mut ValidationErrors, form: &MultipartForm, name: &str) -> NaiveDate {
    parse_form_date(form.text(name)).unwrap_or_else(|| {
        errors.push(name, "Enter a date as dd/mm/yyyy.");
        NaiveDate::MIN
    })
}

fn attachment_field(
    errors: &mut ValidationErrors,
    form: &MultipartForm,
    name: &str,
) -> Option<Attachment> {
    let file = form.file(name)?;
    match Attachment::new(&file.file_name, file.bytes.clone()) {
        Ok(attachment) => Some(attachment),
        Err(e) => {
            errors.push(name, e.to_string());
            None
        }
    }
}

fn customer_field(errors: &mut ValidationErrors, form: &MultipartForm) -> CustomerId {
    form.text("customer_id").parse().unwrap_or_else(|_| {
        errors.push("customer_id", "Choose a customer.");
        CustomerId::new(0)
    })
}

fn count_field(errors: &mut ValidationErrors, form: &MultipartForm) -> usize {
    match form.text("count").trim().parse::<usize>() {
        Ok(count) if installment_count_in_range(count) => count,
        _ => {
            errors.push(
                "count",
                format!(
                    "Installment count must be between {MIN_INSTALLMENTS} and {MAX_INSTALLMENTS}."
                ),
            );
            0
        }
    }
}

/// Parse an issuance submission.
///
/// Amounts are only checked for syntax here; positivity and installment
/// counts are checked again when the rows are built.
///
/// # Errors
///
/// Returns every field that could not be read.
pub fn parse_issue_form(form: &MultipartForm) -> Result<IssueRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let customer_id = customer_field(&mut errors, form);
    let mode = form.text("mode").parse::<IssueMode>().unwrap_or_default();
    let mut installment_attachments = Vec::new();

    let plan = match mode {
        IssueMode::Single => InstallmentPlan::Single {
            amount: amount_field(&mut errors, form, "amount"),
            due_date: date_field(&mut errors, form, "due_date"),
        },
        IssueMode::Auto => {
            let count = count_field(&mut errors, form);
            let interval = if form.text("interval") == "days" {
                match form.text("interval_days").trim().parse::<u32>() {
                    Ok(days) if days > 0 => Interval::EveryDays(days),
                    _ => {
                        errors.push("interval_days", "Interval must be at least one day.");
                        Interval::EveryDays(1)
                    }
                }
            } else {
                Interval::Monthly
            };
            InstallmentPlan::Auto {
                count: u32::try_from(count).unwrap_or(0),
                amount: amount_field(&mut errors, form, "amount"),
                first_due: date_field(&mut errors, form, "first_due"),
                interval,
                skip_non_business_days: is_checked(form, "skip_non_business_days"),
            }
        }
        IssueMode::Manual => {
            let count = count_field(&mut errors, form);
            let rows = (1..=count)
                .map(|i| {
                    installment_attachments.push(attachment_field(
                        &mut errors,
                        form,
                        &format!("attachment_{i}"),
                    ));
                    ManualInstallment {
                        amount: amount_field(&mut errors, form, &format!("amount_{i}")),
                        due_date: date_field(&mut errors, form, &format!("due_date_{i}")),
                    }
                })
                .collect();
            InstallmentPlan::Manual(rows)
        }
    };

    let global_attachment = attachment_field(&mut errors, form, "attachment");

    errors.into_result(IssueRequest {
        customer_id,
        description: non_empty(form.text("description")),
        plan,
        global_attachment,
        installment_attachments,
    })
}

/// Parse an edit submission.
///
/// # Errors
///
/// Returns every field that could not be read, including a non-positive
/// amount.
pub fn parse_edit_form(form: &MultipartForm) -> Result<EditRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let customer_id = customer_field(&mut errors, form);
    let amount = amount_field(&mut errors, form, "amount");
    if amount <= Decimal::ZERO && errors.message_for("amount").is_none() {
        errors.push("amount", "Amount must be greater than zero.");
    }
    let due_date = date_field(&mut errors, form, "due_date");
    let status = form.text("status").parse::<InvoiceStatus>().unwrap_or_else(|_| {
        errors.push("status", "Choose a status.");
        InvoiceStatus::Pending
    });
    let attachment = attachment_field(&mut errors, form, "attachment");

    errors.into_result(EditRequest {
        customer_id,
        amount,
        due_date,
        status,
        description: non_empty(form.text("description")),
        attachment,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> MultipartForm {
        MultipartForm::from_parts(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
            Vec::<(String, UploadedFile)>::new(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_form_date_formats() {
        assert_eq!(parse_form_date("2025-03-01"), Some(date(2025, 3, 1)));
        assert_eq!(parse_form_date(" 01/03/2025 "), Some(date(2025, 3, 1)));
        assert_eq!(parse_form_date("31/02/2025"), None);
        assert_eq!(parse_form_date(""), None);
    }

    #[test]
    fn test_parse_single() {
        let request = parse_issue_form(&form(&[
            ("customer_id", "4"),
            ("mode", "single"),
            ("amount", "1.234,50"),
            ("due_date", "2025-03-10"),
            ("description", "  "),
        ]))
        .unwrap();

        assert_eq!(request.customer_id, CustomerId::new(4));
        assert_eq!(request.description, None);
        assert_eq!(
            request.plan,
            InstallmentPlan::Single {
                amount: "1234.50".parse().unwrap(),
                due_date: date(2025, 3, 10),
            }
        );
        assert!(request.global_attachment.is_none());
    }

    #[test]
    fn test_parse_auto_every_days() {
        let request = parse_issue_form(&form(&[
            ("customer_id", "1"),
            ("mode", "auto"),
            ("count", "4"),
            ("amount", "99.90"),
            ("first_due", "2025-01-06"),
            ("interval", "days"),
            ("interval_days", "15"),
            ("skip_non_business_days", "on"),
        ]))
        .unwrap();

        match request.plan {
            InstallmentPlan::Auto {
                count,
                interval,
                skip_non_business_days,
                ..
            } => {
                assert_eq!(count, 4);
                assert_eq!(interval, Interval::EveryDays(15));
                assert!(skip_non_business_days);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn test_parse_manual_collects_row_errors() {
        let errors = parse_issue_form(&form(&[
            ("customer_id", "1"),
            ("mode", "manual"),
            ("count", "2"),
            ("amount_1", "10"),
            ("due_date_1", "2025-01-06"),
            ("amount_2", "abc"),
            ("due_date_2", ""),
        ]))
        .unwrap_err();

        assert!(errors.message_for("amount_1").is_none());
        assert!(errors.message_for("amount_2").is_some());
        assert!(errors.message_for("due_date_2").is_some());
    }

    #[test]
    fn test_parse_manual_rejects_count_out_of_range() {
        let errors = parse_issue_form(&form(&[
            ("customer_id", "1"),
            ("mode", "manual"),
            ("count", "500"),
        ]))
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.message_for("count").is_some());
    }

    #[test]
    fn test_parse_missing_customer() {
        let errors = parse_issue_form(&form(&[
            ("mode", "single"),
            ("amount", "10"),
            ("due_date", "2025-01-06"),
        ]))
        .unwrap_err();
        assert_eq!(errors.message_for("customer_id"), Some("Choose a customer."));
    }

    #[test]
    fn test_parse_installment_attachment() {
        let file = UploadedFile {
            file_name: "p2.png".to_string(),
            bytes: vec![1, 2, 3],
        };
        let form = MultipartForm::from_parts(
            [
                ("customer_id", "1"),
                ("mode", "manual"),
                ("count", "2"),
                ("amount_1", "10"),
                ("due_date_1", "2025-01-06"),
                ("amount_2", "20"),
                ("due_date_2", "2025-02-06"),
            ]
            .map(|(k, v)| (k.to_string(), v.to_string())),
            [("attachment_2".to_string(), file)],
        );

        let request = parse_issue_form(&form).unwrap();
        assert_eq!(request.installment_attachments.len(), 2);
        assert!(request.installment_attachments[0].is_none());
        assert_eq!(
            request.installment_attachments[1].as_ref().unwrap().content_type,
            "image/png"
        );
    }

    #[test]
    fn test_parse_edit() {
        let request = parse_edit_form(&form(&[
            ("customer_id", "2"),
            ("amount", "80"),
            ("due_date", "10/04/2025"),
            ("status", "written-off"),
            ("description", "Adjusted"),
        ]))
        .unwrap();
        assert_eq!(request.status, InvoiceStatus::WrittenOff);
        assert_eq!(request.due_date, date(2025, 4, 10));
        assert_eq!(request.description.as_deref(), Some("Adjusted"));
        assert!(request.attachment.is_none());

        let errors = parse_edit_form(&form(&[
            ("customer_id", "2"),
            ("amount", "0"),
            ("due_date", "2025-04-10"),
            ("status", "paid"),
        ]))
        .unwrap_err();
        assert_eq!(
            errors.message_for("amount"),
            Some("Amount must be greater than zero.")
        );
    }
}
