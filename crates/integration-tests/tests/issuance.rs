//! Invoice issuance through the admin router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use boletos_admin::backend::InMemoryBackend;
use boletos_core::InvoiceStatus;
use boletos_integration_tests::{MultipartBody, TestApp, customer};
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn app_with_customer() -> TestApp {
    TestApp::new(InMemoryBackend::with_rows(
        vec![customer(1, "Ana")],
        Vec::new(),
    ))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_issue_form_renders() {
    let app = app_with_customer();

    let resp = app.get("/invoices/new?mode=manual&count=3").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Issue invoices"));
    assert!(resp.body.contains("name=\"amount_3\""));
    assert!(!resp.body.contains("name=\"amount_4\""));
}

#[tokio::test]
async fn test_issue_form_warns_without_customers() {
    let app = TestApp::new(InMemoryBackend::new());

    let resp = app.get("/invoices/new").await;
    assert!(resp.body.contains("Register a customer before issuing invoices."));
}

#[tokio::test]
async fn test_issue_single_invoice() {
    let app = app_with_customer();

    let form = MultipartBody::new()
        .text("customer_id", "1")
        .text("mode", "single")
        .text("amount", "1.234,56")
        .text("due_date", "15/03/2025")
        .text("description", "Consulting")
        .file("attachment", "", b"");
    let resp = app.post_multipart("/invoices/new", form).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Invoice issued"));

    let invoices = app.backend.invoices().await;
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].amount, "1234.56".parse::<Decimal>().unwrap());
    assert_eq!(invoices[0].due_date, Some(date(2025, 3, 15)));
    assert_eq!(invoices[0].description.as_deref(), Some("Consulting"));
    assert_eq!(invoices[0].status, InvoiceStatus::Pending);
    assert_eq!(invoices[0].attachment_url, None);
}

#[tokio::test]
async fn test_issue_auto_installments_share_global_attachment() {
    let app = app_with_customer();

    let form = MultipartBody::new()
        .text("customer_id", "1")
        .text("mode", "auto")
        .text("count", "3")
        .text("amount", "100")
        .text("first_due", "2025-01-31")
        .text("interval", "monthly")
        .text("description", "Rent")
        .file("attachment", "boleto.pdf", b"%PDF-1.4");
    let resp = app.post_multipart("/invoices/new", form).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Installments issued"));
    assert!(resp.body.contains("R$ 300,00"));

    let invoices = app.backend.invoices().await;
    let dues: Vec<_> = invoices.iter().map(|i| i.due_date.unwrap()).collect();
    assert_eq!(
        dues,
        vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]
    );
    assert_eq!(
        invoices[1].description.as_deref(),
        Some("Rent (Installment 2/3)")
    );

    let url = invoices[0].attachment_url.clone().unwrap();
    assert!(invoices.iter().all(|i| i.attachment_url.as_ref() == Some(&url)));
    assert_eq!(app.backend.objects().await.len(), 1);
}

#[tokio::test]
async fn test_issue_manual_row_attachment_wins() {
    let app = app_with_customer();

    let form = MultipartBody::new()
        .text("customer_id", "1")
        .text("mode", "manual")
        .text("count", "2")
        .text("amount_1", "100")
        .text("due_date_1", "10/02/2025")
        .file("attachment_1", "first.pdf", b"one")
        .text("amount_2", "200,50")
        .text("due_date_2", "2025-03-10")
        .file("attachment_2", "", b"")
        .file("attachment", "global.png", b"img");
    let resp = app.post_multipart("/invoices/new", form).await;
    assert_eq!(resp.status, StatusCode::OK);

    let invoices = app.backend.invoices().await;
    assert_eq!(invoices.len(), 2);
    assert_eq!(invoices[1].amount, "200.50".parse::<Decimal>().unwrap());

    let first = invoices[0].attachment_url.clone().unwrap();
    let second = invoices[1].attachment_url.clone().unwrap();
    assert_ne!(first, second);
    assert!(first.ends_with("first.pdf"));
    assert!(second.ends_with("global.png"));
}

#[tokio::test]
async fn test_invalid_plan_writes_nothing() {
    let app = app_with_customer();

    let form = MultipartBody::new()
        .text("customer_id", "1")
        .text("mode", "auto")
        .text("count", "1")
        .text("amount", "100")
        .text("first_due", "2025-01-31");
    let resp = app.post_multipart("/invoices/new", form).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Installment count must be between"));
    assert_eq!(app.backend.write_count(), 0);
}

#[tokio::test]
async fn test_unknown_customer_is_rejected() {
    let app = app_with_customer();

    let form = MultipartBody::new()
        .text("customer_id", "42")
        .text("mode", "single")
        .text("amount", "10")
        .text("due_date", "2025-03-15");
    let resp = app.post_multipart("/invoices/new", form).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Unknown customer."));
    assert_eq!(app.backend.write_count(), 0);
}

#[tokio::test]
async fn test_issue_without_customers_is_rejected() {
    let app = TestApp::new(InMemoryBackend::new());

    let form = MultipartBody::new()
        .text("customer_id", "42")
        .text("mode", "single")
        .text("amount", "10")
        .text("due_date", "2025-03-15");
    let resp = app.post_multipart("/invoices/new", form).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Register a customer before issuing invoices."));
    assert_eq!(app.backend.write_count(), 0);
    assert!(app.backend.invoices().await.is_empty());
}

#[tokio::test]
async fn test_rejected_upload_keeps_invoices() {
    let app = app_with_customer();
    app.backend.set_reject_uploads(true);

    let form = MultipartBody::new()
        .text("customer_id", "1")
        .text("mode", "auto")
        .text("count", "2")
        .text("amount", "50")
        .text("first_due", "2025-05-05")
        .file("attachment", "boleto.pdf", b"%PDF");
    let resp = app.post_multipart("/invoices/new", form).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Invoices without attachment: 1, 2."));
    let invoices = app.backend.invoices().await;
    assert_eq!(invoices.len(), 2);
    assert!(invoices.iter().all(|i| i.attachment_url.is_none()));
}
