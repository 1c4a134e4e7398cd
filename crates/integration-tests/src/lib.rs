//! Integration tests for Boletos.
//!
//! The admin router is driven in-process with `tower::ServiceExt::oneshot`
//! against [`InMemoryBackend`], so no Supabase project or running server
//! is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p boletos-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use boletos_admin::backend::InMemoryBackend;
use boletos_admin::state::{AppState, Settings};
use boletos_core::{Customer, CustomerId, Invoice, InvoiceId, InvoiceStatus};
use chrono::{NaiveDate, TimeZone, Utc};
use tower::ServiceExt;

const BOUNDARY: &str = "boletos-test-boundary";
const MAX_BODY: usize = 4 * 1024 * 1024;

/// A router over an in-memory backend the test can inspect.
pub struct TestApp {
    pub backend: InMemoryBackend,
    router: Router,
}

/// Status, redirect target and body of one response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestApp {
    /// App with default settings: no holidays, status-only fallback on.
    #[must_use]
    pub fn new(backend: InMemoryBackend) -> Self {
        Self::with_settings(backend, Settings::default())
    }

    #[must_use]
    pub fn with_settings(backend: InMemoryBackend, settings: Settings) -> Self {
        let state = AppState::new(backend.clone(), settings);
        Self {
            backend,
            router: boletos_admin::app(state),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Submit an urlencoded form.
    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(name, value)| format!("{name}={}", encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Submit a multipart form.
    pub async fn post_multipart(&self, uri: &str, form: MultipartBody) -> TestResponse {
        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let bytes = to_bytes(response.into_body(), MAX_BODY).await.unwrap();
        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(content);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.bytes
    }
}

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                char::from(b).to_string()
            }
            b' ' => "+".to_string(),
            other => format!("%{other:02X}"),
        })
        .collect()
}

/// A stored customer row.
#[must_use]
pub fn customer(id: i64, name: &str) -> Customer {
    Customer {
        id: CustomerId::new(id),
        name: name.to_string(),
        document: None,
        email: None,
        phone: None,
        created_at: Some(Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap()),
    }
}

/// A stored pending invoice row.
#[must_use]
pub fn pending_invoice(id: i64, customer: i64, amount: &str, due: (i32, u32, u32)) -> Invoice {
    Invoice {
        id: InvoiceId::new(id),
        customer_id: Some(CustomerId::new(customer)),
        amount: amount.parse().unwrap(),
        due_date: Some(NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap()),
        description: None,
        status: InvoiceStatus::Pending,
        attachment_url: None,
        created_at: Some(Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap()),
        paid_at: None,
    }
}
