//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (backend reachable)
//!
//! # Dashboard
//! GET  /                       - Receivables overview
//!
//! # Customers
//! GET  /customers              - Customer list
//! GET  /customers/new          - Registration form
//! POST /customers/new          - Register customer
//!
//! # Invoices
//! GET  /invoices/new           - Issuance form (?mode=single|auto|manual&count=N)
//! POST /invoices/new           - Issue invoice(s), multipart
//! GET  /invoices/edit          - Invoice picker (?id=N jumps to the form)
//! GET  /invoices/{id}/edit     - Edit form
//! POST /invoices/{id}/edit     - Save edit, multipart
//! GET  /invoices/settle        - Pending invoices
//! POST /invoices/settle        - Mark one paid or written off
//! ```

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::backend::Backend;
use crate::services::attachments::MAX_ATTACHMENT_BYTES;
use crate::state::AppState;

pub mod customers;
pub mod dashboard;
pub mod health;
pub mod invoices;

/// Request body limit: room for a few attachments plus form fields.
const BODY_LIMIT_BYTES: usize = 4 * MAX_ATTACHMENT_BYTES;

/// Directory served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Page routes, without state.
pub fn routes<B: Backend>() -> Router<AppState<B>> {
    Router::new()
        .route("/", get(dashboard::index::<B>))
        .route("/customers", get(customers::index::<B>))
        .route(
            "/customers/new",
            get(customers::new_form).post(customers::create::<B>),
        )
        .merge(invoices::routes::<B>())
}

/// Complete application: pages, health checks, static files and tracing.
///
/// Sentry layers are added by the binary, outside this router.
pub fn app<B: Backend>(state: AppState<B>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<B>))
        .merge(routes::<B>())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

// =============================================================================
// Shared view types
// =============================================================================

/// Banner shown at the top of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// CSS modifier: `success`, `warning` or `error`.
    pub kind: &'static str,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: "warning",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }
}

/// One entry of a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Customer choices for invoice forms, with `selected` preselected.
pub fn customer_options(
    customers: &[boletos_core::Customer],
    selected: Option<&str>,
) -> Vec<SelectOption> {
    customers
        .iter()
        .map(|customer| {
            let value = customer.id.to_string();
            SelectOption {
                selected: selected == Some(value.as_str()),
                label: customer.display_name(),
                value,
            }
        })
        .collect()
}
