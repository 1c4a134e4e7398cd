//! Supabase REST client (PostgREST tables and Storage).
//!
//! # Example
//!
//! ```rust,ignore
//! use boletos_admin::backend::{Backend, SupabaseClient};
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//!
//! let invoices = client.fetch_invoices().await?;
//! client.upload_object("12/global_2025-01-01T10-00-00_boleto.pdf", bytes, "application/pdf").await?;
//! let url = client.public_url("12/global_2025-01-01T10-00-00_boleto.pdf");
//! ```

use std::sync::Arc;
use std::time::Duration;

use boletos_core::{
    AttachmentPatch, Customer, Invoice, InvoiceId, InvoiceUpdate, NewCustomer, NewInvoice,
    Settlement,
};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{Backend, BackendError};
use crate::config::SupabaseConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle to one Supabase project.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    /// Project URL without trailing slash
    base_url: String,
    key: SecretString,
    customers_table: String,
    invoices_table: String,
    bucket: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.inner.base_url)
            .field("bucket", &self.inner.bucket)
            .finish_non_exhaustive()
    }
}

/// Percent-encode each segment of an object path, keeping the slashes.
fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl SupabaseClient {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Request` if the HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                base_url: config.url.as_str().trim_end_matches('/').to_string(),
                key: SecretString::from(config.expose_key().to_string()),
                customers_table: config.customers_table.clone(),
                invoices_table: config.invoices_table.clone(),
                bucket: config.bucket.clone(),
            }),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.inner.base_url)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.inner.base_url,
            self.inner.bucket,
            encode_object_path(path)
        )
    }

    /// Attach the `apikey` and bearer headers.
    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.inner.key.expose_secret();
        request.header("apikey", key).bearer_auth(key)
    }

    /// Turn a non-success response into `BackendError::Status`.
    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "Supabase request rejected");
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn select_all<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, BackendError> {
        let response = self
            .authed(self.inner.client.get(format!("{}?select=*", self.table_url(table))))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn insert_rows<P, T>(&self, table: &str, rows: &P) -> Result<Vec<T>, BackendError>
    where
        P: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .authed(self.inner.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// `PATCH ?id=eq.{id}` on the invoices table, failing when no row matched.
    async fn patch_invoice<P>(&self, id: InvoiceId, payload: &P) -> Result<(), BackendError>
    where
        P: Serialize + ?Sized + Sync,
    {
        let url = format!("{}?id=eq.{id}", self.table_url(&self.inner.invoices_table));
        let response = self
            .authed(self.inner.client.patch(url))
            .header("Prefer", "return=representation")
            .json(payload)
            .send()
            .await?;

        let rows: Vec<serde_json::Value> = Self::decode(response).await?;
        if rows.is_empty() {
            return Err(BackendError::MissingRow {
                table: "invoices",
                id: id.as_i64(),
            });
        }
        Ok(())
    }
}

impl Backend for SupabaseClient {
    #[instrument(skip(self))]
    async fn fetch_customers(&self) -> Result<Vec<Customer>, BackendError> {
        self.select_all(&self.inner.customers_table).await
    }

    #[instrument(skip(self))]
    async fn fetch_invoices(&self) -> Result<Vec<Invoice>, BackendError> {
        self.select_all(&self.inner.invoices_table).await
    }

    #[instrument(skip(self, customer))]
    async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer, BackendError> {
        let rows: Vec<Customer> = self
            .insert_rows(&self.inner.customers_table, std::slice::from_ref(customer))
            .await?;
        rows.into_iter()
            .next()
            .ok_or(BackendError::EmptyInsert("customers"))
    }

    #[instrument(skip(self, invoices), fields(count = invoices.len()))]
    async fn insert_invoices(&self, invoices: &[NewInvoice]) -> Result<Vec<Invoice>, BackendError> {
        let rows: Vec<Invoice> = self
            .insert_rows(&self.inner.invoices_table, invoices)
            .await?;
        if rows.is_empty() && !invoices.is_empty() {
            return Err(BackendError::EmptyInsert("invoices"));
        }
        Ok(rows)
    }

    #[instrument(skip(self, update), fields(invoice_id = %id))]
    async fn update_invoice(&self, id: InvoiceId, update: &InvoiceUpdate) -> Result<(), BackendError> {
        self.patch_invoice(id, update).await
    }

    #[instrument(skip(self, settlement), fields(invoice_id = %id, status = %settlement.status))]
    async fn settle_invoice(&self, id: InvoiceId, settlement: &Settlement) -> Result<(), BackendError> {
        self.patch_invoice(id, settlement).await
    }

    #[instrument(skip(self, patch), fields(invoice_id = %id))]
    async fn attach(&self, id: InvoiceId, patch: &AttachmentPatch) -> Result<(), BackendError> {
        self.patch_invoice(id, patch).await
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let response = self
            .authed(self.inner.client.post(self.object_url(path)))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.inner.base_url,
            self.inner.bucket,
            encode_object_path(path)
        )
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> Result<(), BackendError> {
        let url = format!(
            "{}?select=id&limit=1",
            self.table_url(&self.inner.customers_table)
        );
        let response = self.authed(self.inner.client.get(url)).send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
