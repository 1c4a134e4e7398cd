//! Customer registration.

use boletos_core::{Customer, NewCustomer};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use super::ServiceError;
use crate::backend::Backend;

/// Registration form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Validate the form and create one customer with `created_at = now`.
///
/// # Errors
///
/// Returns `ServiceError::Invalid` without writing when the name is blank,
/// or `ServiceError::Backend` if the insert is rejected.
#[instrument(skip(backend, form))]
pub async fn register_customer<B: Backend>(
    backend: &B,
    form: &CustomerForm,
    now: DateTime<Utc>,
) -> Result<Customer, ServiceError> {
    let customer = NewCustomer::from_form(&form.name, &form.document, &form.email, &form.phone, now)?;
    let stored = backend.insert_customer(&customer).await?;
    tracing::info!(customer_id = %stored.id, "Customer registered");
    Ok(stored)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    #[tokio::test]
    async fn test_register_customer() {
        let backend = InMemoryBackend::new();
        let form = CustomerForm {
            name: "Maria Souza".to_string(),
            document: "123.456.789-00".to_string(),
            ..CustomerForm::default()
        };

        let customer = register_customer(&backend, &form, Utc::now()).await.unwrap();
        assert_eq!(customer.name, "Maria Souza");
        assert_eq!(customer.email, None);
        assert_eq!(backend.customers().await.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_name_writes_nothing() {
        let backend = InMemoryBackend::new();
        let form = CustomerForm {
            name: "  ".to_string(),
            ..CustomerForm::default()
        };

        let err = register_customer(&backend, &form, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(ref e) if e.message_for("name").is_some()));
        assert_eq!(backend.write_count(), 0);
    }
}
