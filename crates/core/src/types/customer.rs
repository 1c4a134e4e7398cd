//! Customer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::CustomerId;
use super::timestamp::{lenient_timestamp, null_as_default};
use crate::validation::ValidationErrors;

/// Maximum name length accepted by the registration form.
pub const MAX_NAME_LENGTH: usize = 150;

/// A customer row as read from the `customers` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// CPF or CNPJ.
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Name for display, falling back to the id for nameless rows.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Customer #{}", self.id)
        } else {
            self.name.clone()
        }
    }
}

/// Insert payload for a new customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCustomer {
    pub name: String,
    pub document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewCustomer {
    /// Build a customer from raw form values.
    ///
    /// The name is required; every other field is optional and an empty
    /// string is stored as null.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] naming the `name` field when it is blank
    /// or too long.
    pub fn from_form(
        name: &str,
        document: &str,
        email: &str,
        phone: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let name = name.trim();
        if name.is_empty() {
            errors.push("name", "Name is required.");
        } else if name.chars().count() > MAX_NAME_LENGTH {
            errors.push(
                "name",
                format!("Name must be at most {MAX_NAME_LENGTH} characters."),
            );
        }

        errors.into_result(Self {
            name: name.to_string(),
            document: non_empty(document),
            email: non_empty(email),
            phone: non_empty(phone),
            created_at,
        })
    }
}

/// Trim a form value, mapping the empty string to `None`.
#[must_use]
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
