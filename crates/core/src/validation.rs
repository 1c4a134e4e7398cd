//! Field-level validation errors shared by every form.

use std::fmt;

/// A single failed check on a named form field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    /// Form field name (matches the HTML `name` attribute).
    pub field: String,
    /// Message shown next to the field.
    pub message: String,
}

/// All validation failures collected for one submission.
///
/// A submission with any error performs no writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Record a failure for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Convenience constructor for a single failure.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// First message recorded for `field`, if any.
    #[must_use]
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Merge another set of failures into this one.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// `Ok(value)` when nothing failed, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` if any failure was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join(" "))
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationErrors::default().into_result(5), Ok(5));
        let errors = ValidationErrors::single("amount", "Amount must be greater than zero.");
        assert!(errors.clone().into_result(5).is_err());
        assert_eq!(errors.to_string(), "Amount must be greater than zero.");
    }

    #[test]
    fn test_message_for_returns_first() {
        let mut errors = ValidationErrors::default();
        errors.push("amount_1", "first");
        errors.push("amount_1", "second");
        errors.push("due_date_1", "date");
        assert_eq!(errors.message_for("amount_1"), Some("first"));
        assert_eq!(errors.message_for("name"), None);
        assert_eq!(errors.len(), 3);
    }
}
