//! Invoice status.

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle status of an invoice.
///
/// Stored as `pending`, `paid` or `written-off` in the `status` column.
/// The edit form may move between any two values; settlement only moves an
/// invoice out of `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum InvoiceStatus {
    /// Issued and still owed.
    #[default]
    #[serde(rename = "pending")]
    Pending,
    /// Settled by payment.
    #[serde(rename = "paid")]
    Paid,
    /// Settled without payment (cancelled / written off).
    #[serde(rename = "written-off")]
    WrittenOff,
}

impl InvoiceStatus {
    /// Every status, in the order the edit form offers them.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Paid, Self::WrittenOff];

    /// Wire value stored in the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::WrittenOff => "written-off",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::WrittenOff => "Written off",
        }
    }

    /// Read a stored value, falling back to `Pending` for anything unknown.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "written-off" | "written_off" => Ok(Self::WrittenOff),
            other => Err(format!("invalid invoice status: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for InvoiceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::from_stored).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::WrittenOff).unwrap(),
            "\"written-off\""
        );
        let paid: InvoiceStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(paid, InvoiceStatus::Paid);
    }

    #[test]
    fn test_unknown_and_null_read_as_pending() {
        let unknown: InvoiceStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(unknown, InvoiceStatus::Pending);
        let null: InvoiceStatus = serde_json::from_str("null").unwrap();
        assert_eq!(null, InvoiceStatus::Pending);
    }

    #[test]
    fn test_from_str_is_strict() {
        assert_eq!(
            "Written_Off".parse::<InvoiceStatus>().unwrap(),
            InvoiceStatus::WrittenOff
        );
        assert!("archived".parse::<InvoiceStatus>().is_err());
    }
}
