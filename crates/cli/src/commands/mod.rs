//! CLI subcommands.

use boletos_admin::backend::BackendError;
use boletos_admin::config::ConfigError;
use boletos_core::ValidationErrors;
use thiserror::Error;

pub mod report;
pub mod schedule;

/// Errors surfaced by any subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment or holiday file could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The backend rejected a request.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Arguments failed the same checks as the issuance form.
    #[error("Invalid arguments: {0}")]
    Invalid(#[from] ValidationErrors),

    /// JSON output failed.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
