//! CLI error types and result alias.

use miette::Diagnostic;
use tabula_migrate::PlanningError;
use tabula_schema::SchemaError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(tabula::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(tabula::config))]
    Config(String),

    /// Schema file could not be read or is invalid
    #[error("Schema error: {0}")]
    #[diagnostic(code(tabula::schema))]
    Schema(String),

    /// Planning or rendering failed
    #[error("Planning error: {0}")]
    #[diagnostic(code(tabula::plan))]
    Planning(#[from] PlanningError),

    /// Plan verification found drift
    #[error("Verification failed: {0}")]
    #[diagnostic(code(tabula::verify))]
    Verification(String),
}

impl From<SchemaError> for CliError {
    fn from(err: SchemaError) -> Self {
        CliError::Schema(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}
