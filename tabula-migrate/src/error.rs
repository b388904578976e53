//! Error types for migration planning.

use tabula_schema::SchemaError;
use thiserror::Error;

/// Result type alias for planning operations.
pub type PlanResult<T> = Result<T, PlanningError>;

/// Errors that can occur while planning or writing a migration.
///
/// Planning itself never executes SQL, so none of these leave a database in
/// a partially migrated state.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// The desired schema is malformed.
    #[error("Invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    /// The metadata reader could not reach the database.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The target dialect has no way to express a desired feature.
    #[error("Unsupported by {dialect}: {feature}{}", table_suffix(.table))]
    UnsupportedByDialect {
        /// Dialect name.
        dialect: String,
        /// Feature description.
        feature: String,
        /// Owning table, if any.
        table: Option<String>,
    },

    /// A script was requested for an empty table set.
    #[error("no tables supplied")]
    NoTables,

    /// Snapshot or configuration file could not be parsed.
    #[error("Invalid snapshot: {0}")]
    Snapshot(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn table_suffix(table: &Option<String>) -> String {
    table
        .as_ref()
        .map(|t| format!(" (table `{t}`)"))
        .unwrap_or_default()
}

impl PlanningError {
    /// Create a connectivity error.
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Create an unsupported-by-dialect error.
    pub fn unsupported(
        dialect: impl Into<String>,
        feature: impl Into<String>,
        table: Option<&str>,
    ) -> Self {
        Self::UnsupportedByDialect {
            dialect: dialect.into(),
            feature: feature.into(),
            table: table.map(str::to_string),
        }
    }

    /// Create a snapshot error.
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Check if this error comes from the caller's input rather than the
    /// environment.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSchema(_) | Self::UnsupportedByDialect { .. } | Self::NoTables
        )
    }

    /// Check if retrying the same call could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tables_display() {
        assert_eq!(PlanningError::NoTables.to_string(), "no tables supplied");
    }

    #[test]
    fn test_unsupported_display() {
        let err = PlanningError::unsupported("sqlite", "functional index", Some("users"));
        let msg = err.to_string();
        assert!(msg.contains("sqlite"));
        assert!(msg.contains("functional index"));
        assert!(msg.contains("users"));

        let err = PlanningError::unsupported("h2", "partial index", None);
        assert!(!err.to_string().contains("table"));
    }

    #[test]
    fn test_from_schema_error() {
        let err: PlanningError = SchemaError::duplicate_column("t", "a").into();
        assert!(matches!(err, PlanningError::InvalidSchema(_)));
        assert!(err.is_usage_error());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(PlanningError::connectivity("refused").is_recoverable());
        assert!(!PlanningError::NoTables.is_recoverable());
    }
}
