//! Error types for schema construction and validation.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building or validating a schema description.
///
/// All of these describe a malformed *desired* schema. They are detected
/// before any diffing happens and are never produced by comparing two valid
/// schemas.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Two columns in one table share a name (case-insensitively).
    #[error("duplicate column `{table}.{column}`")]
    #[diagnostic(code(tabula::schema::duplicate_column))]
    DuplicateColumn { table: String, column: String },

    /// Duplicate table, sequence or index definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(tabula::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// A key, index or foreign key names a column the table does not have.
    #[error("{context} on `{table}` references unknown column `{column}`")]
    #[diagnostic(code(tabula::schema::unknown_column))]
    UnknownColumn {
        table: String,
        column: String,
        context: String,
    },

    /// A foreign key points at a table or column that does not exist.
    #[error("foreign key on `{table}` references missing `{target}`")]
    #[diagnostic(
        code(tabula::schema::dangling_reference),
        help("declare the referenced table in the same batch or make sure it exists in the database")
    )]
    DanglingReference { table: String, target: String },

    /// A composite foreign key does not match the arity of the key it targets.
    #[error(
        "foreign key on `{table}` has {found} column(s) but the primary key of `{referenced_table}` has {expected}"
    )]
    #[diagnostic(code(tabula::schema::arity_mismatch))]
    ArityMismatch {
        table: String,
        referenced_table: String,
        expected: usize,
        found: usize,
    },

    /// Invalid column definition.
    #[error("invalid column `{table}.{column}`: {message}")]
    #[diagnostic(code(tabula::schema::invalid_column))]
    InvalidColumn {
        table: String,
        column: String,
        message: String,
    },

    /// Invalid index definition.
    #[error("invalid index on `{table}`: {message}")]
    #[diagnostic(code(tabula::schema::invalid_index))]
    InvalidIndex { table: String, message: String },

    /// Invalid foreign key definition.
    #[error("invalid foreign key on `{table}`: {message}")]
    #[diagnostic(code(tabula::schema::invalid_foreign_key))]
    InvalidForeignKey { table: String, message: String },

    /// Invalid sequence definition.
    #[error("invalid sequence `{name}`: {message}")]
    #[diagnostic(code(tabula::schema::invalid_sequence))]
    InvalidSequence { name: String, message: String },

    /// More than one column claims the same autoincrement sequence.
    #[error("sequence `{sequence}` is bound to more than one column: {columns}")]
    #[diagnostic(code(tabula::schema::shared_sequence))]
    SharedSequence { sequence: String, columns: String },

    /// A column type string could not be understood.
    #[error("invalid column type `{input}`")]
    #[diagnostic(code(tabula::schema::invalid_type))]
    InvalidType { input: String },

    /// Validation error with multiple issues.
    #[error("schema validation failed with {count} error(s)")]
    #[diagnostic(code(tabula::schema::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<SchemaError>,
    },
}

impl SchemaError {
    /// Create a duplicate column error.
    pub fn duplicate_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DuplicateColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an unknown column error.
    pub fn unknown_column(
        table: impl Into<String>,
        column: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
            context: context.into(),
        }
    }

    /// Create a dangling reference error.
    pub fn dangling(table: impl Into<String>, target: impl Into<String>) -> Self {
        Self::DanglingReference {
            table: table.into(),
            target: target.into(),
        }
    }

    /// Create an invalid column error.
    pub fn invalid_column(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidColumn {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid index error.
    pub fn invalid_index(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidIndex {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an invalid foreign key error.
    pub fn invalid_foreign_key(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidForeignKey {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an invalid sequence error.
    pub fn invalid_sequence(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSequence {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Collapse a list of errors into one.
    ///
    /// A single error is returned as-is; several are wrapped in
    /// [`SchemaError::ValidationFailed`].
    pub fn from_many(mut errors: Vec<SchemaError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            count => Some(Self::ValidationFailed { count, errors }),
        }
    }

    /// Iterate over the individual problems this error describes.
    pub fn issues(&self) -> Vec<&SchemaError> {
        match self {
            Self::ValidationFailed { errors, .. } => errors.iter().flat_map(|e| e.issues()).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_duplicate_column_display() {
        let err = SchemaError::duplicate_column("users", "email");
        assert_eq!(err.to_string(), "duplicate column `users.email`");
    }

    #[test]
    fn test_arity_mismatch_display() {
        let err = SchemaError::ArityMismatch {
            table: "line".to_string(),
            referenced_table: "order".to_string(),
            expected: 2,
            found: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("1 column(s)"));
        assert!(msg.contains("has 2"));
    }

    #[test]
    fn test_from_many_single_is_unwrapped() {
        let err = SchemaError::from_many(vec![SchemaError::duplicate("table", "users")]).unwrap();
        assert!(matches!(err, SchemaError::Duplicate { .. }));
    }

    #[test]
    fn test_from_many_empty() {
        assert!(SchemaError::from_many(Vec::new()).is_none());
    }

    #[test]
    fn test_issues_flattens_nested() {
        let err = SchemaError::from_many(vec![
            SchemaError::duplicate("table", "a"),
            SchemaError::duplicate_column("b", "c"),
        ])
        .unwrap();
        assert!(matches!(err, SchemaError::ValidationFailed { count: 2, .. }));
        assert_eq!(err.issues().len(), 2);
    }
}
