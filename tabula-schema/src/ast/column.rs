//! Column definitions.

use serde::{Deserialize, Serialize};

use super::{ColumnType, DefaultValue, Ident, Sequence};

/// How an autoincrement column obtains its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoIncrement {
    /// Backed by a sequence the dialect creates and names itself.
    Implicit,
    /// Backed by an explicitly named sequence.
    Sequence(Sequence),
}

impl AutoIncrement {
    /// The explicit sequence, if any.
    pub fn sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Implicit => None,
            Self::Sequence(seq) => Some(seq),
        }
    }

    /// Name of the explicit sequence, if any.
    pub fn sequence_name(&self) -> Option<&Ident> {
        self.sequence().map(|s| &s.name)
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: Ident,
    /// Column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether `NULL` is allowed.
    #[serde(default)]
    pub nullable: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Autoincrement behaviour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<AutoIncrement>,
    /// Single-column unique constraint.
    #[serde(default)]
    pub unique: bool,
}

impl ColumnSchema {
    /// Create a `NOT NULL` column without default.
    pub fn new(name: impl Into<Ident>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            default: None,
            auto_increment: None,
            unique: false,
        }
    }

    /// Allow `NULL`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set the default value.
    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Make the column autoincrement with a dialect-managed sequence.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = Some(AutoIncrement::Implicit);
        self
    }

    /// Make the column autoincrement, drawing from the given sequence.
    pub fn auto_increment_with(mut self, sequence: Sequence) -> Self {
        self.auto_increment = Some(AutoIncrement::Sequence(sequence));
        self
    }

    /// Add a single-column unique constraint.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Get the column name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Whether the column is autoincrement.
    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_defaults() {
        let col = ColumnSchema::new("bar", ColumnType::Integer);
        assert_eq!(col.name(), "bar");
        assert!(!col.nullable);
        assert!(col.default.is_none());
        assert!(!col.is_auto_increment());
        assert!(!col.unique);
    }

    #[test]
    fn test_column_builder() {
        let col = ColumnSchema::new("name", ColumnType::Text)
            .nullable()
            .unique()
            .default_value(DefaultValue::string(" "));

        assert!(col.nullable);
        assert!(col.unique);
        assert_eq!(col.default, Some(DefaultValue::string(" ")));
    }

    #[test]
    fn test_auto_increment_with_sequence() {
        let col = ColumnSchema::new("id", ColumnType::BigInt)
            .auto_increment_with(Sequence::new("id_seq"));

        let auto = col.auto_increment.as_ref().unwrap();
        assert_eq!(auto.sequence_name().map(|n| n.as_str()), Some("id_seq"));
    }

    #[test]
    fn test_auto_increment_implicit() {
        let col = ColumnSchema::new("id", ColumnType::Integer).auto_increment();
        assert_eq!(col.auto_increment, Some(AutoIncrement::Implicit));
        assert!(col.auto_increment.unwrap().sequence().is_none());
    }
}
