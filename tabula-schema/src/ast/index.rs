//! Index definitions.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::Ident;

/// One indexed element: a column or an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPart {
    /// A plain column.
    Column(Ident),
    /// An expression, making the index functional.
    Expression(SmolStr),
}

impl IndexPart {
    /// The column, if this part is a plain column.
    pub fn as_column(&self) -> Option<&Ident> {
        match self {
            Self::Column(ident) => Some(ident),
            Self::Expression(_) => None,
        }
    }
}

/// Index access method hint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    /// B-tree index (default).
    BTree,
    /// Hash index.
    Hash,
    /// GiST index (PostgreSQL).
    Gist,
    /// GIN index (PostgreSQL).
    Gin,
    /// BRIN index (PostgreSQL).
    Brin,
    /// Full-text search index.
    FullText,
}

impl IndexType {
    /// Parse from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "btree" => Some(Self::BTree),
            "hash" => Some(Self::Hash),
            "gist" => Some(Self::Gist),
            "gin" => Some(Self::Gin),
            "brin" => Some(Self::Brin),
            "fulltext" => Some(Self::FullText),
            _ => None,
        }
    }

    /// SQL keyword for the access method.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::BTree => "BTREE",
            Self::Hash => "HASH",
            Self::Gist => "GIST",
            Self::Gin => "GIN",
            Self::Brin => "BRIN",
            Self::FullText => "FULLTEXT",
        }
    }
}

/// An index on a table.
///
/// The name is cosmetic: two indexes with the same parts, uniqueness and
/// filter are the same index for diffing purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Explicit name; generated by the renderer when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Ident>,
    /// Indexed columns and expressions, in declaration order.
    pub parts: Vec<IndexPart>,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
    /// Filter predicate of a partial index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<SmolStr>,
    /// Access method hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_type: Option<IndexType>,
}

impl IndexSchema {
    /// Create a non-unique index over the given columns.
    pub fn on<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        Self {
            name: None,
            parts: columns
                .into_iter()
                .map(|c| IndexPart::Column(c.into()))
                .collect(),
            unique: false,
            filter: None,
            index_type: None,
        }
    }

    /// Create a unique index over the given columns.
    pub fn unique_on<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        Self::on(columns).unique()
    }

    /// Create a functional index over one expression.
    pub fn on_expression(expression: impl Into<SmolStr>) -> Self {
        Self {
            name: None,
            parts: vec![IndexPart::Expression(expression.into())],
            unique: false,
            filter: None,
            index_type: None,
        }
    }

    /// Set the index name.
    pub fn named(mut self, name: impl Into<Ident>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Make the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Add a filter predicate, making the index partial.
    pub fn filter(mut self, predicate: impl Into<SmolStr>) -> Self {
        self.filter = Some(predicate.into());
        self
    }

    /// Add an expression part.
    pub fn with_expression(mut self, expression: impl Into<SmolStr>) -> Self {
        self.parts.push(IndexPart::Expression(expression.into()));
        self
    }

    /// Set the access method hint.
    pub fn using(mut self, index_type: IndexType) -> Self {
        self.index_type = Some(index_type);
        self
    }

    /// Plain columns covered by the index.
    pub fn columns(&self) -> impl Iterator<Item = &Ident> {
        self.parts.iter().filter_map(IndexPart::as_column)
    }

    /// Whether the index has at least one expression part.
    pub fn is_functional(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, IndexPart::Expression(_)))
    }

    /// Whether the index has a filter predicate.
    pub fn is_partial(&self) -> bool {
        self.filter.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_index_on_columns() {
        let idx = IndexSchema::on(["a", "b"]);
        assert_eq!(idx.columns().count(), 2);
        assert!(!idx.unique);
        assert!(!idx.is_functional());
        assert!(!idx.is_partial());
    }

    #[test]
    fn test_unique_partial_index() {
        let idx = IndexSchema::unique_on(["email"])
            .named("users_email_active")
            .filter("deleted_at IS NULL");
        assert!(idx.unique);
        assert!(idx.is_partial());
        assert_eq!(idx.name.as_ref().map(|n| n.as_str()), Some("users_email_active"));
    }

    #[test]
    fn test_functional_index() {
        let idx = IndexSchema::on_expression("lower(email)").using(IndexType::Hash);
        assert!(idx.is_functional());
        assert_eq!(idx.columns().count(), 0);
        assert_eq!(idx.index_type.as_ref().map(|t| t.as_sql()), Some("HASH"));
    }

    #[test]
    fn test_index_type_from_str() {
        assert_eq!(IndexType::from_str("GIN"), Some(IndexType::Gin));
        assert_eq!(IndexType::from_str("unknown"), None);
    }
}
