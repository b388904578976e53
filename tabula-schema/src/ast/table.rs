//! Table definitions.

use serde::{Deserialize, Serialize};

use super::{ColumnSchema, ForeignKeySchema, Ident, IndexSchema, PrimaryKeySchema};
use crate::error::SchemaResult;
use crate::validator::Validator;

/// A table: columns plus keys and indexes.
///
/// Tables are immutable descriptions. Build them with [`TableSchema::builder`],
/// which validates the definition, or deserialize them (validated the same
/// way).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableDef", into = "TableDef")]
pub struct TableSchema {
    /// Table name.
    pub name: Ident,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSchema>,
    /// Primary key.
    pub primary_key: Option<PrimaryKeySchema>,
    /// Secondary indexes.
    pub indexes: Vec<IndexSchema>,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKeySchema>,
}

impl TableSchema {
    /// Start building a table.
    pub fn builder(name: impl Into<Ident>) -> TableBuilder {
        TableBuilder {
            def: TableDef {
                name: name.into(),
                columns: Vec::new(),
                primary_key: None,
                indexes: Vec::new(),
                foreign_keys: Vec::new(),
            },
        }
    }

    /// Get the table name as a string.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Look a column up by name, ignoring case.
    pub fn column(&self, name: &Ident) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name.eq_ignore_case(name))
    }

    /// Whether the table has a column with this name, ignoring case.
    pub fn has_column(&self, name: &Ident) -> bool {
        self.column(name).is_some()
    }

    /// Names of tables referenced by foreign keys, excluding the table itself.
    pub fn referenced_tables(&self) -> Vec<&Ident> {
        let mut out: Vec<&Ident> = Vec::new();
        for fk in &self.foreign_keys {
            if let Some(target) = fk.referenced_table()
                && !target.eq_ignore_case(&self.name)
                && !out.iter().any(|t| t.eq_ignore_case(target))
            {
                out.push(target);
            }
        }
        out
    }

    /// Copy of this table with a different column list.
    ///
    /// Used to derive a variant for comparison without touching the
    /// original value.
    pub fn with_columns(&self, columns: Vec<ColumnSchema>) -> SchemaResult<Self> {
        let mut def = TableDef::from(self.clone());
        def.columns = columns;
        Self::try_from(def)
    }
}

/// Builder for [`TableSchema`].
#[derive(Debug, Clone)]
pub struct TableBuilder {
    def: TableDef,
}

impl TableBuilder {
    /// Add a column.
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.def.columns.push(column);
        self
    }

    /// Set the primary key.
    pub fn primary_key(mut self, pk: PrimaryKeySchema) -> Self {
        self.def.primary_key = Some(pk);
        self
    }

    /// Add an index.
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.def.indexes.push(index);
        self
    }

    /// Add a foreign key.
    pub fn foreign_key(mut self, fk: ForeignKeySchema) -> Self {
        self.def.foreign_keys.push(fk);
        self
    }

    /// Validate and build the table.
    pub fn build(self) -> SchemaResult<TableSchema> {
        TableSchema::try_from(self.def)
    }
}

/// Serialized shape of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableDef {
    name: Ident,
    #[serde(default)]
    columns: Vec<ColumnSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    primary_key: Option<PrimaryKeySchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    indexes: Vec<IndexSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    foreign_keys: Vec<ForeignKeySchema>,
}

impl TryFrom<TableDef> for TableSchema {
    type Error = crate::error::SchemaError;

    fn try_from(def: TableDef) -> Result<Self, Self::Error> {
        let table = TableSchema {
            name: def.name,
            columns: def.columns,
            primary_key: def.primary_key,
            indexes: def.indexes,
            foreign_keys: def.foreign_keys,
        };
        Validator::new().validate_table(&table)?;
        Ok(table)
    }
}

impl From<TableSchema> for TableDef {
    fn from(table: TableSchema) -> Self {
        Self {
            name: table.name,
            columns: table.columns,
            primary_key: table.primary_key,
            indexes: table.indexes,
            foreign_keys: table.foreign_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::ast::{ColumnType, ForeignKeySchema};
    use crate::error::SchemaError;

    #[test]
    fn test_build_simple_table() {
        let table = TableSchema::builder("tester")
            .column(ColumnSchema::new("bar", ColumnType::Integer))
            .primary_key(PrimaryKeySchema::new(["bar"]))
            .build()
            .unwrap();

        assert_eq!(table.name(), "tester");
        assert_eq!(table.columns.len(), 1);
        assert!(table.primary_key.is_some());
    }

    #[test]
    fn test_duplicate_column_is_construction_error() {
        let err = TableSchema::builder("t")
            .column(ColumnSchema::new("id", ColumnType::Integer))
            .column(ColumnSchema::new("ID", ColumnType::BigInt))
            .build()
            .unwrap_err();

        assert!(matches!(err, SchemaError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let table = TableSchema::builder("t")
            .column(ColumnSchema::new("Name", ColumnType::Text))
            .build()
            .unwrap();

        assert!(table.has_column(&Ident::new("NAME")));
        assert!(!table.has_column(&Ident::new("other")));
    }

    #[test]
    fn test_referenced_tables_skips_self() {
        let table = TableSchema::builder("node")
            .column(ColumnSchema::new("id", ColumnType::Integer))
            .column(ColumnSchema::new("parent_id", ColumnType::Integer).nullable())
            .column(ColumnSchema::new("owner_id", ColumnType::Integer))
            .foreign_key(ForeignKeySchema::new("parent_id", "node", "id"))
            .foreign_key(ForeignKeySchema::new("owner_id", "users", "id"))
            .build()
            .unwrap();

        let refs: Vec<_> = table.referenced_tables().iter().map(|t| t.as_str()).collect();
        assert_eq!(refs, vec!["users"]);
    }

    #[test]
    fn test_with_columns_leaves_original_untouched() {
        let table = TableSchema::builder("t")
            .column(ColumnSchema::new("a", ColumnType::Integer))
            .column(ColumnSchema::new("b", ColumnType::Integer))
            .build()
            .unwrap();

        let trimmed = table.with_columns(vec![table.columns[0].clone()]).unwrap();
        assert_eq!(trimmed.columns.len(), 1);
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn test_deserialize_validates() {
        let text = r#"
            name = "t"
            [[columns]]
            name = "a"
            type = "int"
            [[columns]]
            name = "A"
            type = "text"
        "#;
        let result: Result<TableSchema, _> = toml::from_str(text);
        assert!(result.is_err());
    }
}
