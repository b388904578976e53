//! Top-level schema definition.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{Ident, Sequence, TableSchema};
use crate::error::{SchemaError, SchemaResult};
use crate::validator::Validator;

/// A set of tables and standalone sequences.
///
/// Tables and sequences are keyed by their case-insensitive name and keep
/// insertion order. A `Schema` read from a live database and one declared by
/// the application have the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDef", into = "SchemaDef")]
pub struct Schema {
    /// Tables by case-folded name.
    pub tables: IndexMap<SmolStr, TableSchema>,
    /// Standalone sequences by case-folded name.
    pub sequences: IndexMap<SmolStr, Sequence>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from tables, validating cross-table references.
    pub fn from_tables(tables: impl IntoIterator<Item = TableSchema>) -> SchemaResult<Self> {
        Self::try_from(SchemaDef {
            tables: tables.into_iter().collect(),
            sequences: Vec::new(),
        })
    }

    /// Add a table, replacing any table of the same name.
    ///
    /// No cross-table validation happens here; call [`Schema::validate`]
    /// once the schema is complete.
    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.insert_table(table);
        self
    }

    /// Add a standalone sequence, replacing any sequence of the same name.
    pub fn with_sequence(mut self, sequence: Sequence) -> Self {
        self.insert_sequence(sequence);
        self
    }

    /// Insert or replace a table.
    pub fn insert_table(&mut self, table: TableSchema) -> Option<TableSchema> {
        self.tables.insert(table.name.case_key(), table)
    }

    /// Insert or replace a sequence.
    pub fn insert_sequence(&mut self, sequence: Sequence) -> Option<Sequence> {
        self.sequences.insert(sequence.name.case_key(), sequence)
    }

    /// Remove a table by name.
    pub fn remove_table(&mut self, name: &Ident) -> Option<TableSchema> {
        self.tables.shift_remove(&name.case_key())
    }

    /// Remove a sequence by name.
    pub fn remove_sequence(&mut self, name: &Ident) -> Option<Sequence> {
        self.sequences.shift_remove(&name.case_key())
    }

    /// Get a table by name, ignoring case.
    pub fn table(&self, name: &Ident) -> Option<&TableSchema> {
        self.tables.get(&name.case_key())
    }

    /// Get a mutable table by name, ignoring case.
    pub fn table_mut(&mut self, name: &Ident) -> Option<&mut TableSchema> {
        self.tables.get_mut(&name.case_key())
    }

    /// Get a sequence by name, ignoring case.
    pub fn sequence(&self, name: &Ident) -> Option<&Sequence> {
        self.sequences.get(&name.case_key())
    }

    /// Whether the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterate tables in insertion order.
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    /// Every sequence the schema uses: standalone ones plus those bound to
    /// autoincrement columns.
    pub fn all_sequences(&self) -> Vec<&Sequence> {
        let mut out: Vec<&Sequence> = self.sequences.values().collect();
        for table in self.tables.values() {
            for column in &table.columns {
                if let Some(seq) = column.auto_increment.as_ref().and_then(|a| a.sequence())
                    && !out.iter().any(|s| s.name.eq_ignore_case(&seq.name))
                {
                    out.push(seq);
                }
            }
        }
        out
    }

    /// Run cross-table validation.
    pub fn validate(&self) -> SchemaResult<()> {
        Validator::new().validate_schema(self)
    }
}

/// Serialized shape of a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SchemaDef {
    #[serde(default, rename = "table")]
    tables: Vec<TableSchema>,
    #[serde(default, rename = "sequence", skip_serializing_if = "Vec::is_empty")]
    sequences: Vec<Sequence>,
}

impl TryFrom<SchemaDef> for Schema {
    type Error = SchemaError;

    fn try_from(def: SchemaDef) -> Result<Self, Self::Error> {
        let mut schema = Schema::new();
        let mut errors = Vec::new();

        for table in def.tables {
            let name = table.name.to_string();
            if schema.insert_table(table).is_some() {
                errors.push(SchemaError::duplicate("table", name));
            }
        }
        for sequence in def.sequences {
            let name = sequence.name.to_string();
            if schema.insert_sequence(sequence).is_some() {
                errors.push(SchemaError::duplicate("sequence", name));
            }
        }

        if let Some(err) = SchemaError::from_many(errors) {
            return Err(err);
        }

        schema.validate()?;
        Ok(schema)
    }
}

impl From<Schema> for SchemaDef {
    fn from(schema: Schema) -> Self {
        Self {
            tables: schema.tables.into_values().collect(),
            sequences: schema.sequences.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::ast::{ColumnSchema, ColumnType, ForeignKeySchema, PrimaryKeySchema};

    fn users() -> TableSchema {
        TableSchema::builder("users")
            .column(ColumnSchema::new("id", ColumnType::BigInt))
            .primary_key(PrimaryKeySchema::new(["id"]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookup_ignores_case() {
        let schema = Schema::new().with_table(users());
        assert!(schema.table(&Ident::new("USERS")).is_some());
        assert!(schema.table(&Ident::new("posts")).is_none());
    }

    #[test]
    fn test_from_tables_rejects_dangling_reference() {
        let posts = TableSchema::builder("posts")
            .column(ColumnSchema::new("author_id", ColumnType::BigInt))
            .foreign_key(ForeignKeySchema::new("author_id", "users", "id"))
            .build()
            .unwrap();

        let err = Schema::from_tables([posts]).unwrap_err();
        assert!(matches!(err, SchemaError::DanglingReference { .. }));
    }

    #[test]
    fn test_all_sequences_includes_column_sequences() {
        let table = TableSchema::builder("t")
            .column(ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("t_seq")))
            .build()
            .unwrap();
        let schema = Schema::new()
            .with_table(table)
            .with_sequence(Sequence::new("standalone"));

        let names: Vec<_> = schema.all_sequences().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["standalone", "t_seq"]);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let text = r#"
            [[table]]
            name = "tester"
            primary_key = { columns = ["bar"] }

            [[table.columns]]
            name = "bar"
            type = "INT"

            [[sequence]]
            name = "counter"
            start = 100
        "#;
        let schema: Schema = toml::from_str(text).unwrap();
        let table = schema.table(&Ident::new("tester")).unwrap();
        assert_eq!(table.columns[0].column_type, ColumnType::Integer);
        assert_eq!(schema.sequence(&Ident::new("counter")).and_then(|s| s.start), Some(100));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let text = r#"
            [[table]]
            name = "a"
            [[table]]
            name = "A"
        "#;
        assert!(toml::from_str::<Schema>(text).is_err());
    }
}
