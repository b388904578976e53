//! Logical DDL operations and migration plans.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tabula_schema::{
    AutoIncrement, ColumnSchema, ColumnType, DefaultValue, ForeignKeySchema, Ident, IndexSchema,
    PrimaryKeySchema, Sequence, TableSchema,
};

/// A single, dialect-independent DDL intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Create a table with its columns, keys and indexes.
    CreateTable { table: TableSchema },
    /// Add a column to an existing table.
    CreateColumn { table: Ident, column: ColumnSchema },
    /// Remove a column.
    DropColumn { table: Ident, column: Ident },
    /// Change the type of a column.
    AlterColumnType {
        table: Ident,
        column: Ident,
        from: ColumnType,
        to: ColumnType,
    },
    /// Change the nullability of a column.
    AlterColumnNullability {
        table: Ident,
        column: Ident,
        /// Current type; some dialects restate it when changing nullability.
        column_type: ColumnType,
        nullable: bool,
    },
    /// Set or drop the default of a column.
    AlterColumnDefault {
        table: Ident,
        column: Ident,
        default: Option<DefaultValue>,
    },
    /// Make a column draw its values from a sequence, or re-point it at a
    /// different one.
    AddAutoIncrement {
        table: Ident,
        column: Ident,
        column_type: ColumnType,
        auto_increment: AutoIncrement,
        /// Sequence the column draws from, when the dialect uses one.
        sequence: Option<Ident>,
    },
    /// Turn an autoincrement column into a plain column.
    DropAutoIncrement {
        table: Ident,
        column: Ident,
        column_type: ColumnType,
        /// Sequence the column drew from, when the dialect uses one.
        sequence: Option<Ident>,
    },
    /// Create a sequence.
    CreateSequence { sequence: Sequence },
    /// Drop a sequence.
    DropSequence { name: Ident },
    /// Rename a sequence, keeping its counter.
    RenameSequence { from: Ident, to: Ident },
    /// Create an index.
    CreateIndex { table: Ident, index: IndexSchema },
    /// Drop an index.
    DropIndex { table: Ident, index: IndexSchema },
    /// Add a primary key.
    AddPrimaryKey {
        table: Ident,
        primary_key: PrimaryKeySchema,
    },
    /// Drop the primary key.
    DropPrimaryKey {
        table: Ident,
        primary_key: PrimaryKeySchema,
    },
    /// Add a foreign key.
    AddForeignKey {
        table: Ident,
        foreign_key: ForeignKeySchema,
    },
    /// Drop a foreign key.
    DropForeignKey {
        table: Ident,
        foreign_key: ForeignKeySchema,
    },
}

impl Operation {
    /// Short kind name, e.g. `create_index`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "create_table",
            Self::CreateColumn { .. } => "create_column",
            Self::DropColumn { .. } => "drop_column",
            Self::AlterColumnType { .. } => "alter_column_type",
            Self::AlterColumnNullability { .. } => "alter_column_nullability",
            Self::AlterColumnDefault { .. } => "alter_column_default",
            Self::AddAutoIncrement { .. } => "add_auto_increment",
            Self::DropAutoIncrement { .. } => "drop_auto_increment",
            Self::CreateSequence { .. } => "create_sequence",
            Self::DropSequence { .. } => "drop_sequence",
            Self::RenameSequence { .. } => "rename_sequence",
            Self::CreateIndex { .. } => "create_index",
            Self::DropIndex { .. } => "drop_index",
            Self::AddPrimaryKey { .. } => "add_primary_key",
            Self::DropPrimaryKey { .. } => "drop_primary_key",
            Self::AddForeignKey { .. } => "add_foreign_key",
            Self::DropForeignKey { .. } => "drop_foreign_key",
        }
    }

    /// The table the operation belongs to. Sequence operations have none.
    pub fn table(&self) -> Option<&Ident> {
        match self {
            Self::CreateTable { table } => Some(&table.name),
            Self::CreateColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AlterColumnType { table, .. }
            | Self::AlterColumnNullability { table, .. }
            | Self::AlterColumnDefault { table, .. }
            | Self::AddAutoIncrement { table, .. }
            | Self::DropAutoIncrement { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddPrimaryKey { table, .. }
            | Self::DropPrimaryKey { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. } => Some(table),
            Self::CreateSequence { .. } | Self::DropSequence { .. } | Self::RenameSequence { .. } => {
                None
            }
        }
    }

    /// Whether the operation alters an existing column in place.
    pub fn is_column_alter(&self) -> bool {
        matches!(
            self,
            Self::AlterColumnType { .. }
                | Self::AlterColumnNullability { .. }
                | Self::AlterColumnDefault { .. }
                | Self::AddAutoIncrement { .. }
                | Self::DropAutoIncrement { .. }
        )
    }

    /// Whether applying the operation can destroy data.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::DropColumn { .. } | Self::DropSequence { .. })
    }

    /// One-line human description.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table } => format!(
                "create table {} ({} column(s))",
                table.name,
                table.columns.len()
            ),
            Self::CreateColumn { table, column } => {
                format!("add column {}.{} {}", table, column.name, column.column_type)
            }
            Self::DropColumn { table, column } => format!("drop column {}.{}", table, column),
            Self::AlterColumnType {
                table,
                column,
                from,
                to,
            } => format!("change type of {}.{} from {} to {}", table, column, from, to),
            Self::AlterColumnNullability {
                table,
                column,
                nullable,
                ..
            } => {
                if *nullable {
                    format!("allow null in {}.{}", table, column)
                } else {
                    format!("make {}.{} not null", table, column)
                }
            }
            Self::AlterColumnDefault {
                table,
                column,
                default,
            } => match default {
                Some(default) => format!("set default of {}.{} to {}", table, column, default.to_sql()),
                None => format!("drop default of {}.{}", table, column),
            },
            Self::AddAutoIncrement {
                table,
                column,
                sequence,
                ..
            } => match sequence {
                Some(seq) => format!("make {}.{} autoincrement from {}", table, column, seq),
                None => format!("make {}.{} autoincrement", table, column),
            },
            Self::DropAutoIncrement { table, column, .. } => {
                format!("remove autoincrement from {}.{}", table, column)
            }
            Self::CreateSequence { sequence } => format!("create sequence {}", sequence.name),
            Self::DropSequence { name } => format!("drop sequence {}", name),
            Self::RenameSequence { from, to } => format!("rename sequence {} to {}", from, to),
            Self::CreateIndex { table, index } => {
                format!("create {} on {}", describe_index(index), table)
            }
            Self::DropIndex { table, index } => {
                format!("drop {} on {}", describe_index(index), table)
            }
            Self::AddPrimaryKey { table, primary_key } => {
                format!("add primary key ({}) to {}", join(&primary_key.columns), table)
            }
            Self::DropPrimaryKey { table, .. } => format!("drop primary key of {}", table),
            Self::AddForeignKey { table, foreign_key } => {
                format!("add {} to {}", describe_foreign_key(foreign_key), table)
            }
            Self::DropForeignKey { table, foreign_key } => {
                format!("drop {} from {}", describe_foreign_key(foreign_key), table)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn join(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(Ident::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_index(index: &IndexSchema) -> String {
    let kind = if index.unique { "unique index" } else { "index" };
    match &index.name {
        Some(name) => format!("{} {}", kind, name),
        None => {
            let parts: Vec<String> = index
                .parts
                .iter()
                .map(|p| match p {
                    tabula_schema::IndexPart::Column(c) => c.to_string(),
                    tabula_schema::IndexPart::Expression(e) => e.to_string(),
                })
                .collect();
            format!("{} ({})", kind, parts.join(", "))
        }
    }
}

fn describe_foreign_key(fk: &ForeignKeySchema) -> String {
    let local: Vec<&str> = fk.columns().map(Ident::as_str).collect();
    let remote: Vec<&str> = fk.referenced_columns().map(Ident::as_str).collect();
    format!(
        "foreign key ({}) -> {}({})",
        local.join(", "),
        fk.referenced_table().map(Ident::as_str).unwrap_or_default(),
        remote.join(", ")
    )
}

/// An ordered list of operations that reconciles the actual schema with the
/// desired one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    /// Desired tables that were absent from the database.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_tables: Vec<Ident>,
    /// Desired features dropped because the dialect cannot express them and
    /// leaving them out is harmless.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MigrationPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the plan has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Iterate over the operations.
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    /// Operations belonging to one table.
    pub fn for_table<'a>(&'a self, table: &'a Ident) -> impl Iterator<Item = &'a Operation> {
        self.operations
            .iter()
            .filter(move |op| op.table().is_some_and(|t| t.eq_ignore_case(table)))
    }

    /// Operation counts by kind, in first-seen order.
    pub fn counts(&self) -> IndexMap<&'static str, usize> {
        let mut counts = IndexMap::new();
        for op in &self.operations {
            *counts.entry(op.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Whether any operation can destroy data.
    pub fn has_destructive_operations(&self) -> bool {
        self.operations.iter().any(Operation::is_destructive)
    }

    /// Get a summary of the plan.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "No changes".to_string();
        }
        self.counts()
            .iter()
            .map(|(kind, n)| format!("{} {}", n, kind.replace('_', " ")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<'a> IntoIterator for &'a MigrationPlan {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_pk() -> Operation {
        Operation::AddPrimaryKey {
            table: Ident::new("tester"),
            primary_key: PrimaryKeySchema::new(["bar"]),
        }
    }

    #[test]
    fn test_operation_table() {
        assert_eq!(add_pk().table().map(Ident::as_str), Some("tester"));
        let op = Operation::DropSequence {
            name: Ident::new("s"),
        };
        assert!(op.table().is_none());
    }

    #[test]
    fn test_describe() {
        assert_eq!(add_pk().describe(), "add primary key (bar) to tester");
        let op = Operation::CreateIndex {
            table: Ident::new("users"),
            index: IndexSchema::unique_on(["email"]),
        };
        assert_eq!(op.to_string(), "create unique index (email) on users");
    }

    #[test]
    fn test_summary() {
        let mut plan = MigrationPlan::new();
        assert_eq!(plan.summary(), "No changes");

        plan.operations.push(add_pk());
        plan.operations.push(Operation::CreateSequence {
            sequence: Sequence::new("s"),
        });
        plan.operations.push(Operation::CreateSequence {
            sequence: Sequence::new("t"),
        });
        assert_eq!(plan.summary(), "1 add primary key, 2 create sequence");
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_is_column_alter() {
        let op = Operation::AlterColumnNullability {
            table: Ident::new("t"),
            column: Ident::new("c"),
            column_type: ColumnType::Integer,
            nullable: true,
        };
        assert!(op.is_column_alter());
        assert!(!add_pk().is_column_alter());
    }

    #[test]
    fn test_destructive() {
        let mut plan = MigrationPlan::new();
        plan.operations.push(add_pk());
        assert!(!plan.has_destructive_operations());
        plan.operations.push(Operation::DropColumn {
            table: Ident::new("t"),
            column: Ident::new("c"),
        });
        assert!(plan.has_destructive_operations());
    }
}
