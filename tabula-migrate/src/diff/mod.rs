//! Differencers.
//!
//! Each submodule compares one kind of schema element. [`diff_table`] runs
//! them for a table that exists on both sides and returns the operations in
//! the order they must run.

pub mod column;
pub mod constraint;
pub mod index;
pub mod sequence;

use tabula_schema::{Ident, IndexSchema, TableSchema};
use tracing::debug;

pub use column::{ColumnChanges, ColumnDiffer};
pub use constraint::{
    ForeignKeyChanges, ForeignKeyKey, PrimaryKeyChanges, diff_foreign_keys, diff_primary_key,
};
pub use index::{IndexChanges, IndexKey, diff_indexes, effective_indexes};
pub use sequence::{SequenceLedger, backing_sequence, diff_sequence};

use crate::config::PlannerConfig;
use crate::dialect::DialectCapabilities;
use crate::error::PlanResult;
use crate::operation::Operation;

/// Operations for one existing table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableChanges {
    /// Foreign keys to drop before anything else runs.
    pub foreign_key_drops: Vec<Operation>,
    /// Index drops, key changes and column changes, in order.
    pub operations: Vec<Operation>,
    /// Foreign keys to add once every table exists.
    pub foreign_key_adds: Vec<Operation>,
    /// Desired columns the dialect could not add.
    pub skipped_columns: Vec<Ident>,
}

impl TableChanges {
    /// Whether nothing changes.
    pub fn is_empty(&self) -> bool {
        self.foreign_key_drops.is_empty() && self.operations.is_empty() && self.foreign_key_adds.is_empty()
    }
}

/// Compare a desired table with the existing table of the same name.
pub fn diff_table(
    capabilities: &dyn DialectCapabilities,
    config: &PlannerConfig,
    desired: &TableSchema,
    actual: &TableSchema,
    ledger: &mut SequenceLedger,
) -> PlanResult<TableChanges> {
    let table = &desired.name;
    let mut changes = TableChanges::default();

    let mut columns = Vec::new();
    let differ = ColumnDiffer::new(
        capabilities,
        table,
        desired.primary_key.as_ref(),
        actual.primary_key.as_ref(),
    );
    for column in &desired.columns {
        let result = differ.diff(column, actual.column(&column.name), ledger)?;
        if result.skipped {
            changes.skipped_columns.push(column.name.clone());
        }
        columns.extend(result.operations);
    }
    if config.drop_unmapped_columns {
        for column in &actual.columns {
            if !desired.has_column(&column.name) {
                columns.push(Operation::DropColumn {
                    table: table.clone(),
                    column: column.name.clone(),
                });
            }
        }
    }

    let skipped = &changes.skipped_columns;

    let desired_indexes: Vec<IndexSchema> = effective_indexes(desired)
        .into_iter()
        .filter(|idx| !touches(skipped, idx.columns()))
        .collect();
    let indexes = diff_indexes(
        capabilities,
        table,
        &desired_indexes,
        &effective_indexes(actual),
    );

    let mut primary_key = diff_primary_key(
        capabilities,
        table,
        desired.primary_key.as_ref(),
        actual.primary_key.as_ref(),
    );
    if desired
        .primary_key
        .as_ref()
        .is_some_and(|pk| touches(skipped, pk.columns.iter()))
    {
        debug!(table = %table, "primary key uses a skipped column, leaving it alone");
        primary_key = Default::default();
    }

    let foreign_keys: Vec<_> = desired
        .foreign_keys
        .iter()
        .filter(|fk| !touches(skipped, fk.columns()))
        .cloned()
        .collect();
    let foreign_keys = diff_foreign_keys(capabilities, table, &foreign_keys, &actual.foreign_keys);

    changes.foreign_key_drops = foreign_keys.drops;
    changes.operations.extend(indexes.drops);
    changes.operations.extend(primary_key.drop);
    changes.operations.extend(columns);
    changes.operations.extend(primary_key.add);
    changes.operations.extend(indexes.creates);
    changes.foreign_key_adds = foreign_keys.adds;

    Ok(changes)
}

fn touches<'a>(skipped: &[Ident], mut columns: impl Iterator<Item = &'a Ident>) -> bool {
    columns.any(|c| skipped.iter().any(|s| s.eq_ignore_case(c)))
}
