//! Index differencing.
//!
//! Indexes are matched structurally. Names never take part in the
//! comparison, so a generated name on one side and a hand-picked one on the
//! other do not cause a drop and re-create.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tabula_schema::{ColumnSchema, Ident, IndexPart, IndexSchema, IndexType, TableSchema};

use crate::dialect::DialectCapabilities;
use crate::operation::Operation;

/// Equivalence key of an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    /// Sorted column identities and expression texts.
    pub parts: Vec<SmolStr>,
    /// Uniqueness.
    pub unique: bool,
    /// Canonical filter predicate.
    pub filter: Option<String>,
    /// Access method, when the dialect preserves it.
    pub index_type: Option<IndexType>,
}

impl IndexKey {
    /// Compute the key of an index for a dialect.
    pub fn of(capabilities: &dyn DialectCapabilities, index: &IndexSchema) -> Self {
        let mut parts: Vec<SmolStr> = index
            .parts
            .iter()
            .map(|part| match part {
                IndexPart::Column(column) => {
                    SmolStr::new(format!("c:{}", capabilities.fold(column)))
                }
                IndexPart::Expression(expr) => {
                    SmolStr::new(format!("e:{}", capabilities.canonical_expression(expr)))
                }
            })
            .collect();
        parts.sort();

        let index_type = if capabilities.preserves_index_type() {
            Some(index.index_type.clone().unwrap_or(IndexType::BTree))
        } else {
            None
        };

        Self {
            parts,
            unique: index.unique,
            filter: index
                .filter
                .as_ref()
                .map(|f| capabilities.canonical_expression(f)),
            index_type,
        }
    }
}

/// Indexes of a table as seen by the differ: declared indexes plus one
/// unnamed unique index per `unique` column.
pub fn effective_indexes(table: &TableSchema) -> Vec<IndexSchema> {
    let mut indexes = table.indexes.clone();
    indexes.extend(table.columns.iter().filter(|c| c.unique).map(lifted_unique));
    indexes
}

fn lifted_unique(column: &ColumnSchema) -> IndexSchema {
    IndexSchema::unique_on([column.name.clone()])
}

/// Index operations for one table, drops first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexChanges {
    /// `DropIndex` operations.
    pub drops: Vec<Operation>,
    /// `CreateIndex` operations.
    pub creates: Vec<Operation>,
}

impl IndexChanges {
    /// Whether nothing changes.
    pub fn is_empty(&self) -> bool {
        self.drops.is_empty() && self.creates.is_empty()
    }
}

/// Compare desired and actual index sets of one table.
pub fn diff_indexes(
    capabilities: &dyn DialectCapabilities,
    table: &Ident,
    desired: &[IndexSchema],
    actual: &[IndexSchema],
) -> IndexChanges {
    let desired = keyed(capabilities, desired);
    let actual = keyed(capabilities, actual);
    let mut changes = IndexChanges::default();

    for (key, index) in &actual {
        if !desired.contains_key(key) {
            changes.drops.push(Operation::DropIndex {
                table: table.clone(),
                index: (*index).clone(),
            });
        }
    }
    for (key, index) in &desired {
        if !actual.contains_key(key) {
            changes.creates.push(Operation::CreateIndex {
                table: table.clone(),
                index: (*index).clone(),
            });
        }
    }
    changes
}

fn keyed<'a>(
    capabilities: &dyn DialectCapabilities,
    indexes: &'a [IndexSchema],
) -> IndexMap<IndexKey, &'a IndexSchema> {
    let mut out = IndexMap::new();
    for index in indexes {
        out.entry(IndexKey::of(capabilities, index)).or_insert(index);
    }
    out
}
