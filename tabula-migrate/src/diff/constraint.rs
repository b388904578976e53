//! Primary key and foreign key differencing.

use smol_str::SmolStr;
use tabula_schema::{ForeignKeySchema, Ident, PrimaryKeySchema};

use crate::dialect::DialectCapabilities;
use crate::operation::Operation;

/// Primary key operations for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryKeyChanges {
    /// Drop of the existing key.
    pub drop: Option<Operation>,
    /// Addition of the desired key.
    pub add: Option<Operation>,
}

/// Compare primary keys. Column order matters, the name does not.
pub fn diff_primary_key(
    capabilities: &dyn DialectCapabilities,
    table: &Ident,
    desired: Option<&PrimaryKeySchema>,
    actual: Option<&PrimaryKeySchema>,
) -> PrimaryKeyChanges {
    let same = match (desired, actual) {
        (Some(d), Some(a)) => folded(capabilities, &d.columns) == folded(capabilities, &a.columns),
        (None, None) => true,
        _ => false,
    };
    if same {
        return PrimaryKeyChanges::default();
    }

    PrimaryKeyChanges {
        drop: actual.map(|pk| Operation::DropPrimaryKey {
            table: table.clone(),
            primary_key: pk.clone(),
        }),
        add: desired.map(|pk| Operation::AddPrimaryKey {
            table: table.clone(),
            primary_key: pk.clone(),
        }),
    }
}

/// Identity of a foreign key: local columns, referenced table, referenced
/// columns, all in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyKey {
    /// Local columns.
    pub columns: Vec<SmolStr>,
    /// Referenced table.
    pub referenced_table: SmolStr,
    /// Referenced columns.
    pub referenced_columns: Vec<SmolStr>,
}

impl ForeignKeyKey {
    /// Compute the key of a foreign key for a dialect.
    pub fn of(capabilities: &dyn DialectCapabilities, fk: &ForeignKeySchema) -> Self {
        Self {
            columns: fk.columns().map(|c| capabilities.fold(c)).collect(),
            referenced_table: fk
                .referenced_table()
                .map(|t| capabilities.fold(t))
                .unwrap_or_default(),
            referenced_columns: fk.referenced_columns().map(|c| capabilities.fold(c)).collect(),
        }
    }
}

/// Foreign key operations for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignKeyChanges {
    /// `DropForeignKey` operations.
    pub drops: Vec<Operation>,
    /// `AddForeignKey` operations.
    pub adds: Vec<Operation>,
}

/// Compare foreign keys.
///
/// A key present on both sides with different referential actions is
/// dropped and re-added.
pub fn diff_foreign_keys(
    capabilities: &dyn DialectCapabilities,
    table: &Ident,
    desired: &[ForeignKeySchema],
    actual: &[ForeignKeySchema],
) -> ForeignKeyChanges {
    let desired_keys: Vec<ForeignKeyKey> = desired.iter().map(|fk| ForeignKeyKey::of(capabilities, fk)).collect();
    let actual_keys: Vec<ForeignKeyKey> = actual.iter().map(|fk| ForeignKeyKey::of(capabilities, fk)).collect();
    let mut changes = ForeignKeyChanges::default();

    for (fk, key) in actual.iter().zip(&actual_keys) {
        let keep = desired
            .iter()
            .zip(&desired_keys)
            .any(|(d, k)| k == key && same_actions(d, fk));
        if !keep {
            changes.drops.push(Operation::DropForeignKey {
                table: table.clone(),
                foreign_key: fk.clone(),
            });
        }
    }

    for (fk, key) in desired.iter().zip(&desired_keys) {
        let present = actual
            .iter()
            .zip(&actual_keys)
            .any(|(a, k)| k == key && same_actions(fk, a));
        if !present {
            changes.adds.push(Operation::AddForeignKey {
                table: table.clone(),
                foreign_key: fk.clone(),
            });
        }
    }

    changes
}

fn same_actions(a: &ForeignKeySchema, b: &ForeignKeySchema) -> bool {
    a.on_delete == b.on_delete && a.on_update == b.on_update
}

fn folded(capabilities: &dyn DialectCapabilities, columns: &[Ident]) -> Vec<SmolStr> {
    columns.iter().map(|c| capabilities.fold(c)).collect()
}
