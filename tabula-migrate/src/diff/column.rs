//! Column differencing.

use tabula_schema::{AutoIncrement, ColumnSchema, Ident, PrimaryKeySchema};
use tracing::debug;

use super::sequence::{SequenceLedger, backing_sequence};
use crate::compare::defaults_equal;
use crate::dialect::DialectCapabilities;
use crate::error::{PlanResult, PlanningError};
use crate::operation::Operation;

/// Result of comparing one column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnChanges {
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    /// The column was missing and the dialect cannot add columns.
    pub skipped: bool,
}

/// Compares desired columns of one table against their actual counterparts.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDiffer<'a> {
    capabilities: &'a dyn DialectCapabilities,
    table: &'a Ident,
    desired_pk: Option<&'a PrimaryKeySchema>,
    actual_pk: Option<&'a PrimaryKeySchema>,
}

impl<'a> ColumnDiffer<'a> {
    /// Create a differ for one table.
    pub fn new(
        capabilities: &'a dyn DialectCapabilities,
        table: &'a Ident,
        desired_pk: Option<&'a PrimaryKeySchema>,
        actual_pk: Option<&'a PrimaryKeySchema>,
    ) -> Self {
        Self {
            capabilities,
            table,
            desired_pk,
            actual_pk,
        }
    }

    /// Compare a desired column with the actual one, if it exists.
    pub fn diff(
        &self,
        desired: &ColumnSchema,
        actual: Option<&ColumnSchema>,
        ledger: &mut SequenceLedger,
    ) -> PlanResult<ColumnChanges> {
        let mut changes = ColumnChanges::default();

        let Some(actual) = actual else {
            if !self.capabilities.supports_add_column() {
                debug!(
                    table = %self.table,
                    column = %desired.name,
                    dialect = self.capabilities.name(),
                    "dialect cannot add columns, skipping"
                );
                changes.skipped = true;
                return Ok(changes);
            }

            if let Some(seq) = backing_sequence(self.capabilities, self.table, desired) {
                ledger.ensure(&seq, &mut changes.operations);
            }
            // Uniqueness is handled by the index differ.
            let mut column = desired.clone();
            column.unique = false;
            changes.operations.push(Operation::CreateColumn {
                table: self.table.clone(),
                column,
            });
            return Ok(changes);
        };

        let ops = &mut changes.operations;

        if desired.column_type != actual.column_type {
            if !self.capabilities.supports_alter_column_type() {
                return Err(PlanningError::unsupported(
                    self.capabilities.name(),
                    format!(
                        "changing the type of column `{}` from {} to {}",
                        desired.name, actual.column_type, desired.column_type
                    ),
                    Some(self.table.as_str()),
                ));
            }
            ops.push(Operation::AlterColumnType {
                table: self.table.clone(),
                column: desired.name.clone(),
                from: actual.column_type.clone(),
                to: desired.column_type.clone(),
            });
        }

        let desired_nullable = desired.nullable && !in_key(self.desired_pk, &desired.name);
        let actual_nullable = actual.nullable && !in_key(self.actual_pk, &actual.name);
        if desired_nullable != actual_nullable {
            ops.push(Operation::AlterColumnNullability {
                table: self.table.clone(),
                column: desired.name.clone(),
                column_type: desired.column_type.clone(),
                nullable: desired_nullable,
            });
        }

        self.diff_auto_increment(desired, actual, ledger, ops);

        // Autoincrement columns own their default.
        if desired.auto_increment.is_none() {
            let actual_default = if actual.auto_increment.is_some() {
                None
            } else {
                actual.default.as_ref()
            };
            if !defaults_equal(self.capabilities, desired.default.as_ref(), actual_default) {
                ops.push(Operation::AlterColumnDefault {
                    table: self.table.clone(),
                    column: desired.name.clone(),
                    default: desired.default.clone(),
                });
            }
        }

        Ok(changes)
    }

    /// Autoincrement transitions.
    ///
    /// Any sequence a column starts to reference is created before the
    /// column is altered; a sequence it stops referencing is dropped after.
    fn diff_auto_increment(
        &self,
        desired: &ColumnSchema,
        actual: &ColumnSchema,
        ledger: &mut SequenceLedger,
        ops: &mut Vec<Operation>,
    ) {
        let caps = self.capabilities;
        let desired_seq = backing_sequence(caps, self.table, desired);
        let actual_seq = backing_sequence(caps, self.table, actual);

        match (&desired.auto_increment, &actual.auto_increment) {
            (None, None) => {}

            (Some(auto), None) => {
                if let Some(seq) = &desired_seq {
                    ledger.ensure(seq, ops);
                }
                ops.push(self.add_auto_increment(desired, auto, desired_seq.as_ref()));
            }

            (None, Some(previous)) => {
                ops.push(Operation::DropAutoIncrement {
                    table: self.table.clone(),
                    column: desired.name.clone(),
                    column_type: desired.column_type.clone(),
                    sequence: actual_seq.as_ref().map(|s| s.name.clone()),
                });
                // Named sequences may outlive the column; implicit ones are
                // orphaned now.
                if matches!(previous, AutoIncrement::Implicit)
                    && let Some(seq) = &actual_seq
                {
                    ledger.drop_sequence(&seq.name, ops);
                }
            }

            (Some(auto), Some(previous)) => {
                let same = match (&desired_seq, &actual_seq) {
                    (Some(d), Some(a)) => d.name.eq_ignore_case(&a.name),
                    (None, None) => true,
                    _ => false,
                };
                if same {
                    return;
                }

                match (previous, &actual_seq, &desired_seq) {
                    // Named to named: keep the counter when the target is free.
                    (AutoIncrement::Sequence(_), Some(from), Some(to))
                        if matches!(auto, AutoIncrement::Sequence(_)) && !ledger.contains(&to.name) =>
                    {
                        ledger.rename(&from.name, &to.name, ops);
                        ops.push(self.add_auto_increment(desired, auto, Some(to)));
                    }
                    _ => {
                        if let Some(seq) = &desired_seq {
                            ledger.ensure(seq, ops);
                        }
                        ops.push(self.add_auto_increment(desired, auto, desired_seq.as_ref()));
                        if matches!(previous, AutoIncrement::Implicit)
                            && let Some(seq) = &actual_seq
                        {
                            ledger.drop_sequence(&seq.name, ops);
                        }
                    }
                }
            }
        }
    }

    fn add_auto_increment(
        &self,
        column: &ColumnSchema,
        auto: &AutoIncrement,
        sequence: Option<&tabula_schema::Sequence>,
    ) -> Operation {
        Operation::AddAutoIncrement {
            table: self.table.clone(),
            column: column.name.clone(),
            column_type: column.column_type.clone(),
            auto_increment: auto.clone(),
            sequence: sequence.map(|s| s.name.clone()),
        }
    }
}

fn in_key(pk: Option<&PrimaryKeySchema>, column: &Ident) -> bool {
    pk.is_some_and(|pk| pk.columns.iter().any(|c| c.eq_ignore_case(column)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::CapabilityTable;
    use pretty_assertions::assert_eq;
    use tabula_schema::{ColumnType, DefaultValue, Sequence};

    fn run(
        caps: &CapabilityTable,
        desired: &ColumnSchema,
        actual: Option<&ColumnSchema>,
    ) -> PlanResult<ColumnChanges> {
        let table = Ident::new("t");
        let mut ledger = SequenceLedger::new();
        if let Some(actual) = actual
            && let Some(seq) = backing_sequence(caps, &table, actual)
        {
            ledger.insert(&seq.name);
        }
        ColumnDiffer::new(caps, &table, None, None).diff(desired, actual, &mut ledger)
    }

    fn kinds(changes: &ColumnChanges) -> Vec<&'static str> {
        changes.operations.iter().map(Operation::kind).collect()
    }

    #[test]
    fn test_identical_columns() {
        let col = ColumnSchema::new("a", ColumnType::Integer).default_value(DefaultValue::int(0));
        let changes = run(&CapabilityTable::h2(), &col, Some(&col)).unwrap();
        assert!(changes.operations.is_empty());
    }

    #[test]
    fn test_missing_column_is_created() {
        let col = ColumnSchema::new("name", ColumnType::Text).nullable().unique();
        let changes = run(&CapabilityTable::h2(), &col, None).unwrap();

        assert_eq!(kinds(&changes), vec!["create_column"]);
        let Operation::CreateColumn { column, .. } = &changes.operations[0] else {
            panic!("expected create column");
        };
        assert!(!column.unique);
    }

    #[test]
    fn test_missing_column_skipped_without_add_column() {
        let caps = CapabilityTable::h2().add_column(false);
        let col = ColumnSchema::new("name", ColumnType::Text);
        let changes = run(&caps, &col, None).unwrap();

        assert!(changes.skipped);
        assert!(changes.operations.is_empty());
    }

    #[test]
    fn test_type_change() {
        let desired = ColumnSchema::new("a", ColumnType::BigInt);
        let actual = ColumnSchema::new("a", ColumnType::Integer);
        let changes = run(&CapabilityTable::h2(), &desired, Some(&actual)).unwrap();
        assert_eq!(kinds(&changes), vec!["alter_column_type"]);
    }

    #[test]
    fn test_type_change_unsupported() {
        let desired = ColumnSchema::new("a", ColumnType::Varchar(Some(64)));
        let actual = ColumnSchema::new("a", ColumnType::Varchar(Some(32)));
        let err = run(&CapabilityTable::sqlite(), &desired, Some(&actual)).unwrap_err();
        assert!(matches!(err, PlanningError::UnsupportedByDialect { .. }));
    }

    #[test]
    fn test_nullability_change() {
        let desired = ColumnSchema::new("a", ColumnType::Integer);
        let actual = ColumnSchema::new("a", ColumnType::Integer).nullable();
        let changes = run(&CapabilityTable::h2(), &desired, Some(&actual)).unwrap();

        assert_eq!(
            changes.operations,
            vec![Operation::AlterColumnNullability {
                table: Ident::new("t"),
                column: Ident::new("a"),
                column_type: ColumnType::Integer,
                nullable: false,
            }]
        );
    }

    #[test]
    fn test_primary_key_column_is_not_null() {
        let caps = CapabilityTable::h2();
        let table = Ident::new("t");
        let pk = PrimaryKeySchema::new(["a"]);
        let desired = ColumnSchema::new("a", ColumnType::Integer).nullable();
        let actual = ColumnSchema::new("a", ColumnType::Integer);

        let changes = ColumnDiffer::new(&caps, &table, Some(&pk), Some(&pk))
            .diff(&desired, Some(&actual), &mut SequenceLedger::new())
            .unwrap();
        assert!(changes.operations.is_empty());
    }

    #[test]
    fn test_whitespace_default_differs_from_empty() {
        let desired = ColumnSchema::new("s", ColumnType::Text).default_value(DefaultValue::string(""));
        let actual = ColumnSchema::new("s", ColumnType::Text).default_value(DefaultValue::string(" "));
        let changes = run(&CapabilityTable::h2(), &desired, Some(&actual)).unwrap();
        assert_eq!(kinds(&changes), vec!["alter_column_default"]);
    }

    #[test]
    fn test_plain_to_named_sequence() {
        let desired = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("id_seq"));
        let actual = ColumnSchema::new("id", ColumnType::BigInt);
        let changes = run(&CapabilityTable::h2(), &desired, Some(&actual)).unwrap();
        assert_eq!(kinds(&changes), vec!["create_sequence", "add_auto_increment"]);
    }

    #[test]
    fn test_plain_to_implicit_on_h2_needs_no_sequence() {
        let desired = ColumnSchema::new("id", ColumnType::BigInt).auto_increment();
        let actual = ColumnSchema::new("id", ColumnType::BigInt);
        let changes = run(&CapabilityTable::h2(), &desired, Some(&actual)).unwrap();
        assert_eq!(kinds(&changes), vec!["add_auto_increment"]);
    }

    #[test]
    fn test_implicit_to_plain_drops_orphan_sequence() {
        let desired = ColumnSchema::new("id", ColumnType::BigInt);
        let actual = ColumnSchema::new("id", ColumnType::BigInt).auto_increment();
        let changes = run(&CapabilityTable::postgres(), &desired, Some(&actual)).unwrap();
        assert_eq!(kinds(&changes), vec!["drop_auto_increment", "drop_sequence"]);
    }

    #[test]
    fn test_named_to_plain_keeps_sequence() {
        let desired = ColumnSchema::new("id", ColumnType::BigInt);
        let actual = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("s"));
        let changes = run(&CapabilityTable::postgres(), &desired, Some(&actual)).unwrap();
        assert_eq!(kinds(&changes), vec!["drop_auto_increment"]);
    }

    #[test]
    fn test_implicit_to_named() {
        let desired = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("custom"));
        let actual = ColumnSchema::new("id", ColumnType::BigInt).auto_increment();
        let changes = run(&CapabilityTable::postgres(), &desired, Some(&actual)).unwrap();
        assert_eq!(
            kinds(&changes),
            vec!["create_sequence", "add_auto_increment", "drop_sequence"]
        );
    }

    #[test]
    fn test_named_to_named_renames() {
        let desired = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("new_seq"));
        let actual = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("old_seq"));
        let changes = run(&CapabilityTable::h2(), &desired, Some(&actual)).unwrap();
        assert_eq!(kinds(&changes), vec!["rename_sequence", "add_auto_increment"]);
    }

    #[test]
    fn test_named_to_existing_named_repoints() {
        let caps = CapabilityTable::h2();
        let table = Ident::new("t");
        let desired = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("shared"));
        let actual = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("old_seq"));
        let mut ledger = SequenceLedger::new();
        ledger.insert(&Ident::new("old_seq"));
        ledger.insert(&Ident::new("shared"));

        let changes = ColumnDiffer::new(&caps, &table, None, None)
            .diff(&desired, Some(&actual), &mut ledger)
            .unwrap();
        assert_eq!(kinds(&changes), vec!["add_auto_increment"]);
        assert!(ledger.contains(&Ident::new("old_seq")));
    }

    #[test]
    fn test_auto_increment_unchanged() {
        let col = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("S"));
        let other = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("s"));
        let changes = run(&CapabilityTable::h2(), &col, Some(&other)).unwrap();
        assert!(changes.operations.is_empty());
    }
}
