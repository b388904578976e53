//! Sequence differencing.
//!
//! Sequences are matched by name only. An existing sequence is never
//! altered, even when its parameters differ from the declaration.

use std::collections::HashSet;

use smol_str::SmolStr;
use tabula_schema::{AutoIncrement, ColumnSchema, Ident, Schema, Sequence};
use tracing::debug;

use crate::dialect::DialectCapabilities;
use crate::operation::Operation;

/// Compare one sequence by name.
pub fn diff_sequence(desired: Option<&Sequence>, actual: Option<&Sequence>) -> Option<Operation> {
    match (desired, actual) {
        (Some(seq), None) => Some(Operation::CreateSequence {
            sequence: seq.clone(),
        }),
        (None, Some(seq)) => Some(Operation::DropSequence {
            name: seq.name.clone(),
        }),
        (Some(d), Some(a)) => {
            if d != a {
                debug!(sequence = %d.name, "sequence parameters differ, leaving as is");
            }
            None
        }
        (None, None) => None,
    }
}

/// The sequence an autoincrement column draws from, if the dialect uses
/// one.
///
/// Explicit sequences are returned as declared. Implicit ones only exist as
/// separate objects when the dialect needs a sequence for autoincrement.
pub fn backing_sequence(
    capabilities: &dyn DialectCapabilities,
    table: &Ident,
    column: &ColumnSchema,
) -> Option<Sequence> {
    match column.auto_increment.as_ref()? {
        AutoIncrement::Sequence(seq) => Some(seq.clone()),
        AutoIncrement::Implicit if capabilities.needs_sequence_for_auto_increment() => Some(
            Sequence::new(capabilities.implicit_sequence_name(table, &column.name)),
        ),
        AutoIncrement::Implicit => None,
    }
}

/// Sequences known to exist at the current point of a plan.
///
/// Seeded from the actual schema and updated as the plan creates, renames
/// and drops sequences.
#[derive(Debug, Clone, Default)]
pub struct SequenceLedger {
    known: HashSet<SmolStr>,
}

impl SequenceLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger from the actual schema: standalone sequences plus those
    /// bound to autoincrement columns.
    pub fn from_actual(capabilities: &dyn DialectCapabilities, actual: &Schema) -> Self {
        let mut ledger = Self::new();
        for seq in actual.sequences.values() {
            ledger.insert(&seq.name);
        }
        for table in actual.tables() {
            for column in &table.columns {
                if let Some(seq) = backing_sequence(capabilities, &table.name, column) {
                    ledger.insert(&seq.name);
                }
            }
        }
        ledger
    }

    /// Whether a sequence exists.
    pub fn contains(&self, name: &Ident) -> bool {
        self.known.contains(&name.case_key())
    }

    /// Record a sequence as existing.
    pub fn insert(&mut self, name: &Ident) {
        self.known.insert(name.case_key());
    }

    /// Record a sequence as gone.
    pub fn remove(&mut self, name: &Ident) {
        self.known.remove(&name.case_key());
    }

    /// Emit `CreateSequence` unless the sequence already exists.
    pub fn ensure(&mut self, sequence: &Sequence, ops: &mut Vec<Operation>) {
        if !self.contains(&sequence.name) {
            self.insert(&sequence.name);
            ops.push(Operation::CreateSequence {
                sequence: sequence.clone(),
            });
        }
    }

    /// Emit `DropSequence` if the sequence exists.
    pub fn drop_sequence(&mut self, name: &Ident, ops: &mut Vec<Operation>) {
        if self.contains(name) {
            self.remove(name);
            ops.push(Operation::DropSequence { name: name.clone() });
        }
    }

    /// Emit `RenameSequence` and move the ledger entry.
    pub fn rename(&mut self, from: &Ident, to: &Ident, ops: &mut Vec<Operation>) {
        self.remove(from);
        self.insert(to);
        ops.push(Operation::RenameSequence {
            from: from.clone(),
            to: to.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::CapabilityTable;
    use tabula_schema::{ColumnType, TableSchema};

    #[test]
    fn test_diff_sequence_create_drop_noop() {
        let seq = Sequence::new("s");
        assert!(matches!(
            diff_sequence(Some(&seq), None),
            Some(Operation::CreateSequence { .. })
        ));
        assert!(matches!(
            diff_sequence(None, Some(&seq)),
            Some(Operation::DropSequence { .. })
        ));
        assert!(diff_sequence(Some(&seq), Some(&seq)).is_none());
        assert!(diff_sequence(None, None).is_none());
    }

    #[test]
    fn test_parameter_drift_is_not_corrected() {
        let desired = Sequence::new("s").start_with(100);
        let actual = Sequence::new("s").start_with(1).increment_by(2);
        assert!(diff_sequence(Some(&desired), Some(&actual)).is_none());
    }

    #[test]
    fn test_backing_sequence_depends_on_dialect() {
        let table = Ident::new("users");
        let column = ColumnSchema::new("id", ColumnType::BigInt).auto_increment();

        let pg = backing_sequence(&CapabilityTable::postgres(), &table, &column);
        assert_eq!(pg.map(|s| s.name.to_string()).as_deref(), Some("users_id_seq"));
        assert!(backing_sequence(&CapabilityTable::h2(), &table, &column).is_none());

        let named = ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("id_seq"));
        let h2 = backing_sequence(&CapabilityTable::h2(), &table, &named);
        assert_eq!(h2.map(|s| s.name.to_string()).as_deref(), Some("id_seq"));
    }

    #[test]
    fn test_ledger_from_actual() {
        let table = TableSchema::builder("users")
            .column(ColumnSchema::new("id", ColumnType::BigInt).auto_increment())
            .build()
            .unwrap();
        let actual = Schema::new()
            .with_table(table)
            .with_sequence(Sequence::new("orphan"));

        let ledger = SequenceLedger::from_actual(&CapabilityTable::postgres(), &actual);
        assert!(ledger.contains(&Ident::new("orphan")));
        assert!(ledger.contains(&Ident::new("USERS_ID_SEQ")));
        assert!(!ledger.contains(&Ident::new("other")));
    }

    #[test]
    fn test_ledger_ensure_is_idempotent() {
        let mut ledger = SequenceLedger::new();
        let mut ops = Vec::new();
        let seq = Sequence::new("s");

        ledger.ensure(&seq, &mut ops);
        ledger.ensure(&seq, &mut ops);
        assert_eq!(ops.len(), 1);

        ledger.rename(&Ident::new("s"), &Ident::new("t"), &mut ops);
        assert!(!ledger.contains(&Ident::new("s")));
        assert!(ledger.contains(&Ident::new("t")));
    }
}
