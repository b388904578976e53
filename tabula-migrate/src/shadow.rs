//! Shadow schema for plan verification.
//!
//! A shadow schema is an in-memory copy of the actual schema that logical
//! operations can be applied to. Planning the desired schema again against
//! the shadow must produce an empty plan; anything left over is drift and
//! points at an operation the planner emitted incorrectly or not at all.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabula_migrate::shadow::{ShadowSchema, verify_plan};
//!
//! let plan = planner.plan(&desired, &actual)?;
//! let drift = verify_plan(&planner, &desired, &actual, &plan)?;
//! assert!(drift.is_empty());
//! ```

use tabula_schema::{AutoIncrement, ColumnSchema, Ident, IndexSchema, Schema, TableSchema};
use tracing::trace;

use crate::error::{PlanResult, PlanningError};
use crate::operation::{MigrationPlan, Operation};
use crate::planner::MigrationPlanner;

/// An in-memory schema that operations are applied to.
#[derive(Debug, Clone, Default)]
pub struct ShadowSchema {
    schema: Schema,
}

impl ShadowSchema {
    /// Start from a copy of a schema.
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// Current state.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Consume the shadow and return its state.
    pub fn into_schema(self) -> Schema {
        self.schema
    }

    /// Apply every operation of a plan in order.
    pub fn apply_plan(&mut self, plan: &MigrationPlan) -> PlanResult<()> {
        for op in plan {
            self.apply(op)?;
        }
        Ok(())
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: &Operation) -> PlanResult<()> {
        trace!(operation = %op, "applying to shadow");

        match op {
            Operation::CreateTable { table } => {
                if self.schema.table(&table.name).is_some() {
                    return Err(PlanningError::snapshot(format!("table {} already exists", table.name)));
                }
                self.schema.insert_table(table.clone());
            }

            Operation::CreateColumn { table, column } => {
                let target = self.table_mut(table)?;
                if target.has_column(&column.name) {
                    return Err(PlanningError::snapshot(format!(
                        "column {}.{} already exists",
                        table, column.name
                    )));
                }
                target.columns.push(column.clone());
            }

            Operation::DropColumn { table, column } => {
                let target = self.table_mut(table)?;
                target.columns.retain(|c| !c.name.eq_ignore_case(column));
            }

            Operation::AlterColumnType { table, column, to, .. } => {
                self.column_mut(table, column)?.column_type = to.clone();
            }

            Operation::AlterColumnNullability {
                table,
                column,
                nullable,
                ..
            } => {
                self.column_mut(table, column)?.nullable = *nullable;
            }

            Operation::AlterColumnDefault {
                table,
                column,
                default,
            } => {
                self.column_mut(table, column)?.default = default.clone();
            }

            Operation::AddAutoIncrement {
                table,
                column,
                auto_increment,
                ..
            } => {
                let target = self.column_mut(table, column)?;
                target.auto_increment = Some(auto_increment.clone());
                target.default = None;
            }

            Operation::DropAutoIncrement { table, column, .. } => {
                let target = self.column_mut(table, column)?;
                target.auto_increment = None;
                target.default = None;
            }

            Operation::CreateSequence { sequence } => {
                self.schema.insert_sequence(sequence.clone());
            }

            Operation::DropSequence { name } => {
                self.schema.remove_sequence(name);
            }

            Operation::RenameSequence { from, to } => {
                if let Some(mut sequence) = self.schema.remove_sequence(from) {
                    sequence.name = to.clone();
                    self.schema.insert_sequence(sequence);
                }
                for table in self.schema.tables.values_mut() {
                    for column in &mut table.columns {
                        if let Some(AutoIncrement::Sequence(seq)) = &mut column.auto_increment
                            && seq.name.eq_ignore_case(from)
                        {
                            seq.name = to.clone();
                        }
                    }
                }
            }

            Operation::CreateIndex { table, index } => {
                self.table_mut(table)?.indexes.push(index.clone());
            }

            Operation::DropIndex { table, index } => {
                let target = self.table_mut(table)?;
                if let Some(pos) = target.indexes.iter().position(|i| i == index) {
                    target.indexes.remove(pos);
                } else if let Some(column) = lifted_column(target, index) {
                    column.unique = false;
                } else {
                    return Err(PlanningError::snapshot(format!("no such index on {}", table)));
                }
            }

            Operation::AddPrimaryKey { table, primary_key } => {
                self.table_mut(table)?.primary_key = Some(primary_key.clone());
            }

            Operation::DropPrimaryKey { table, .. } => {
                self.table_mut(table)?.primary_key = None;
            }

            Operation::AddForeignKey { table, foreign_key } => {
                self.table_mut(table)?.foreign_keys.push(foreign_key.clone());
            }

            Operation::DropForeignKey { table, foreign_key } => {
                let target = self.table_mut(table)?;
                let Some(pos) = target.foreign_keys.iter().position(|fk| fk == foreign_key) else {
                    return Err(PlanningError::snapshot(format!("no such foreign key on {}", table)));
                };
                target.foreign_keys.remove(pos);
            }
        }

        Ok(())
    }

    fn table_mut(&mut self, name: &Ident) -> PlanResult<&mut TableSchema> {
        self.schema
            .table_mut(name)
            .ok_or_else(|| PlanningError::snapshot(format!("unknown table {}", name)))
    }

    fn column_mut(
        &mut self,
        table: &Ident,
        column: &Ident,
    ) -> PlanResult<&mut ColumnSchema> {
        self.table_mut(table)?
            .columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_case(column))
            .ok_or_else(|| PlanningError::snapshot(format!("unknown column {}.{}", table, column)))
    }
}

/// The column whose `unique` flag an unnamed single-column unique index
/// stands for.
fn lifted_column<'a>(
    table: &'a mut TableSchema,
    index: &IndexSchema,
) -> Option<&'a mut ColumnSchema> {
    if !index.unique || index.name.is_some() || index.parts.len() != 1 {
        return None;
    }
    let name = index.parts[0].as_column()?.clone();
    table
        .columns
        .iter_mut()
        .find(|c| c.unique && c.name.eq_ignore_case(&name))
}

/// Apply `plan` to a shadow copy of `actual` and plan `desired` again.
///
/// Returns the residual plan, empty when `plan` fully reconciles the two.
pub fn verify_plan(
    planner: &MigrationPlanner,
    desired: &Schema,
    actual: &Schema,
    plan: &MigrationPlan,
) -> PlanResult<MigrationPlan> {
    let mut shadow = ShadowSchema::new(actual.clone());
    shadow.apply_plan(plan)?;
    planner.plan_unverified(desired, shadow.schema())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use pretty_assertions::assert_eq;
    use tabula_schema::{ColumnType, DefaultValue, PrimaryKeySchema, Sequence};

    fn users() -> TableSchema {
        TableSchema::builder("users")
            .column(ColumnSchema::new("id", ColumnType::BigInt))
            .column(ColumnSchema::new("email", ColumnType::Varchar(Some(255))))
            .build()
            .unwrap()
    }

    #[test]
    fn test_apply_unknown_table_fails() {
        let mut shadow = ShadowSchema::default();
        let err = shadow
            .apply(&Operation::AddPrimaryKey {
                table: Ident::new("missing"),
                primary_key: PrimaryKeySchema::new(["id"]),
            })
            .unwrap_err();
        assert!(matches!(err, PlanningError::Snapshot(_)));
    }

    #[test]
    fn test_apply_column_changes() {
        let mut shadow = ShadowSchema::new(Schema::new().with_table(users()));
        let table = Ident::new("users");

        shadow
            .apply(&Operation::CreateColumn {
                table: table.clone(),
                column: ColumnSchema::new("name", ColumnType::Text).nullable(),
            })
            .unwrap();
        shadow
            .apply(&Operation::AlterColumnDefault {
                table: table.clone(),
                column: Ident::new("NAME"),
                default: Some(DefaultValue::string("anon")),
            })
            .unwrap();

        let column = shadow.schema().table(&table).unwrap().column(&Ident::new("name")).unwrap();
        assert_eq!(column.default, Some(DefaultValue::string("anon")));
    }

    #[test]
    fn test_rename_sequence_follows_columns() {
        let table = TableSchema::builder("t")
            .column(ColumnSchema::new("id", ColumnType::BigInt).auto_increment_with(Sequence::new("old_seq")))
            .build()
            .unwrap();
        let mut shadow = ShadowSchema::new(Schema::new().with_table(table));
        shadow
            .apply(&Operation::RenameSequence {
                from: Ident::new("old_seq"),
                to: Ident::new("new_seq"),
            })
            .unwrap();

        let column = &shadow.schema().table(&Ident::new("t")).unwrap().columns[0];
        let name = column.auto_increment.as_ref().and_then(|a| a.sequence_name()).unwrap();
        assert_eq!(name.as_str(), "new_seq");
    }

    #[test]
    fn test_drop_lifted_unique_index() {
        let table = TableSchema::builder("t")
            .column(ColumnSchema::new("email", ColumnType::Text).unique())
            .build()
            .unwrap();
        let mut shadow = ShadowSchema::new(Schema::new().with_table(table));
        shadow
            .apply(&Operation::DropIndex {
                table: Ident::new("t"),
                index: IndexSchema::unique_on(["email"]),
            })
            .unwrap();

        assert!(!shadow.schema().table(&Ident::new("t")).unwrap().columns[0].unique);
    }

    #[test]
    fn test_verify_plan_is_empty_after_changes() {
        let desired = TableSchema::builder("users")
            .column(ColumnSchema::new("id", ColumnType::BigInt).auto_increment())
            .column(ColumnSchema::new("email", ColumnType::Varchar(Some(320))).unique())
            .column(ColumnSchema::new("name", ColumnType::Text).nullable())
            .primary_key(PrimaryKeySchema::new(["id"]))
            .index(IndexSchema::on(["name"]).named("idx_users_name"))
            .build()
            .unwrap();
        let desired = Schema::new().with_table(desired);
        let actual = Schema::new().with_table(users());

        for dialect in [Dialect::H2, Dialect::Postgres, Dialect::MySql] {
            let planner = MigrationPlanner::for_dialect(dialect);
            let plan = planner.plan(&desired, &actual).unwrap();
            assert!(!plan.is_empty());

            let drift = verify_plan(&planner, &desired, &actual, &plan).unwrap();
            assert!(drift.is_empty(), "{dialect}: {}", drift.summary());
        }
    }
}
