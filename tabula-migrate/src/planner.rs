//! Migration planner.
//!
//! The planner compares two immutable snapshots and emits an ordered list
//! of logical operations. It performs no I/O of its own; reading the actual
//! schema goes through a [`MetadataReader`] and executing the plan is the
//! caller's job.
//!
//! Planning runs in four steps:
//!
//! 1. **Resolve**: validate the desired schema and adapt it to the dialect
//! 2. **Per-table diff**: run the differencers for every existing table
//! 3. **Cross-table ordering**: create missing tables parents first
//! 4. **Emit**: concatenate the phases into one plan
//!
//! Operations come out in this order: declared sequences, foreign key
//! drops, changes to existing tables, new tables, foreign key additions.

use std::sync::Arc;

use tabula_schema::{
    AutoIncrement, ForeignKeySchema, Ident, Schema, SchemaError, TableSchema, Validator,
};
use tracing::{debug, info, instrument, warn};

use crate::config::PlannerConfig;
use crate::diff::{SequenceLedger, backing_sequence, diff_sequence, diff_table};
use crate::dialect::{CapabilityTable, Dialect, DialectCapabilities};
use crate::error::{PlanResult, PlanningError};
use crate::introspect::{MetadataReader, read_snapshot};
use crate::operation::{MigrationPlan, Operation};
use crate::shadow::verify_plan;

/// Plans migrations for one target dialect.
#[derive(Debug, Clone)]
pub struct MigrationPlanner {
    capabilities: Arc<dyn DialectCapabilities>,
    config: PlannerConfig,
}

impl MigrationPlanner {
    /// Create a planner for the given capabilities.
    pub fn new(capabilities: impl DialectCapabilities + 'static) -> Self {
        Self {
            capabilities: Arc::new(capabilities),
            config: PlannerConfig::default(),
        }
    }

    /// Create a planner with the preset capabilities of a dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self::new(dialect.capabilities())
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the dialect capabilities.
    pub fn capabilities(&self) -> &dyn DialectCapabilities {
        self.capabilities.as_ref()
    }

    /// Get the configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan the operations that turn `actual` into `desired`.
    ///
    /// Tables present in `actual` but not in `desired` are left alone: the
    /// desired schema describes a batch of tables, not the whole database.
    #[instrument(skip_all, fields(dialect = self.capabilities.name(), tables = desired.tables.len()))]
    pub fn plan(&self, desired: &Schema, actual: &Schema) -> PlanResult<MigrationPlan> {
        let mut plan = self.plan_unverified(desired, actual)?;

        if self.config.verify_plans {
            let drift = self.verify(desired, actual, &plan)?;
            if drift.is_empty() {
                debug!("plan verified against shadow schema");
            } else {
                warn!(residual = drift.len(), "plan does not converge: {}", drift.summary());
                plan.warnings.push(format!(
                    "verification left {} operation(s) unapplied: {}",
                    drift.len(),
                    drift.summary()
                ));
            }
        }

        Ok(plan)
    }

    /// Plan a batch of tables against an actual schema.
    pub fn plan_tables(&self, desired: &[TableSchema], actual: &Schema) -> PlanResult<MigrationPlan> {
        let schema = desired
            .iter()
            .cloned()
            .fold(Schema::new(), Schema::with_table);
        self.plan(&schema, actual)
    }

    /// Read the actual schema through `reader`, then plan.
    ///
    /// Tables outside the batch that desired foreign keys point at are read
    /// too, so references to existing tables validate. A connectivity
    /// failure aborts planning.
    pub async fn plan_from_reader(
        &self,
        desired: &Schema,
        reader: &dyn MetadataReader,
    ) -> PlanResult<MigrationPlan> {
        let mut names: Vec<Ident> = desired.tables().map(|t| t.name.clone()).collect();
        for target in desired.tables().flat_map(TableSchema::referenced_tables) {
            if !names.iter().any(|n| n.eq_ignore_case(target)) {
                names.push(target.clone());
            }
        }
        let actual = read_snapshot(reader, &names).await?;
        self.plan(desired, &actual)
    }

    /// Apply `plan` to a shadow copy of `actual` and plan again.
    ///
    /// The returned plan is the drift; it is empty when the plan fully
    /// reconciles the two schemas.
    pub fn verify(
        &self,
        desired: &Schema,
        actual: &Schema,
        plan: &MigrationPlan,
    ) -> PlanResult<MigrationPlan> {
        verify_plan(self, desired, actual, plan)
    }

    /// Plan without the verification pass.
    pub(crate) fn plan_unverified(&self, desired: &Schema, actual: &Schema) -> PlanResult<MigrationPlan> {
        let caps = self.capabilities();
        let mut plan = MigrationPlan::new();

        // 1. Resolve.
        self.validate(desired, actual)?;
        let mut resolved = Vec::with_capacity(desired.tables.len());
        for table in desired.tables() {
            resolved.push(resolve_table(caps, table, &mut plan.warnings)?);
        }
        if !desired.sequences.is_empty() && !caps.supports_create_sequence() {
            return Err(PlanningError::unsupported(caps.name(), "sequences", None));
        }

        let mut ledger = SequenceLedger::from_actual(caps, actual);

        let mut sequence_ops = Vec::new();
        for sequence in desired.sequences.values() {
            if let Some(op) = diff_sequence(Some(sequence), actual.sequence(&sequence.name))
                && !ledger.contains(&sequence.name)
            {
                ledger.insert(&sequence.name);
                sequence_ops.push(op);
            }
        }

        let (existing, missing): (Vec<&TableSchema>, Vec<&TableSchema>) = resolved
            .iter()
            .partition(|t| actual.table(&t.name).is_some());
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|t| t.name()).collect();
            info!(tables = ?names, "tables missing from database");
            plan.missing_tables = missing.iter().map(|t| t.name.clone()).collect();
        }

        // 2. Per-table diff.
        let mut fk_drops = Vec::new();
        let mut table_ops = Vec::new();
        let mut fk_adds = Vec::new();
        for table in existing {
            let Some(current) = actual.table(&table.name) else {
                continue;
            };
            let changes = diff_table(caps, &self.config, table, current, &mut ledger)?;
            for column in &changes.skipped_columns {
                plan.warnings.push(format!(
                    "column {}.{} not added: {} cannot add columns",
                    table.name,
                    column,
                    caps.name()
                ));
            }
            fk_drops.extend(changes.foreign_key_drops);
            table_ops.extend(changes.operations);
            fk_adds.extend(changes.foreign_key_adds);
        }

        // 3. Cross-table ordering of new tables.
        let mut create_ops = Vec::new();
        for (table, deferred) in order_new_tables(&missing) {
            for column in &table.columns {
                if let Some(seq) = backing_sequence(caps, &table.name, column) {
                    ledger.ensure(&seq, &mut create_ops);
                }
            }
            let name = table.name.clone();
            create_ops.push(Operation::CreateTable { table });
            fk_adds.extend(deferred.into_iter().map(|foreign_key| Operation::AddForeignKey {
                table: name.clone(),
                foreign_key,
            }));
        }

        // 4. Emit.
        plan.operations = sequence_ops;
        plan.operations.extend(fk_drops);
        plan.operations.extend(table_ops);
        plan.operations.extend(create_ops);
        plan.operations.extend(fk_adds);

        debug!(operations = plan.len(), "planned {}", plan.summary());
        Ok(plan)
    }

    /// Structural validation of the desired schema. Foreign keys may point
    /// at desired tables or at tables that already exist.
    fn validate(&self, desired: &Schema, actual: &Schema) -> PlanResult<()> {
        let mut validator = Validator::new();
        let mut errors = Vec::new();

        for table in desired.tables() {
            if let Err(err) = validator.validate_table(table) {
                errors.push(err);
                continue;
            }
            let lookup = |name: &Ident| desired.table(name).or_else(|| actual.table(name));
            if let Err(err) = validator.validate_references(table, lookup) {
                errors.push(err);
            }
        }
        for sequence in desired.sequences.values() {
            if let Err(message) = sequence.check() {
                errors.push(SchemaError::invalid_sequence(sequence.name.as_str(), message));
            }
        }

        match SchemaError::from_many(errors) {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

impl Default for MigrationPlanner {
    fn default() -> Self {
        Self::new(CapabilityTable::default())
    }
}

/// Adapt a desired table to the dialect.
///
/// Non-unique partial or functional indexes the dialect cannot express are
/// dropped with a warning, since leaving them out changes no semantics.
/// Anything else the dialect lacks is an error.
pub fn resolve_table(
    capabilities: &dyn DialectCapabilities,
    table: &TableSchema,
    warnings: &mut Vec<String>,
) -> PlanResult<TableSchema> {
    let dialect = capabilities.name();
    let mut resolved = table.clone();

    for column in &table.columns {
        if !capabilities.supports_column_type(&column.column_type) {
            return Err(PlanningError::unsupported(
                dialect,
                format!("column type {} of `{}`", column.column_type, column.name),
                Some(table.name()),
            ));
        }
        if let Some(AutoIncrement::Sequence(seq)) = &column.auto_increment
            && !capabilities.supports_create_sequence()
        {
            return Err(PlanningError::unsupported(
                dialect,
                format!("sequence `{}` for column `{}`", seq.name, column.name),
                Some(table.name()),
            ));
        }
    }

    resolved.indexes.clear();
    for index in &table.indexes {
        let missing = if index.is_partial() && !capabilities.supports_partial_index() {
            Some("partial index")
        } else if index.is_functional() && !capabilities.supports_functional_index() {
            Some("functional index")
        } else {
            None
        };

        match missing {
            None => resolved.indexes.push(index.clone()),
            Some(feature) if index.unique => {
                return Err(PlanningError::unsupported(dialect, format!("unique {feature}"), Some(table.name())));
            }
            Some(feature) => {
                debug!(table = %table.name, feature, "dropping index the dialect cannot express");
                warnings.push(format!("{} on {} omitted: not supported by {}", feature, table.name, dialect));
            }
        }
    }

    Ok(resolved)
}

/// Order new tables so that referenced tables come first.
///
/// Ties keep input order. Tables caught in a reference cycle are created in
/// input order; their foreign keys to tables not created yet are returned
/// separately so they can be added once every table exists.
pub fn order_new_tables(tables: &[&TableSchema]) -> Vec<(TableSchema, Vec<ForeignKeySchema>)> {
    let mut remaining: Vec<&TableSchema> = tables.to_vec();
    let mut created: Vec<&TableSchema> = Vec::with_capacity(tables.len());
    let mut out = Vec::with_capacity(tables.len());

    let is_new = |name: &Ident| tables.iter().any(|t| t.name.eq_ignore_case(name));

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|t| {
            t.referenced_tables().into_iter().all(|dep| {
                !is_new(dep) || created.iter().any(|c| c.name.eq_ignore_case(dep))
            })
        });
        let index = ready.unwrap_or_else(|| {
            debug!(table = %remaining[0].name, "foreign key cycle, deferring constraints");
            0
        });
        let table = remaining.remove(index);

        let pending = |fk: &ForeignKeySchema| {
            fk.referenced_table().is_some_and(|target| {
                !target.eq_ignore_case(&table.name)
                    && is_new(target)
                    && !created.iter().any(|c| c.name.eq_ignore_case(target))
            })
        };
        let (deferred, inline): (Vec<ForeignKeySchema>, Vec<ForeignKeySchema>) =
            table.foreign_keys.iter().cloned().partition(|fk| pending(fk));

        let mut stripped = table.clone();
        stripped.foreign_keys = inline;
        out.push((stripped, deferred));
        created.push(table);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_schema::{ColumnSchema, ColumnType, IndexSchema, PrimaryKeySchema, Sequence};

    fn parent() -> TableSchema {
        TableSchema::builder("parent")
            .column(ColumnSchema::new("id", ColumnType::BigInt))
            .primary_key(PrimaryKeySchema::new(["id"]))
            .build()
            .unwrap()
    }

    fn child() -> TableSchema {
        TableSchema::builder("child")
            .column(ColumnSchema::new("id", ColumnType::BigInt))
            .column(ColumnSchema::new("parent_id", ColumnType::BigInt))
            .primary_key(PrimaryKeySchema::new(["id"]))
            .foreign_key(ForeignKeySchema::new("parent_id", "parent", "id"))
            .build()
            .unwrap()
    }

    fn kinds(plan: &MigrationPlan) -> Vec<&'static str> {
        plan.iter().map(Operation::kind).collect()
    }

    #[test]
    fn test_identical_schemas_plan_nothing() {
        let schema = Schema::new().with_table(parent()).with_table(child());
        let plan = MigrationPlanner::default().plan(&schema, &schema).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_missing_tables_are_created_parent_first() {
        let planner = MigrationPlanner::default();
        for desired in [
            Schema::new().with_table(child()).with_table(parent()),
            Schema::new().with_table(parent()).with_table(child()),
        ] {
            let plan = planner.plan(&desired, &Schema::new()).unwrap();
            let created: Vec<&str> = plan
                .iter()
                .filter_map(|op| match op {
                    Operation::CreateTable { table } => Some(table.name()),
                    _ => None,
                })
                .collect();
            assert_eq!(created, vec!["parent", "child"]);
            assert_eq!(plan.missing_tables.len(), 2);
        }
    }

    #[test]
    fn test_cycle_defers_foreign_key() {
        let a = TableSchema::builder("a")
            .column(ColumnSchema::new("id", ColumnType::Integer))
            .column(ColumnSchema::new("b_id", ColumnType::Integer))
            .primary_key(PrimaryKeySchema::new(["id"]))
            .foreign_key(ForeignKeySchema::new("b_id", "b", "id"))
            .build()
            .unwrap();
        let b = TableSchema::builder("b")
            .column(ColumnSchema::new("id", ColumnType::Integer))
            .column(ColumnSchema::new("a_id", ColumnType::Integer))
            .primary_key(PrimaryKeySchema::new(["id"]))
            .foreign_key(ForeignKeySchema::new("a_id", "a", "id"))
            .build()
            .unwrap();

        let plan = MigrationPlanner::default()
            .plan(&Schema::new().with_table(a).with_table(b), &Schema::new())
            .unwrap();
        assert_eq!(kinds(&plan), vec!["create_table", "create_table", "add_foreign_key"]);
    }

    #[test]
    fn test_self_reference_stays_inline() {
        let node = TableSchema::builder("node")
            .column(ColumnSchema::new("id", ColumnType::BigInt))
            .column(ColumnSchema::new("parent_id", ColumnType::BigInt).nullable())
            .primary_key(PrimaryKeySchema::new(["id"]))
            .foreign_key(ForeignKeySchema::new("parent_id", "node", "id"))
            .build()
            .unwrap();

        let ordered = order_new_tables(&[&node]);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].0.foreign_keys.len(), 1);
        assert!(ordered[0].1.is_empty());

        let plan = MigrationPlanner::default()
            .plan(&Schema::new().with_table(node), &Schema::new())
            .unwrap();
        assert_eq!(kinds(&plan), vec!["create_table"]);
    }

    #[test]
    fn test_foreign_key_to_existing_table_is_valid() {
        let desired = Schema::new().with_table(child());
        let actual = Schema::new().with_table(parent());
        let plan = MigrationPlanner::default().plan(&desired, &actual).unwrap();
        assert_eq!(kinds(&plan), vec!["create_table"]);
    }

    #[test]
    fn test_dangling_reference_is_invalid_schema() {
        let desired = Schema::new().with_table(child());
        let err = MigrationPlanner::default().plan(&desired, &Schema::new()).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidSchema(SchemaError::DanglingReference { .. })));
    }

    #[test]
    fn test_unsupported_functional_index_is_dropped() {
        let table = TableSchema::builder("users")
            .column(ColumnSchema::new("email", ColumnType::Text))
            .index(IndexSchema::on_expression("lower(email)"))
            .build()
            .unwrap();
        let mut warnings = Vec::new();
        let resolved = resolve_table(&CapabilityTable::h2(), &table, &mut warnings).unwrap();

        assert!(resolved.indexes.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_unsupported_unique_functional_index_is_error() {
        let table = TableSchema::builder("users")
            .column(ColumnSchema::new("email", ColumnType::Text))
            .index(IndexSchema::on_expression("lower(email)").unique())
            .build()
            .unwrap();
        let err = resolve_table(&CapabilityTable::h2(), &table, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, PlanningError::UnsupportedByDialect { .. }));
    }

    #[test]
    fn test_unsupported_column_type_is_error() {
        let table = TableSchema::builder("events")
            .column(ColumnSchema::new("at", ColumnType::TimestampTz))
            .build()
            .unwrap();
        let err = MigrationPlanner::for_dialect(Dialect::Sqlite)
            .plan(&Schema::new().with_table(table), &Schema::new())
            .unwrap_err();
        assert!(matches!(err, PlanningError::UnsupportedByDialect { .. }));
    }

    #[test]
    fn test_declared_sequence_created_once() {
        let desired = Schema::new().with_sequence(Sequence::new("counter"));
        let planner = MigrationPlanner::default();

        let plan = planner.plan(&desired, &Schema::new()).unwrap();
        assert_eq!(kinds(&plan), vec!["create_sequence"]);

        let plan = planner.plan(&desired, &desired).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_sequences_unsupported_on_mysql() {
        let desired = Schema::new().with_sequence(Sequence::new("counter"));
        let err = MigrationPlanner::for_dialect(Dialect::MySql)
            .plan(&desired, &Schema::new())
            .unwrap_err();
        assert!(matches!(err, PlanningError::UnsupportedByDialect { .. }));
    }

    #[test]
    fn test_new_table_with_implicit_sequence_on_postgres() {
        let table = TableSchema::builder("users")
            .column(ColumnSchema::new("id", ColumnType::BigInt).auto_increment())
            .primary_key(PrimaryKeySchema::new(["id"]))
            .build()
            .unwrap();
        let plan = MigrationPlanner::for_dialect(Dialect::Postgres)
            .plan(&Schema::new().with_table(table), &Schema::new())
            .unwrap();

        assert_eq!(kinds(&plan), vec!["create_sequence", "create_table"]);
    }

    #[test]
    fn test_verify_plans_converges() {
        let planner = MigrationPlanner::for_dialect(Dialect::Postgres)
            .with_config(PlannerConfig::new().verify_plans(true));
        let desired = Schema::new().with_table(parent()).with_table(child());
        let plan = planner.plan(&desired, &Schema::new()).unwrap();

        assert!(plan.warnings.is_empty());
    }
}
