//! Structural validation of schema descriptions.
//!
//! Validation happens in two layers:
//! - per table, when a [`TableSchema`] is built or deserialized
//! - across tables, once the set of tables a foreign key may point at is known
//!
//! Both layers collect every problem they find before failing.

use std::collections::{HashMap, HashSet};

use smol_str::SmolStr;
use tracing::debug;

use crate::ast::*;
use crate::error::{SchemaError, SchemaResult};

/// Schema validator.
#[derive(Debug)]
pub struct Validator {
    /// Collected validation errors.
    errors: Vec<SchemaError>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Validate a single table in isolation.
    pub fn validate_table(&mut self, table: &TableSchema) -> SchemaResult<()> {
        self.errors.clear();
        self.check_table(table);
        self.finish()
    }

    /// Validate the foreign keys of `table` against the tables `lookup` can
    /// resolve.
    ///
    /// `lookup` receives a referenced table name and returns the table if it
    /// is known, whether it comes from the desired batch or from the
    /// database.
    pub fn validate_references<'a, F>(&mut self, table: &TableSchema, lookup: F) -> SchemaResult<()>
    where
        F: Fn(&Ident) -> Option<&'a TableSchema>,
    {
        self.errors.clear();
        self.check_references(table, &lookup);
        self.finish()
    }

    /// Validate a whole schema: every table, every reference, every sequence.
    pub fn validate_schema(&mut self, schema: &Schema) -> SchemaResult<()> {
        self.errors.clear();

        for table in schema.tables() {
            self.check_table(table);
        }
        for table in schema.tables() {
            self.check_references(table, &|name: &Ident| schema.table(name));
        }
        for sequence in schema.sequences.values() {
            if let Err(message) = sequence.check() {
                self.errors
                    .push(SchemaError::invalid_sequence(sequence.name.as_str(), message));
            }
        }
        self.check_sequence_owners(schema.tables());

        self.finish()
    }

    fn finish(&mut self) -> SchemaResult<()> {
        if !self.errors.is_empty() {
            debug!(errors = self.errors.len(), "schema validation failed");
        }
        match SchemaError::from_many(std::mem::take(&mut self.errors)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_table(&mut self, table: &TableSchema) {
        self.check_columns(table);
        self.check_primary_key(table);
        self.check_indexes(table);
        self.check_foreign_keys(table);
        self.check_sequence_owners(std::iter::once(table));
    }

    fn check_columns(&mut self, table: &TableSchema) {
        let mut seen = HashSet::new();

        for column in &table.columns {
            if column.name().is_empty() {
                self.errors.push(SchemaError::invalid_column(
                    table.name(),
                    "",
                    "column name must not be empty",
                ));
                continue;
            }
            if !seen.insert(column.name.case_key()) {
                self.errors
                    .push(SchemaError::duplicate_column(table.name(), column.name()));
            }

            if let Some(auto) = &column.auto_increment {
                if !column.column_type.is_integer() {
                    self.errors.push(SchemaError::invalid_column(
                        table.name(),
                        column.name(),
                        format!("autoincrement requires an integer type, found {}", column.column_type),
                    ));
                }
                if column.default.is_some() {
                    self.errors.push(SchemaError::invalid_column(
                        table.name(),
                        column.name(),
                        "autoincrement column cannot also declare a default",
                    ));
                }
                if let Some(seq) = auto.sequence()
                    && let Err(message) = seq.check()
                {
                    self.errors
                        .push(SchemaError::invalid_sequence(seq.name.as_str(), message));
                }
            }
        }
    }

    fn check_primary_key(&mut self, table: &TableSchema) {
        let Some(pk) = &table.primary_key else {
            return;
        };

        if pk.columns.is_empty() {
            self.errors.push(SchemaError::invalid_column(
                table.name(),
                "",
                "primary key must list at least one column",
            ));
        }

        let mut seen = HashSet::new();
        for column in &pk.columns {
            if !table.has_column(column) {
                self.errors
                    .push(SchemaError::unknown_column(table.name(), column.as_str(), "primary key"));
            }
            if !seen.insert(column.case_key()) {
                self.errors.push(SchemaError::invalid_column(
                    table.name(),
                    column.as_str(),
                    "column listed twice in primary key",
                ));
            }
        }
    }

    fn check_indexes(&mut self, table: &TableSchema) {
        let mut names = HashSet::new();

        for index in &table.indexes {
            if index.parts.is_empty() {
                self.errors.push(SchemaError::invalid_index(
                    table.name(),
                    "index must cover at least one column or expression",
                ));
            }
            if let Some(name) = &index.name
                && !names.insert(name.case_key())
            {
                self.errors.push(SchemaError::duplicate("index", name.as_str()));
            }
            for part in &index.parts {
                match part {
                    IndexPart::Column(column) if !table.has_column(column) => {
                        self.errors
                            .push(SchemaError::unknown_column(table.name(), column.as_str(), "index"));
                    }
                    IndexPart::Expression(expr) if expr.trim().is_empty() => {
                        self.errors
                            .push(SchemaError::invalid_index(table.name(), "empty index expression"));
                    }
                    _ => {}
                }
            }
            if index.filter.as_ref().is_some_and(|f| f.trim().is_empty()) {
                self.errors
                    .push(SchemaError::invalid_index(table.name(), "empty filter predicate"));
            }
        }
    }

    fn check_foreign_keys(&mut self, table: &TableSchema) {
        for fk in &table.foreign_keys {
            if fk.parts.is_empty() {
                self.errors.push(SchemaError::invalid_foreign_key(
                    table.name(),
                    "foreign key must list at least one column",
                ));
                continue;
            }
            if fk
                .parts
                .iter()
                .any(|p| p.column.as_str().is_empty() || p.referenced_column.as_str().is_empty())
            {
                self.errors.push(SchemaError::invalid_foreign_key(
                    table.name(),
                    "local and referenced column lists differ in length",
                ));
                continue;
            }
            if let Some(target) = fk.referenced_table()
                && fk.parts.iter().any(|p| !p.referenced_table.eq_ignore_case(target))
            {
                self.errors.push(SchemaError::invalid_foreign_key(
                    table.name(),
                    "all parts of a composite foreign key must reference the same table",
                ));
            }
            for column in fk.columns() {
                if !table.has_column(column) {
                    self.errors
                        .push(SchemaError::unknown_column(table.name(), column.as_str(), "foreign key"));
                }
            }
        }
    }

    fn check_references<'a, F>(&mut self, table: &TableSchema, lookup: &F)
    where
        F: Fn(&Ident) -> Option<&'a TableSchema>,
    {
        for fk in &table.foreign_keys {
            let Some(target_name) = fk.referenced_table() else {
                continue;
            };

            let target = if target_name.eq_ignore_case(&table.name) {
                Some(table)
            } else {
                lookup(target_name)
            };
            let Some(target) = target else {
                self.errors
                    .push(SchemaError::dangling(table.name(), target_name.as_str()));
                continue;
            };

            let mut missing = false;
            for column in fk.referenced_columns() {
                if !target.has_column(column) {
                    self.errors.push(SchemaError::dangling(
                        table.name(),
                        format!("{}.{}", target.name(), column),
                    ));
                    missing = true;
                }
            }
            if missing {
                continue;
            }

            if let Some(pk) = &target.primary_key {
                let all_in_pk = fk
                    .referenced_columns()
                    .all(|c| pk.columns.iter().any(|p| p.eq_ignore_case(c)));
                if all_in_pk && fk.arity() != pk.arity() {
                    self.errors.push(SchemaError::ArityMismatch {
                        table: table.name().to_string(),
                        referenced_table: target.name().to_string(),
                        expected: pk.arity(),
                        found: fk.arity(),
                    });
                }
            }
        }
    }

    fn check_sequence_owners<'a>(&mut self, tables: impl Iterator<Item = &'a TableSchema>) {
        let mut owners: HashMap<SmolStr, Vec<String>> = HashMap::new();
        let mut order = Vec::new();

        for table in tables {
            for column in &table.columns {
                if let Some(seq) = column.auto_increment.as_ref().and_then(|a| a.sequence_name()) {
                    let key = seq.case_key();
                    if !owners.contains_key(&key) {
                        order.push((key.clone(), seq.to_string()));
                    }
                    owners
                        .entry(key)
                        .or_default()
                        .push(format!("{}.{}", table.name(), column.name()));
                }
            }
        }

        for (key, name) in order {
            if let Some(columns) = owners.get(&key)
                && columns.len() > 1
            {
                self.errors.push(SchemaError::SharedSequence {
                    sequence: name,
                    columns: columns.join(", "),
                });
            }
        }
    }
}

/// Validate a set of tables as one batch.
pub fn validate_tables<'a>(tables: impl IntoIterator<Item = &'a TableSchema>) -> SchemaResult<()> {
    let tables: Vec<&TableSchema> = tables.into_iter().collect();
    let mut validator = Validator::new();
    let mut errors = Vec::new();

    for table in &tables {
        if let Err(err) = validator.validate_references(table, |name| {
            tables.iter().copied().find(|t| t.name.eq_ignore_case(name))
        }) {
            errors.push(err);
        }
    }

    match SchemaError::from_many(errors) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
