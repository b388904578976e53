//! SQL rendering of logical operations.
//!
//! Each dialect has a [`StatementRenderer`]. Rendering one operation may
//! yield several statements, and a renderer refuses operations its dialect
//! cannot express with [`PlanningError::UnsupportedByDialect`]. Statements
//! carry no trailing semicolon; [`MigrationSql::to_script`] adds them.

use sha2::{Digest, Sha256};
use tabula_schema::{
    AutoIncrement, ColumnSchema, ColumnType, ForeignKeySchema, Ident, IndexPart, IndexSchema,
    IndexType, PrimaryKeySchema, ReferentialAction, Sequence, TableSchema,
};
use tracing::debug;

use crate::dialect::implicit_sequence_name;
use crate::error::{PlanResult, PlanningError};
use crate::operation::{MigrationPlan, Operation};

/// Generated SQL for a migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSql {
    /// Dialect the statements are written for.
    pub dialect: String,
    /// Statements in execution order, without terminators.
    pub statements: Vec<String>,
}

impl MigrationSql {
    /// Check if the migration is empty.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// SHA-256 of the statements, hex encoded.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        for statement in &self.statements {
            hasher.update(statement.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// Statements joined into a script, one per line, each terminated.
    pub fn to_script(&self) -> String {
        let mut script = String::new();
        for statement in &self.statements {
            script.push_str(statement);
            script.push_str(";\n");
        }
        script
    }
}

/// Renders logical operations as dialect SQL.
pub trait StatementRenderer: Send + Sync {
    /// Dialect name.
    fn dialect(&self) -> &'static str;

    /// Quote an identifier.
    fn quote(&self, ident: &Ident) -> String;

    /// Render one operation.
    fn render(&self, op: &Operation) -> PlanResult<Vec<String>>;

    /// Type name of a column type.
    fn column_type(&self, column_type: &ColumnType) -> String {
        column_type.as_sql()
    }

    /// Clause making a column draw from its sequence, e.g. `AUTO_INCREMENT`.
    fn auto_increment_clause(&self, table: &Ident, column: &ColumnSchema) -> Option<String>;

    /// Column definition as used by `CREATE TABLE` and `ADD COLUMN`.
    fn column_definition(&self, table: &Ident, column: &ColumnSchema) -> String {
        let mut parts = vec![self.quote(&column.name), self.column_type(&column.column_type)];

        match self.auto_increment_clause(table, column) {
            Some(clause) => parts.push(clause),
            None => {
                if let Some(default) = &column.default
                    && !default.is_null()
                {
                    parts.push(format!("DEFAULT {}", default.to_sql()));
                }
            }
        }
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if column.unique {
            parts.push("UNIQUE".to_string());
        }

        parts.join(" ")
    }

    /// `CREATE TABLE` plus one `CREATE INDEX` per declared index.
    fn create_table(&self, table: &TableSchema) -> PlanResult<Vec<String>> {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(&table.name, c))
            .collect();

        if let Some(pk) = &table.primary_key {
            lines.push(self.primary_key_clause(pk));
        }
        for fk in &table.foreign_keys {
            lines.push(self.foreign_key_clause(&table.name, fk));
        }

        let mut stmts = vec![format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.quote(&table.name),
            lines.join(",\n    ")
        )];
        for index in &table.indexes {
            stmts.extend(self.create_index(&table.name, index)?);
        }
        Ok(stmts)
    }

    /// `[CONSTRAINT name] PRIMARY KEY (...)`.
    fn primary_key_clause(&self, pk: &PrimaryKeySchema) -> String {
        let columns = self.column_list(&pk.columns);
        match &pk.name {
            Some(name) => format!("CONSTRAINT {} PRIMARY KEY ({})", self.quote(name), columns),
            None => format!("PRIMARY KEY ({})", columns),
        }
    }

    /// `CONSTRAINT name FOREIGN KEY (...) REFERENCES ...`.
    fn foreign_key_clause(&self, table: &Ident, fk: &ForeignKeySchema) -> String {
        let local: Vec<Ident> = fk.columns().cloned().collect();
        let remote: Vec<Ident> = fk.referenced_columns().cloned().collect();
        let target = fk.referenced_table().cloned().unwrap_or_else(|| Ident::new(""));

        let mut clause = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote(&foreign_key_name(table, fk)),
            self.column_list(&local),
            self.quote(&target),
            self.column_list(&remote)
        );
        if fk.on_delete != ReferentialAction::NoAction {
            clause.push_str(&format!(" ON DELETE {}", fk.on_delete.as_str()));
        }
        if fk.on_update != ReferentialAction::NoAction {
            clause.push_str(&format!(" ON UPDATE {}", fk.on_update.as_str()));
        }
        clause
    }

    /// `CREATE [UNIQUE] INDEX`.
    fn create_index(&self, table: &Ident, index: &IndexSchema) -> PlanResult<Vec<String>> {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let using = match &index.index_type {
            Some(method) => format!(" USING {}", method.as_sql()),
            None => String::new(),
        };
        let mut stmt = format!(
            "CREATE {}INDEX {} ON {}{} ({})",
            unique,
            self.quote(&index_name(table, index)),
            self.quote(table),
            using,
            self.index_parts(index)
        );
        if let Some(filter) = &index.filter {
            stmt.push_str(&format!(" WHERE {}", filter));
        }
        Ok(vec![stmt])
    }

    /// `DROP INDEX`.
    fn drop_index(&self, table: &Ident, index: &IndexSchema) -> PlanResult<Vec<String>> {
        Ok(vec![format!("DROP INDEX {}", self.quote(&index_name(table, index)))])
    }

    /// Comma-separated quoted identifiers.
    fn column_list(&self, columns: &[Ident]) -> String {
        columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Index key list; expressions are written as given.
    fn index_parts(&self, index: &IndexSchema) -> String {
        index
            .parts
            .iter()
            .map(|part| match part {
                IndexPart::Column(column) => self.quote(column),
                IndexPart::Expression(expr) => expr.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Statements shared by every dialect. Anything else is unsupported.
    fn render_common(&self, op: &Operation) -> PlanResult<Vec<String>> {
        let stmts = match op {
            Operation::CreateTable { table } => return self.create_table(table),
            Operation::CreateColumn { table, column } => vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                self.quote(table),
                self.column_definition(table, column)
            )],
            Operation::DropColumn { table, column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.quote(table),
                self.quote(column)
            )],
            Operation::AlterColumnDefault {
                table,
                column,
                default,
            } => vec![match default.as_ref().filter(|d| !d.is_null()) {
                Some(default) => format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                    self.quote(table),
                    self.quote(column),
                    default.to_sql()
                ),
                None => format!(
                    "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                    self.quote(table),
                    self.quote(column)
                ),
            }],
            Operation::CreateSequence { sequence } => vec![create_sequence(self, sequence)],
            Operation::DropSequence { name } => vec![format!("DROP SEQUENCE {}", self.quote(name))],
            Operation::RenameSequence { from, to } => vec![format!(
                "ALTER SEQUENCE {} RENAME TO {}",
                self.quote(from),
                self.quote(to)
            )],
            Operation::CreateIndex { table, index } => return self.create_index(table, index),
            Operation::DropIndex { table, index } => return self.drop_index(table, index),
            Operation::AddPrimaryKey { table, primary_key } => vec![format!(
                "ALTER TABLE {} ADD {}",
                self.quote(table),
                self.primary_key_clause(primary_key)
            )],
            Operation::AddForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} ADD {}",
                self.quote(table),
                self.foreign_key_clause(table, foreign_key)
            )],
            Operation::DropForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote(table),
                self.quote(&foreign_key_name(table, foreign_key))
            )],
            other => {
                return Err(PlanningError::unsupported(
                    self.dialect(),
                    other.kind().replace('_', " "),
                    other.table().map(Ident::as_str),
                ));
            }
        };
        Ok(stmts)
    }

    /// Render every operation of a plan.
    fn render_plan(&self, plan: &MigrationPlan) -> PlanResult<MigrationSql> {
        let mut statements = Vec::with_capacity(plan.len());
        for op in plan {
            statements.extend(self.render(op)?);
        }
        debug!(dialect = self.dialect(), statements = statements.len(), "rendered plan");
        Ok(MigrationSql {
            dialect: self.dialect().to_string(),
            statements,
        })
    }
}

fn create_sequence<R: StatementRenderer + ?Sized>(renderer: &R, sequence: &Sequence) -> String {
    let mut stmt = format!("CREATE SEQUENCE {}", renderer.quote(&sequence.name));
    if let Some(start) = sequence.start {
        stmt.push_str(&format!(" START WITH {}", start));
    }
    if let Some(increment) = sequence.increment {
        stmt.push_str(&format!(" INCREMENT BY {}", increment));
    }
    if let Some(min) = sequence.min_value {
        stmt.push_str(&format!(" MINVALUE {}", min));
    }
    if let Some(max) = sequence.max_value {
        stmt.push_str(&format!(" MAXVALUE {}", max));
    }
    if let Some(cache) = sequence.cache {
        stmt.push_str(&format!(" CACHE {}", cache));
    }
    if sequence.cycle {
        stmt.push_str(" CYCLE");
    }
    stmt
}

/// Explicit index name, or `{table}_{parts}_idx` (`_key` when unique).
pub fn index_name(table: &Ident, index: &IndexSchema) -> Ident {
    if let Some(name) = &index.name {
        return name.clone();
    }
    let parts: Vec<String> = index
        .parts
        .iter()
        .map(|part| match part {
            IndexPart::Column(column) => column.as_str().to_lowercase(),
            IndexPart::Expression(expr) => name_fragment(expr),
        })
        .collect();
    let suffix = if index.unique { "key" } else { "idx" };
    Ident::new(format!("{}_{}_{}", table.as_str().to_lowercase(), parts.join("_"), suffix))
}

/// Explicit constraint name, or `{table}_{columns}_fkey`.
pub fn foreign_key_name(table: &Ident, fk: &ForeignKeySchema) -> Ident {
    if let Some(name) = &fk.name {
        return name.clone();
    }
    let columns: Vec<String> = fk.columns().map(|c| c.as_str().to_lowercase()).collect();
    Ident::new(format!("{}_{}_fkey", table.as_str().to_lowercase(), columns.join("_")))
}

fn name_fragment(expr: &str) -> String {
    let mut out = String::new();
    for c in expr.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn quote_with(name: &str, quote: char) -> String {
    let escaped = name.replace(quote, &format!("{quote}{quote}"));
    format!("{quote}{escaped}{quote}")
}

/// Whether an index is a plain unique key over columns, which some
/// dialects model as a table constraint.
fn is_unique_key(index: &IndexSchema) -> bool {
    index.unique
        && index.filter.is_none()
        && matches!(index.index_type, None | Some(IndexType::BTree))
        && index.parts.iter().all(|p| p.as_column().is_some())
}

/// H2.
///
/// Unquoted identifiers are written bare in upper case.
#[derive(Debug, Clone, Copy, Default)]
pub struct H2Renderer;

impl StatementRenderer for H2Renderer {
    fn dialect(&self) -> &'static str {
        "h2"
    }

    fn quote(&self, ident: &Ident) -> String {
        if ident.is_quoted() {
            quote_with(ident.as_str(), '"')
        } else {
            ident.as_str().to_uppercase()
        }
    }

    fn auto_increment_clause(&self, _table: &Ident, column: &ColumnSchema) -> Option<String> {
        match column.auto_increment.as_ref()? {
            AutoIncrement::Implicit => Some("AUTO_INCREMENT".to_string()),
            AutoIncrement::Sequence(seq) => {
                Some(format!("DEFAULT NEXT VALUE FOR {}", self.quote(&seq.name)))
            }
        }
    }

    fn create_index(&self, table: &Ident, index: &IndexSchema) -> PlanResult<Vec<String>> {
        // H2 keeps no access method.
        let unique = if index.unique { "UNIQUE " } else { "" };
        Ok(vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.quote(&index_name(table, index)),
            self.quote(table),
            self.index_parts(index)
        )])
    }

    fn render(&self, op: &Operation) -> PlanResult<Vec<String>> {
        let stmt = match op {
            Operation::AlterColumnType {
                table, column, to, ..
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {}",
                self.quote(table),
                self.quote(column),
                self.column_type(to)
            ),
            Operation::AlterColumnNullability {
                table,
                column,
                nullable,
                ..
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET {}",
                self.quote(table),
                self.quote(column),
                if *nullable { "NULL" } else { "NOT NULL" }
            ),
            Operation::AddAutoIncrement {
                table,
                column,
                column_type,
                sequence,
                ..
            } => match sequence {
                Some(seq) => format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT NEXT VALUE FOR {}",
                    self.quote(table),
                    self.quote(column),
                    self.quote(seq)
                ),
                None => format!(
                    "ALTER TABLE {} ALTER COLUMN {} {} AUTO_INCREMENT",
                    self.quote(table),
                    self.quote(column),
                    self.column_type(column_type)
                ),
            },
            Operation::DropAutoIncrement {
                table,
                column,
                sequence,
                ..
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} {}",
                self.quote(table),
                self.quote(column),
                if sequence.is_some() { "DROP DEFAULT" } else { "DROP IDENTITY" }
            ),
            Operation::DropPrimaryKey { table, .. } => {
                format!("ALTER TABLE {} DROP PRIMARY KEY", self.quote(table))
            }
            other => return self.render_common(other),
        };
        Ok(vec![stmt])
    }
}

/// PostgreSQL.
///
/// Every identifier is quoted; unquoted ones are folded to lower case first.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresRenderer;

impl PostgresRenderer {
    fn nextval(&self, sequence: &Ident) -> String {
        format!("nextval('{}')", self.quote(sequence).replace('\'', "''"))
    }
}

impl StatementRenderer for PostgresRenderer {
    fn dialect(&self) -> &'static str {
        "postgres"
    }

    fn quote(&self, ident: &Ident) -> String {
        if ident.is_quoted() {
            quote_with(ident.as_str(), '"')
        } else {
            quote_with(&ident.as_str().to_lowercase(), '"')
        }
    }

    fn column_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Blob | ColumnType::Binary(_) => "BYTEA".to_string(),
            ColumnType::Json => "JSONB".to_string(),
            other => other.as_sql(),
        }
    }

    fn auto_increment_clause(&self, table: &Ident, column: &ColumnSchema) -> Option<String> {
        let sequence = match column.auto_increment.as_ref()? {
            AutoIncrement::Implicit => implicit_sequence_name(table, &column.name),
            AutoIncrement::Sequence(seq) => seq.name.clone(),
        };
        Some(format!("DEFAULT {}", self.nextval(&sequence)))
    }

    fn create_index(&self, table: &Ident, index: &IndexSchema) -> PlanResult<Vec<String>> {
        let name = index_name(table, index);
        if index.name.is_none() && is_unique_key(index) {
            return Ok(vec![format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                self.quote(table),
                self.quote(&name),
                self.index_parts(index)
            )]);
        }

        let unique = if index.unique { "UNIQUE " } else { "" };
        let using = match &index.index_type {
            Some(method) => format!(" USING {}", method.as_sql()),
            None => String::new(),
        };
        let mut stmt = format!(
            "CREATE {}INDEX {} ON {}{} ({})",
            unique,
            self.quote(&name),
            self.quote(table),
            using,
            self.index_parts(index)
        );
        if let Some(filter) = &index.filter {
            stmt.push_str(&format!(" WHERE {}", filter));
        }
        Ok(vec![stmt])
    }

    fn drop_index(&self, table: &Ident, index: &IndexSchema) -> PlanResult<Vec<String>> {
        let name = self.quote(&index_name(table, index));
        if is_unique_key(index) {
            // Either a constraint or a plain unique index; the constraint
            // drop takes its backing index with it.
            return Ok(vec![
                format!("ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}", self.quote(table), name),
                format!("DROP INDEX IF EXISTS {}", name),
            ]);
        }
        Ok(vec![format!("DROP INDEX {}", name)])
    }

    fn render(&self, op: &Operation) -> PlanResult<Vec<String>> {
        let stmt = match op {
            Operation::AlterColumnType {
                table, column, to, ..
            } => {
                let ty = self.column_type(to);
                format!(
                    "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
                    self.quote(table),
                    self.quote(column),
                    ty,
                    self.quote(column),
                    ty
                )
            }
            Operation::AlterColumnNullability {
                table,
                column,
                nullable,
                ..
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
                self.quote(table),
                self.quote(column),
                if *nullable { "DROP" } else { "SET" }
            ),
            Operation::AddAutoIncrement {
                table,
                column,
                sequence,
                ..
            } => {
                let sequence = sequence
                    .clone()
                    .unwrap_or_else(|| implicit_sequence_name(table, column));
                format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                    self.quote(table),
                    self.quote(column),
                    self.nextval(&sequence)
                )
            }
            Operation::DropAutoIncrement { table, column, .. } => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                self.quote(table),
                self.quote(column)
            ),
            Operation::DropPrimaryKey { table, primary_key } => {
                let name = primary_key
                    .name
                    .clone()
                    .unwrap_or_else(|| Ident::new(format!("{}_pkey", table.as_str())));
                format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    self.quote(table),
                    self.quote(&name)
                )
            }
            other => return self.render_common(other),
        };
        Ok(vec![stmt])
    }
}

/// MySQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlRenderer;

impl StatementRenderer for MySqlRenderer {
    fn dialect(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, ident: &Ident) -> String {
        quote_with(ident.as_str(), '`')
    }

    fn column_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Uuid => "CHAR(36)".to_string(),
            other => other.as_sql(),
        }
    }

    fn auto_increment_clause(&self, _table: &Ident, column: &ColumnSchema) -> Option<String> {
        column
            .auto_increment
            .as_ref()
            .map(|_| "AUTO_INCREMENT".to_string())
    }

    fn create_index(&self, table: &Ident, index: &IndexSchema) -> PlanResult<Vec<String>> {
        let kind = match (&index.index_type, index.unique) {
            (Some(IndexType::FullText), _) => "FULLTEXT ",
            (_, true) => "UNIQUE ",
            _ => "",
        };
        let using = match &index.index_type {
            Some(method @ (IndexType::BTree | IndexType::Hash)) => format!(" USING {}", method.as_sql()),
            _ => String::new(),
        };
        // Key parts that are expressions need their own parentheses.
        let parts: Vec<String> = index
            .parts
            .iter()
            .map(|part| match part {
                IndexPart::Column(column) => self.quote(column),
                IndexPart::Expression(expr) => format!("({})", expr),
            })
            .collect();

        Ok(vec![format!(
            "CREATE {}INDEX {} ON {} ({}){}",
            kind,
            self.quote(&index_name(table, index)),
            self.quote(table),
            parts.join(", "),
            using
        )])
    }

    fn drop_index(&self, table: &Ident, index: &IndexSchema) -> PlanResult<Vec<String>> {
        Ok(vec![format!(
            "DROP INDEX {} ON {}",
            self.quote(&index_name(table, index)),
            self.quote(table)
        )])
    }

    fn render(&self, op: &Operation) -> PlanResult<Vec<String>> {
        let stmt = match op {
            Operation::AlterColumnType {
                table, column, to, ..
            } => format!(
                "ALTER TABLE {} MODIFY COLUMN {} {}",
                self.quote(table),
                self.quote(column),
                self.column_type(to)
            ),
            Operation::AlterColumnNullability {
                table,
                column,
                column_type,
                nullable,
            } => format!(
                "ALTER TABLE {} MODIFY COLUMN {} {} {}",
                self.quote(table),
                self.quote(column),
                self.column_type(column_type),
                if *nullable { "NULL" } else { "NOT NULL" }
            ),
            Operation::AddAutoIncrement {
                table,
                column,
                column_type,
                ..
            } => format!(
                "ALTER TABLE {} MODIFY COLUMN {} {} NOT NULL AUTO_INCREMENT",
                self.quote(table),
                self.quote(column),
                self.column_type(column_type)
            ),
            Operation::DropAutoIncrement {
                table,
                column,
                column_type,
                ..
            } => format!(
                "ALTER TABLE {} MODIFY COLUMN {} {} NOT NULL",
                self.quote(table),
                self.quote(column),
                self.column_type(column_type)
            ),
            Operation::DropPrimaryKey { table, .. } => {
                format!("ALTER TABLE {} DROP PRIMARY KEY", self.quote(table))
            }
            Operation::DropForeignKey { table, foreign_key } => format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                self.quote(table),
                self.quote(&foreign_key_name(table, foreign_key))
            ),
            Operation::CreateSequence { .. }
            | Operation::DropSequence { .. }
            | Operation::RenameSequence { .. } => {
                return Err(PlanningError::unsupported(self.dialect(), "sequences", None));
            }
            other => return self.render_common(other),
        };
        Ok(vec![stmt])
    }
}

/// SQLite.
///
/// Only columns can be added; changing a column, key or foreign key in place
/// is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteRenderer;

impl SqliteRenderer {
    fn unsupported(&self, op: &Operation) -> PlanningError {
        PlanningError::unsupported(
            self.dialect(),
            format!("{} without rebuilding the table", op.kind().replace('_', " ")),
            op.table().map(Ident::as_str),
        )
    }
}

impl StatementRenderer for SqliteRenderer {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    fn quote(&self, ident: &Ident) -> String {
        quote_with(ident.as_str(), '"')
    }

    fn column_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Uuid | ColumnType::Json => "TEXT".to_string(),
            other => other.as_sql(),
        }
    }

    fn auto_increment_clause(&self, _table: &Ident, _column: &ColumnSchema) -> Option<String> {
        None
    }

    /// An autoincrement column must be the sole primary key and becomes
    /// `INTEGER PRIMARY KEY AUTOINCREMENT`.
    fn create_table(&self, table: &TableSchema) -> PlanResult<Vec<String>> {
        let rowid = table.columns.iter().find(|c| c.is_auto_increment());
        if let Some(column) = rowid {
            let sole_key = table.primary_key.as_ref().is_some_and(|pk| {
                pk.columns.len() == 1 && pk.columns[0].eq_ignore_case(&column.name)
            });
            if !sole_key {
                return Err(PlanningError::unsupported(
                    self.dialect(),
                    format!("autoincrement column `{}` outside a single-column primary key", column.name),
                    Some(table.name()),
                ));
            }
        }

        let mut lines = Vec::with_capacity(table.columns.len() + 1);
        for column in &table.columns {
            if column.is_auto_increment() {
                lines.push(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.quote(&column.name)));
            } else {
                lines.push(self.column_definition(&table.name, column));
            }
        }
        if rowid.is_none()
            && let Some(pk) = &table.primary_key
        {
            lines.push(self.primary_key_clause(pk));
        }
        for fk in &table.foreign_keys {
            lines.push(self.foreign_key_clause(&table.name, fk));
        }

        let mut stmts = vec![format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.quote(&table.name),
            lines.join(",\n    ")
        )];
        for index in &table.indexes {
            stmts.extend(self.create_index(&table.name, index)?);
        }
        Ok(stmts)
    }

    fn render(&self, op: &Operation) -> PlanResult<Vec<String>> {
        match op {
            Operation::CreateColumn { column, .. } if column.is_auto_increment() => {
                Err(self.unsupported(op))
            }
            Operation::AlterColumnType { .. }
            | Operation::AlterColumnNullability { .. }
            | Operation::AlterColumnDefault { .. }
            | Operation::AddAutoIncrement { .. }
            | Operation::DropAutoIncrement { .. }
            | Operation::AddPrimaryKey { .. }
            | Operation::DropPrimaryKey { .. }
            | Operation::AddForeignKey { .. }
            | Operation::DropForeignKey { .. } => Err(self.unsupported(op)),
            Operation::CreateSequence { .. }
            | Operation::DropSequence { .. }
            | Operation::RenameSequence { .. } => {
                Err(PlanningError::unsupported(self.dialect(), "sequences", None))
            }
            other => self.render_common(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_schema::DefaultValue;

    fn tester() -> Ident {
        Ident::new("tester")
    }

    #[test]
    fn test_h2_add_primary_key() {
        let op = Operation::AddPrimaryKey {
            table: tester(),
            primary_key: PrimaryKeySchema::new(["bar"]),
        };
        assert_eq!(
            H2Renderer.render(&op).unwrap(),
            vec!["ALTER TABLE TESTER ADD PRIMARY KEY (BAR)".to_string()]
        );
    }

    #[test]
    fn test_quoting() {
        let quoted = Ident::quoted("Mixed");
        let plain = Ident::new("Mixed");
        assert_eq!(H2Renderer.quote(&quoted), "\"Mixed\"");
        assert_eq!(H2Renderer.quote(&plain), "MIXED");
        assert_eq!(PostgresRenderer.quote(&plain), "\"mixed\"");
        assert_eq!(PostgresRenderer.quote(&quoted), "\"Mixed\"");
        assert_eq!(MySqlRenderer.quote(&plain), "`Mixed`");
        assert_eq!(SqliteRenderer.quote(&Ident::quoted("a\"b")), "\"a\"\"b\"");
    }

    #[test]
    fn test_create_column_with_default() {
        let op = Operation::CreateColumn {
            table: tester(),
            column: ColumnSchema::new("name", ColumnType::Varchar(Some(20)))
                .default_value(DefaultValue::string(" ")),
        };
        assert_eq!(
            H2Renderer.render(&op).unwrap(),
            vec!["ALTER TABLE TESTER ADD COLUMN NAME VARCHAR(20) DEFAULT ' ' NOT NULL".to_string()]
        );
    }

    #[test]
    fn test_create_table_postgres() {
        let table = TableSchema::builder("users")
            .column(ColumnSchema::new("id", ColumnType::BigInt).auto_increment())
            .column(ColumnSchema::new("email", ColumnType::Text).unique())
            .column(ColumnSchema::new("org_id", ColumnType::BigInt).nullable())
            .primary_key(PrimaryKeySchema::new(["id"]))
            .foreign_key(
                ForeignKeySchema::new("org_id", "orgs", "id").on_delete(ReferentialAction::Cascade),
            )
            .index(IndexSchema::on(["org_id"]))
            .build()
            .unwrap();

        let stmts = PostgresRenderer
            .render(&Operation::CreateTable { table })
            .unwrap();

        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE TABLE \"users\" ("));
        assert!(stmts[0].contains("\"id\" BIGINT DEFAULT nextval('\"users_id_seq\"') NOT NULL"));
        assert!(stmts[0].contains("\"email\" TEXT NOT NULL UNIQUE"));
        assert!(stmts[0].contains("PRIMARY KEY (\"id\")"));
        assert!(stmts[0].contains(
            "CONSTRAINT \"users_org_id_fkey\" FOREIGN KEY (\"org_id\") REFERENCES \"orgs\" (\"id\") ON DELETE CASCADE"
        ));
        assert_eq!(stmts[1], "CREATE INDEX \"users_org_id_idx\" ON \"users\" (\"org_id\")");
    }

    #[test]
    fn test_postgres_unique_key_is_constraint() {
        let op = Operation::CreateIndex {
            table: Ident::new("users"),
            index: IndexSchema::unique_on(["email"]),
        };
        assert_eq!(
            PostgresRenderer.render(&op).unwrap(),
            vec!["ALTER TABLE \"users\" ADD CONSTRAINT \"users_email_key\" UNIQUE (\"email\")".to_string()]
        );
    }

    #[test]
    fn test_postgres_partial_index() {
        let op = Operation::CreateIndex {
            table: Ident::new("users"),
            index: IndexSchema::on(["email"])
                .named("idx_active_email")
                .using(IndexType::Hash)
                .filter("deleted_at IS NULL"),
        };
        assert_eq!(
            PostgresRenderer.render(&op).unwrap(),
            vec![
                "CREATE INDEX \"idx_active_email\" ON \"users\" USING HASH (\"email\") WHERE deleted_at IS NULL"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_auto_increment_with_sequence() {
        let op = Operation::AddAutoIncrement {
            table: tester(),
            column: Ident::new("id"),
            column_type: ColumnType::BigInt,
            auto_increment: AutoIncrement::Sequence(Sequence::new("id_seq")),
            sequence: Some(Ident::new("id_seq")),
        };
        assert_eq!(
            H2Renderer.render(&op).unwrap(),
            vec!["ALTER TABLE TESTER ALTER COLUMN ID SET DEFAULT NEXT VALUE FOR ID_SEQ".to_string()]
        );
        assert_eq!(
            PostgresRenderer.render(&op).unwrap(),
            vec![
                "ALTER TABLE \"tester\" ALTER COLUMN \"id\" SET DEFAULT nextval('\"id_seq\"')".to_string()
            ]
        );
    }

    #[test]
    fn test_create_sequence() {
        let op = Operation::CreateSequence {
            sequence: Sequence::new("id_seq").start_with(100).increment_by(5),
        };
        assert_eq!(
            H2Renderer.render(&op).unwrap(),
            vec!["CREATE SEQUENCE ID_SEQ START WITH 100 INCREMENT BY 5".to_string()]
        );
        assert!(MySqlRenderer.render(&op).is_err());
    }

    #[test]
    fn test_mysql_functional_index() {
        let op = Operation::CreateIndex {
            table: Ident::new("users"),
            index: IndexSchema::on_expression("lower(email)"),
        };
        assert_eq!(
            MySqlRenderer.render(&op).unwrap(),
            vec!["CREATE INDEX `users_lower_email_idx` ON `users` ((lower(email)))".to_string()]
        );
    }

    #[test]
    fn test_sqlite_refuses_alters() {
        let op = Operation::AlterColumnNullability {
            table: tester(),
            column: Ident::new("bar"),
            column_type: ColumnType::Integer,
            nullable: true,
        };
        let err = SqliteRenderer.render(&op).unwrap_err();
        assert!(matches!(err, PlanningError::UnsupportedByDialect { .. }));
    }

    #[test]
    fn test_sqlite_rowid_table() {
        let table = TableSchema::builder("notes")
            .column(ColumnSchema::new("id", ColumnType::Integer).auto_increment())
            .column(ColumnSchema::new("body", ColumnType::Text))
            .primary_key(PrimaryKeySchema::new(["id"]))
            .build()
            .unwrap();
        let stmts = SqliteRenderer.render(&Operation::CreateTable { table }).unwrap();
        assert_eq!(
            stmts,
            vec!["CREATE TABLE \"notes\" (\n    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,\n    \"body\" TEXT NOT NULL\n)".to_string()]
        );
    }

    #[test]
    fn test_migration_sql_script_and_checksum() {
        let sql = MigrationSql {
            dialect: "h2".to_string(),
            statements: vec!["CREATE SEQUENCE S".to_string(), "DROP SEQUENCE T".to_string()],
        };
        assert_eq!(sql.to_script(), "CREATE SEQUENCE S;\nDROP SEQUENCE T;\n");
        assert_eq!(sql.checksum().len(), 64);
        assert_eq!(sql.checksum(), sql.clone().checksum());
        assert!(MigrationSql::default().is_empty());
    }

    #[test]
    fn test_render_plan() {
        let mut plan = MigrationPlan::new();
        plan.operations.push(Operation::AddPrimaryKey {
            table: tester(),
            primary_key: PrimaryKeySchema::new(["bar"]),
        });
        let sql = H2Renderer.render_plan(&plan).unwrap();
        assert_eq!(sql.dialect, "h2");
        assert_eq!(sql.len(), 1);
    }
}
