//! Reading the actual schema from a database catalog.
//!
//! The planner consumes the actual schema through [`MetadataReader`]. Driver
//! crates implement it by running catalog queries (see [`postgres_queries`])
//! and feeding the rows to a [`SnapshotBuilder`], which turns raw catalog
//! rows into the same model the desired schema uses.

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use smol_str::SmolStr;
use tabula_schema::{
    AutoIncrement, ColumnSchema, ColumnType, DefaultValue, ForeignKeySchema, Ident, IndexPart,
    IndexSchema, IndexType, PrimaryKeySchema, ReferentialAction, Schema, Sequence, TableSchema,
};
use tracing::{debug, instrument};

use crate::compare::strip_outer_parens;
use crate::dialect::{IdentifierCase, implicit_sequence_name};
use crate::error::{PlanResult, PlanningError};

/// Source of the actual schema.
///
/// Each call is a read against the live catalog and may fail with
/// [`PlanningError::Connectivity`]; the planner does not retry.
#[async_trait]
pub trait MetadataReader: Send + Sync {
    /// Fetch the tables with these names that exist, keyed by case key.
    async fn fetch_tables(&self, names: &[Ident]) -> PlanResult<IndexMap<SmolStr, TableSchema>>;

    /// Names of all sequences.
    async fn fetch_sequences(&self) -> PlanResult<Vec<Ident>>;

    /// Secondary indexes of a table, excluding the primary key index.
    async fn fetch_indices(&self, table: &Ident) -> PlanResult<Vec<IndexSchema>>;

    /// Primary key of a table.
    async fn fetch_primary_key(&self, table: &Ident) -> PlanResult<Option<PrimaryKeySchema>>;
}

/// Read a point-in-time snapshot of the named tables and every sequence.
#[instrument(skip_all, fields(tables = names.len()))]
pub async fn read_snapshot(reader: &dyn MetadataReader, names: &[Ident]) -> PlanResult<Schema> {
    let mut schema = Schema::new();

    for (_, mut table) in reader.fetch_tables(names).await? {
        table.indexes = reader.fetch_indices(&table.name).await?;
        table.primary_key = reader.fetch_primary_key(&table.name).await?;
        schema.insert_table(table);
    }
    for name in reader.fetch_sequences().await? {
        if schema.sequence(&name).is_none() {
            schema.insert_sequence(Sequence::new(name));
        }
    }

    debug!(
        found = schema.tables.len(),
        sequences = schema.sequences.len(),
        "read actual schema"
    );
    Ok(schema)
}

/// [`MetadataReader`] over a schema held in memory.
///
/// Used for snapshot files and in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataReader {
    schema: Schema,
}

impl InMemoryMetadataReader {
    /// Create a reader over a schema.
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// Get the schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn table(&self, name: &Ident) -> PlanResult<&TableSchema> {
        self.schema
            .table(name)
            .ok_or_else(|| PlanningError::snapshot(format!("unknown table {}", name)))
    }
}

#[async_trait]
impl MetadataReader for InMemoryMetadataReader {
    async fn fetch_tables(&self, names: &[Ident]) -> PlanResult<IndexMap<SmolStr, TableSchema>> {
        Ok(names
            .iter()
            .filter_map(|name| self.schema.table(name))
            .map(|table| (table.name.case_key(), table.clone()))
            .collect())
    }

    async fn fetch_sequences(&self) -> PlanResult<Vec<Ident>> {
        Ok(self
            .schema
            .all_sequences()
            .into_iter()
            .map(|seq| seq.name.clone())
            .collect())
    }

    async fn fetch_indices(&self, table: &Ident) -> PlanResult<Vec<IndexSchema>> {
        Ok(self.table(table)?.indexes.clone())
    }

    async fn fetch_primary_key(&self, table: &Ident) -> PlanResult<Option<PrimaryKeySchema>> {
        Ok(self.table(table)?.primary_key.clone())
    }
}

/// Raw table information from the catalog.
#[derive(Debug, Clone)]
pub struct TableInfo {
    /// Table name as stored.
    pub name: String,
    /// Namespace (e.g. "public").
    pub schema: String,
}

/// Raw column information from the catalog.
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    /// Column name as stored.
    pub name: String,
    /// Data type (e.g. "integer", "character varying").
    pub data_type: String,
    /// Character maximum length.
    pub character_maximum_length: Option<u32>,
    /// Numeric precision.
    pub numeric_precision: Option<u32>,
    /// Numeric scale.
    pub numeric_scale: Option<u32>,
    /// Whether the column is nullable.
    pub is_nullable: bool,
    /// Default expression as the catalog prints it.
    pub column_default: Option<String>,
    /// Identity or `AUTO_INCREMENT` column.
    pub is_identity: bool,
    /// Ordinal position.
    pub ordinal_position: i32,
}

/// Raw constraint information from the catalog.
#[derive(Debug, Clone)]
pub struct ConstraintInfo {
    /// Constraint name.
    pub name: String,
    /// PRIMARY KEY, UNIQUE, FOREIGN KEY or CHECK.
    pub constraint_type: String,
    /// Local columns, in key order.
    pub columns: Vec<String>,
    /// Referenced table (foreign keys).
    pub referenced_table: Option<String>,
    /// Referenced columns (foreign keys).
    pub referenced_columns: Vec<String>,
    /// On delete rule (foreign keys).
    pub on_delete: Option<String>,
    /// On update rule (foreign keys).
    pub on_update: Option<String>,
}

/// Raw index information from the catalog.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Indexed columns or expression texts, in key order.
    pub columns: Vec<String>,
    /// Whether the index is unique.
    pub is_unique: bool,
    /// Whether this index backs the primary key.
    pub is_primary: bool,
    /// Access method (btree, hash, ...).
    pub index_method: String,
    /// Filter predicate of a partial index.
    pub predicate: Option<String>,
}

/// Raw sequence information from the catalog.
#[derive(Debug, Clone)]
pub struct SequenceInfo {
    /// Sequence name.
    pub name: String,
    /// Start value.
    pub start: Option<i64>,
    /// Increment.
    pub increment: Option<i64>,
    /// Minimum value.
    pub min_value: Option<i64>,
    /// Maximum value.
    pub max_value: Option<i64>,
    /// Whether the sequence cycles.
    pub cycle: bool,
    /// Cache size.
    pub cache: Option<i64>,
}

/// Build the actual schema from catalog rows.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    case: IdentifierCase,
    tables: Vec<TableInfo>,
    columns: HashMap<String, Vec<ColumnInfo>>,
    constraints: HashMap<String, Vec<ConstraintInfo>>,
    indexes: HashMap<String, Vec<IndexInfo>>,
    sequences: Vec<SequenceInfo>,
}

impl SnapshotBuilder {
    /// Create a builder for a catalog that folds unquoted names as `case`.
    pub fn new(case: IdentifierCase) -> Self {
        Self {
            case,
            tables: Vec::new(),
            columns: HashMap::new(),
            constraints: HashMap::new(),
            indexes: HashMap::new(),
            sequences: Vec::new(),
        }
    }

    /// Add table information.
    pub fn with_tables(mut self, tables: Vec<TableInfo>) -> Self {
        self.tables = tables;
        self
    }

    /// Add column information for a table.
    pub fn with_columns(mut self, table: &str, columns: Vec<ColumnInfo>) -> Self {
        self.columns.insert(table.to_string(), columns);
        self
    }

    /// Add constraint information for a table.
    pub fn with_constraints(mut self, table: &str, constraints: Vec<ConstraintInfo>) -> Self {
        self.constraints.insert(table.to_string(), constraints);
        self
    }

    /// Add index information for a table.
    pub fn with_indexes(mut self, table: &str, indexes: Vec<IndexInfo>) -> Self {
        self.indexes.insert(table.to_string(), indexes);
        self
    }

    /// Add sequence information.
    pub fn with_sequences(mut self, sequences: Vec<SequenceInfo>) -> Self {
        self.sequences = sequences;
        self
    }

    /// Build the schema from the collected rows.
    pub fn build(self) -> PlanResult<Schema> {
        let mut schema = Schema::new();

        for info in &self.sequences {
            schema.insert_sequence(Sequence {
                name: self.ident(&info.name),
                start: info.start,
                increment: info.increment,
                min_value: info.min_value,
                max_value: info.max_value,
                cycle: info.cycle,
                cache: info.cache,
            });
        }

        for info in &self.tables {
            let table = self.build_table(info)?;
            debug!(table = %table.name, columns = table.columns.len(), "built table from catalog");
            schema.insert_table(table);
        }

        Ok(schema)
    }

    fn build_table(&self, info: &TableInfo) -> PlanResult<TableSchema> {
        let name = self.ident(&info.name);
        let mut builder = TableSchema::builder(name.clone());

        let mut columns = self.columns.get(&info.name).cloned().unwrap_or_default();
        columns.sort_by_key(|c| c.ordinal_position);
        for column in &columns {
            builder = builder.column(self.build_column(&name, column));
        }

        let constraints = self.constraints.get(&info.name).map(Vec::as_slice).unwrap_or_default();
        let mut constraint_names = Vec::new();
        for constraint in constraints {
            let columns = constraint.columns.iter().map(|c| self.ident(c));
            match constraint.constraint_type.to_uppercase().as_str() {
                "PRIMARY KEY" => {
                    builder = builder
                        .primary_key(PrimaryKeySchema::new(columns).named(self.ident(&constraint.name)));
                }
                "UNIQUE" => {
                    builder = builder
                        .index(IndexSchema::unique_on(columns).named(self.ident(&constraint.name)));
                }
                "FOREIGN KEY" => {
                    let target = constraint.referenced_table.as_deref().unwrap_or_default();
                    let referenced = constraint.referenced_columns.iter().map(|c| self.ident(c));
                    let fk = ForeignKeySchema::composite(columns, self.ident(target), referenced)
                        .named(self.ident(&constraint.name))
                        .on_delete(action(constraint.on_delete.as_deref()))
                        .on_update(action(constraint.on_update.as_deref()));
                    builder = builder.foreign_key(fk);
                }
                other => {
                    debug!(table = %name, constraint = %constraint.name, kind = other, "ignoring constraint");
                }
            }
            constraint_names.push(constraint.name.as_str());
        }

        let indexes = self.indexes.get(&info.name).map(Vec::as_slice).unwrap_or_default();
        for index in indexes {
            // Key constraints are already covered by their constraint rows.
            if index.is_primary || constraint_names.contains(&index.name.as_str()) {
                continue;
            }
            builder = builder.index(self.build_index(index));
        }

        builder
            .build()
            .map_err(|err| PlanningError::snapshot(format!("table {}: {}", info.name, err)))
    }

    fn build_column(&self, table: &Ident, info: &ColumnInfo) -> ColumnSchema {
        let name = self.ident(&info.name);
        let mut column = ColumnSchema::new(name.clone(), map_column_type(info));
        column.nullable = info.is_nullable;

        let sequence = info.column_default.as_deref().and_then(sequence_reference);
        match sequence {
            Some(seq) => {
                let seq = self.ident(&seq);
                column.auto_increment = Some(
                    if seq.eq_ignore_case(&implicit_sequence_name(table, &name)) {
                        AutoIncrement::Implicit
                    } else {
                        AutoIncrement::Sequence(Sequence::new(seq))
                    },
                );
            }
            None if info.is_identity => column.auto_increment = Some(AutoIncrement::Implicit),
            None => column.default = info.column_default.as_deref().and_then(parse_default_value),
        }

        column
    }

    fn build_index(&self, info: &IndexInfo) -> IndexSchema {
        let parts = info
            .columns
            .iter()
            .map(|part| {
                if is_plain_identifier(part) {
                    IndexPart::Column(self.ident(part))
                } else {
                    IndexPart::Expression(SmolStr::new(part))
                }
            })
            .collect();

        IndexSchema {
            name: Some(self.ident(&info.name)),
            parts,
            unique: info.is_unique,
            filter: info.predicate.as_deref().map(SmolStr::new),
            index_type: IndexType::from_str(&info.index_method),
        }
    }

    /// Names stored in a form other than the folded one were quoted when
    /// created.
    fn ident(&self, raw: &str) -> Ident {
        let folded = match self.case {
            IdentifierCase::Upper => raw.to_uppercase(),
            IdentifierCase::Lower => raw.to_lowercase(),
            IdentifierCase::Preserve => return Ident::new(raw),
        };
        if folded == raw && is_plain_identifier(raw) {
            Ident::new(raw)
        } else {
            Ident::quoted(raw)
        }
    }
}

fn action(rule: Option<&str>) -> ReferentialAction {
    rule.and_then(ReferentialAction::from_str).unwrap_or_default()
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Map a catalog data type to a column type.
pub fn map_column_type(info: &ColumnInfo) -> ColumnType {
    let data_type = info.data_type.trim().to_lowercase();
    match data_type.as_str() {
        "smallint" | "int2" => ColumnType::SmallInt,
        "integer" | "int" | "int4" => ColumnType::Integer,
        "bigint" | "int8" => ColumnType::BigInt,
        "numeric" | "decimal" => ColumnType::Decimal {
            precision: info.numeric_precision,
            scale: info.numeric_scale,
        },
        "real" | "float4" => ColumnType::Real,
        "double precision" | "double" | "float8" => ColumnType::Double,
        "boolean" | "bool" => ColumnType::Boolean,
        "character" | "char" | "bpchar" => ColumnType::Char(info.character_maximum_length),
        "character varying" | "varchar" => ColumnType::Varchar(info.character_maximum_length),
        "text" | "clob" | "character large object" => ColumnType::Text,
        "binary" => ColumnType::Binary(info.character_maximum_length),
        "bytea" | "blob" | "binary large object" => ColumnType::Blob,
        "date" => ColumnType::Date,
        "time" | "time without time zone" => ColumnType::Time,
        "timestamp" | "timestamp without time zone" => ColumnType::Timestamp,
        "timestamp with time zone" | "timestamptz" => ColumnType::TimestampTz,
        "uuid" => ColumnType::Uuid,
        "json" | "jsonb" => ColumnType::Json,
        other => other
            .parse()
            .unwrap_or_else(|_| ColumnType::Custom(SmolStr::new(other.to_uppercase()))),
    }
}

/// Sequence name an autoincrement default draws from.
///
/// Recognises `nextval('seq'::regclass)` and `NEXT VALUE FOR schema.seq`.
pub fn sequence_reference(default: &str) -> Option<String> {
    const NEXTVAL: &str = "nextval(";
    const NEXT_VALUE_FOR: &str = "next value for ";

    let trimmed = default.trim();

    if trimmed.get(..NEXTVAL.len()).is_some_and(|p| p.eq_ignore_ascii_case(NEXTVAL)) {
        let rest = &trimmed[NEXTVAL.len()..];
        let start = rest.find('\'')? + 1;
        let len = rest[start..].find('\'')?;
        return Some(unqualify(&rest[start..start + len]));
    }
    let pos = trimmed.char_indices().map(|(i, _)| i).find(|&i| {
        trimmed
            .get(i..i + NEXT_VALUE_FOR.len())
            .is_some_and(|w| w.eq_ignore_ascii_case(NEXT_VALUE_FOR))
    })?;
    let name = trimmed[pos + NEXT_VALUE_FOR.len()..].trim();
    Some(unqualify(name))
}

fn unqualify(name: &str) -> String {
    let last = name.rsplit('.').next().unwrap_or(name);
    last.trim_matches('"').to_string()
}

/// Parse a default as the catalog prints it.
///
/// Casts are stripped from quoted literals, `NULL` means no default, and
/// anything that is not a literal is kept as an expression.
pub fn parse_default_value(default: &str) -> Option<DefaultValue> {
    let trimmed = strip_outer_parens(default.trim());
    if trimmed.is_empty() {
        return None;
    }

    if let Some((literal, cast)) = quoted_literal(trimmed) {
        // `'-1'::integer` is how PostgreSQL prints a negative number.
        if cast.is_some_and(|c| !is_textual_cast(c)) {
            if let Ok(int) = literal.parse::<i64>() {
                return Some(DefaultValue::int(int));
            }
            if literal.parse::<f64>().is_ok_and(f64::is_finite) {
                return Some(DefaultValue::decimal(literal));
            }
        }
        return Some(DefaultValue::string(literal));
    }

    let uncast = trimmed.split("::").next().unwrap_or(trimmed).trim();
    match uncast.to_uppercase().as_str() {
        "NULL" => return None,
        "TRUE" => return Some(DefaultValue::bool(true)),
        "FALSE" => return Some(DefaultValue::bool(false)),
        _ => {}
    }
    if let Ok(int) = uncast.parse::<i64>() {
        return Some(DefaultValue::int(int));
    }
    if uncast.parse::<f64>().is_ok_and(f64::is_finite) {
        return Some(DefaultValue::decimal(uncast));
    }

    Some(DefaultValue::expr(trimmed))
}

fn is_textual_cast(cast: &str) -> bool {
    let cast = cast.trim().to_lowercase();
    ["text", "character", "char", "bpchar", "varchar", "character varying"]
        .iter()
        .any(|t| cast == *t || cast.starts_with(&format!("{t}(")))
}

/// `'text'` or `'text'::type`, with `''` unescaped. Returns the text and the
/// cast target, if any.
fn quoted_literal(s: &str) -> Option<(String, Option<&str>)> {
    let rest = s.strip_prefix('\'')?;
    let mut out = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '\'' {
            out.push(c);
            continue;
        }
        if chars.peek().is_some_and(|(_, next)| *next == '\'') {
            chars.next();
            out.push('\'');
            continue;
        }
        let tail = rest[i + 1..].trim();
        if tail.is_empty() {
            return Some((out, None));
        }
        return tail.strip_prefix("::").map(|cast| (out, Some(cast)));
    }
    None
}

/// Catalog queries for PostgreSQL.
pub mod postgres_queries {
    /// Base tables of a namespace.
    pub const TABLES: &str = r#"
        SELECT table_name, table_schema
        FROM information_schema.tables
        WHERE table_schema = $1 AND table_type = 'BASE TABLE' AND table_name = ANY($2)
        ORDER BY table_name
    "#;

    /// Columns of a table.
    pub const COLUMNS: &str = r#"
        SELECT
            column_name,
            data_type,
            character_maximum_length,
            numeric_precision,
            numeric_scale,
            is_nullable = 'YES' AS is_nullable,
            column_default,
            is_identity = 'YES' AS is_identity,
            ordinal_position
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2
        ORDER BY ordinal_position
    "#;

    /// Key constraints of a table, one row per constraint.
    pub const CONSTRAINTS: &str = r#"
        SELECT
            c.conname AS constraint_name,
            CASE c.contype
                WHEN 'p' THEN 'PRIMARY KEY'
                WHEN 'u' THEN 'UNIQUE'
                WHEN 'f' THEN 'FOREIGN KEY'
                ELSE 'CHECK'
            END AS constraint_type,
            ARRAY(
                SELECT a.attname FROM unnest(c.conkey) WITH ORDINALITY k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
                ORDER BY k.ord
            ) AS columns,
            rt.relname AS referenced_table,
            ARRAY(
                SELECT a.attname FROM unnest(c.confkey) WITH ORDINALITY k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = c.confrelid AND a.attnum = k.attnum
                ORDER BY k.ord
            ) AS referenced_columns,
            CASE c.confdeltype
                WHEN 'c' THEN 'CASCADE' WHEN 'r' THEN 'RESTRICT'
                WHEN 'n' THEN 'SET NULL' WHEN 'd' THEN 'SET DEFAULT'
                ELSE 'NO ACTION'
            END AS on_delete,
            CASE c.confupdtype
                WHEN 'c' THEN 'CASCADE' WHEN 'r' THEN 'RESTRICT'
                WHEN 'n' THEN 'SET NULL' WHEN 'd' THEN 'SET DEFAULT'
                ELSE 'NO ACTION'
            END AS on_update
        FROM pg_constraint c
        JOIN pg_class t ON c.conrelid = t.oid
        JOIN pg_namespace n ON t.relnamespace = n.oid
        LEFT JOIN pg_class rt ON c.confrelid = rt.oid
        WHERE n.nspname = $1 AND t.relname = $2
        ORDER BY c.conname
    "#;

    /// Indexes of a table, with expressions and predicates.
    pub const INDEXES: &str = r#"
        SELECT
            i.relname AS index_name,
            ARRAY(
                SELECT pg_get_indexdef(ix.indexrelid, k.ord::int, true)
                FROM generate_subscripts(ix.indkey, 1) WITH ORDINALITY k(sub, ord)
                ORDER BY k.ord
            ) AS columns,
            ix.indisunique AS is_unique,
            ix.indisprimary AS is_primary,
            am.amname AS index_method,
            pg_get_expr(ix.indpred, ix.indrelid) AS predicate
        FROM pg_index ix
        JOIN pg_class i ON ix.indexrelid = i.oid
        JOIN pg_class t ON ix.indrelid = t.oid
        JOIN pg_namespace n ON t.relnamespace = n.oid
        JOIN pg_am am ON i.relam = am.oid
        WHERE n.nspname = $1 AND t.relname = $2
    "#;

    /// Sequences of a namespace.
    pub const SEQUENCES: &str = r#"
        SELECT
            sequencename,
            start_value,
            increment_by,
            min_value,
            max_value,
            cycle,
            cache_size
        FROM pg_sequences
        WHERE schemaname = $1
        ORDER BY sequencename
    "#;
}
