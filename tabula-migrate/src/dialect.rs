//! Dialect capabilities.
//!
//! The planner never branches on a concrete database. It asks a
//! [`DialectCapabilities`] implementation, chosen once when the planner is
//! built, what the target can express.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tabula_schema::{ColumnType, Ident};

use crate::compare;
use crate::sql::{H2Renderer, MySqlRenderer, PostgresRenderer, SqliteRenderer, StatementRenderer};

/// How a dialect folds unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierCase {
    /// Fold to upper case (SQL standard, H2).
    #[default]
    Upper,
    /// Fold to lower case (PostgreSQL).
    Lower,
    /// Keep the spelling but compare case-insensitively (MySQL, SQLite).
    Preserve,
}

/// Feature support of a target database.
pub trait DialectCapabilities: Send + Sync + fmt::Debug {
    /// Dialect name used in messages.
    fn name(&self) -> &str;

    /// Whether `ALTER TABLE ... ADD COLUMN` is available.
    fn supports_add_column(&self) -> bool;

    /// Whether standalone sequences exist.
    fn supports_create_sequence(&self) -> bool;

    /// Whether an autoincrement column needs an explicitly created sequence.
    fn needs_sequence_for_auto_increment(&self) -> bool;

    /// Whether indexes may carry a filter predicate.
    fn supports_partial_index(&self) -> bool;

    /// Whether indexes may cover expressions.
    fn supports_functional_index(&self) -> bool;

    /// Whether a column type can be changed in place.
    fn supports_alter_column_type(&self) -> bool;

    /// Whether the index access method survives a round trip through the
    /// catalog and therefore takes part in index equivalence.
    fn preserves_index_type(&self) -> bool;

    /// Whether the dialect has a representation for the column type.
    fn supports_column_type(&self, _column_type: &ColumnType) -> bool {
        true
    }

    /// Case folding of unquoted identifiers.
    fn identifier_case(&self) -> IdentifierCase;

    /// Identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Comparison key of an identifier.
    ///
    /// Quoted identifiers compare exactly; unquoted ones are folded.
    fn fold(&self, ident: &Ident) -> SmolStr {
        if ident.is_quoted() {
            return SmolStr::new(ident.as_str());
        }
        match self.identifier_case() {
            IdentifierCase::Upper => SmolStr::new(ident.as_str().to_uppercase()),
            IdentifierCase::Lower | IdentifierCase::Preserve => {
                SmolStr::new(ident.as_str().to_lowercase())
            }
        }
    }

    /// Name of the sequence the dialect creates for an implicit
    /// autoincrement column.
    fn implicit_sequence_name(&self, table: &Ident, column: &Ident) -> Ident {
        implicit_sequence_name(table, column)
    }

    /// Canonical text of a default or index expression.
    fn canonical_expression(&self, expr: &str) -> String {
        compare::canonical_expression(expr)
    }
}

/// `{table}_{column}_seq`, the naming PostgreSQL uses for serial columns.
pub fn implicit_sequence_name(table: &Ident, column: &Ident) -> Ident {
    Ident::new(format!("{}_{}_seq", table.as_str(), column.as_str()))
}

/// Capability set stored as plain data.
///
/// Each field maps to one [`DialectCapabilities`] query, so a configuration
/// file can start from a preset and override individual answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityTable {
    /// Dialect name.
    pub name: String,
    /// `ALTER TABLE ... ADD COLUMN` support.
    pub add_column: bool,
    /// Standalone sequence support.
    pub create_sequence: bool,
    /// Autoincrement needs an explicit sequence.
    pub sequence_for_auto_increment: bool,
    /// Partial index support.
    pub partial_index: bool,
    /// Functional index support.
    pub functional_index: bool,
    /// In-place column type changes.
    pub alter_column_type: bool,
    /// Index access method takes part in equivalence.
    pub preserves_index_type: bool,
    /// Unquoted identifier folding.
    pub identifier_case: IdentifierCase,
    /// Identifier quote character.
    pub quote_char: char,
    /// Column types without a representation, written as SQL type keywords
    /// (for example `TIMESTAMP WITH TIME ZONE`).
    pub unsupported_types: Vec<String>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::h2()
    }
}

impl CapabilityTable {
    /// H2: sequences, no partial or functional indexes, upper-case folding.
    pub fn h2() -> Self {
        Self {
            name: "h2".to_string(),
            add_column: true,
            create_sequence: true,
            sequence_for_auto_increment: false,
            partial_index: false,
            functional_index: false,
            alter_column_type: true,
            preserves_index_type: false,
            identifier_case: IdentifierCase::Upper,
            quote_char: '"',
            unsupported_types: Vec::new(),
        }
    }

    /// PostgreSQL.
    pub fn postgres() -> Self {
        Self {
            name: "postgres".to_string(),
            add_column: true,
            create_sequence: true,
            sequence_for_auto_increment: true,
            partial_index: true,
            functional_index: true,
            alter_column_type: true,
            preserves_index_type: true,
            identifier_case: IdentifierCase::Lower,
            quote_char: '"',
            unsupported_types: Vec::new(),
        }
    }

    /// MySQL 8.
    pub fn mysql() -> Self {
        Self {
            name: "mysql".to_string(),
            add_column: true,
            create_sequence: false,
            sequence_for_auto_increment: false,
            partial_index: false,
            functional_index: true,
            alter_column_type: true,
            preserves_index_type: true,
            identifier_case: IdentifierCase::Preserve,
            quote_char: '`',
            unsupported_types: vec!["TIMESTAMP WITH TIME ZONE".to_string()],
        }
    }

    /// SQLite.
    pub fn sqlite() -> Self {
        Self {
            name: "sqlite".to_string(),
            add_column: true,
            create_sequence: false,
            sequence_for_auto_increment: false,
            partial_index: true,
            functional_index: true,
            alter_column_type: false,
            preserves_index_type: false,
            identifier_case: IdentifierCase::Preserve,
            quote_char: '"',
            unsupported_types: vec!["TIMESTAMP WITH TIME ZONE".to_string()],
        }
    }

    /// Set the add-column answer.
    pub fn add_column(mut self, supported: bool) -> Self {
        self.add_column = supported;
        self
    }

    /// Set the functional index answer.
    pub fn functional_index(mut self, supported: bool) -> Self {
        self.functional_index = supported;
        self
    }

    /// Set the partial index answer.
    pub fn partial_index(mut self, supported: bool) -> Self {
        self.partial_index = supported;
        self
    }

    /// Set the in-place type change answer.
    pub fn alter_column_type(mut self, supported: bool) -> Self {
        self.alter_column_type = supported;
        self
    }
}

/// Base keyword of a type, without parameters.
fn type_keyword(column_type: &ColumnType) -> String {
    let sql = column_type.as_sql();
    match sql.find('(') {
        Some(pos) => sql[..pos].trim().to_string(),
        None => sql,
    }
}

impl DialectCapabilities for CapabilityTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_add_column(&self) -> bool {
        self.add_column
    }

    fn supports_create_sequence(&self) -> bool {
        self.create_sequence
    }

    fn needs_sequence_for_auto_increment(&self) -> bool {
        self.sequence_for_auto_increment
    }

    fn supports_partial_index(&self) -> bool {
        self.partial_index
    }

    fn supports_functional_index(&self) -> bool {
        self.functional_index
    }

    fn supports_alter_column_type(&self) -> bool {
        self.alter_column_type
    }

    fn preserves_index_type(&self) -> bool {
        self.preserves_index_type
    }

    fn supports_column_type(&self, column_type: &ColumnType) -> bool {
        let keyword = type_keyword(column_type);
        !self
            .unsupported_types
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(&keyword))
    }

    fn identifier_case(&self) -> IdentifierCase {
        self.identifier_case
    }

    fn quote_char(&self) -> char {
        self.quote_char
    }
}

/// Supported target databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// H2.
    #[default]
    H2,
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    MySql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// All dialects.
    pub const ALL: [Dialect; 4] = [Self::H2, Self::Postgres, Self::MySql, Self::Sqlite];

    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H2 => "h2",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Preset capability table.
    pub fn capabilities(&self) -> CapabilityTable {
        match self {
            Self::H2 => CapabilityTable::h2(),
            Self::Postgres => CapabilityTable::postgres(),
            Self::MySql => CapabilityTable::mysql(),
            Self::Sqlite => CapabilityTable::sqlite(),
        }
    }

    /// Statement renderer for this dialect.
    pub fn renderer(&self) -> Box<dyn StatementRenderer> {
        match self {
            Self::H2 => Box::new(H2Renderer),
            Self::Postgres => Box::new(PostgresRenderer),
            Self::MySql => Box::new(MySqlRenderer),
            Self::Sqlite => Box::new(SqliteRenderer),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "h2" => Ok(Self::H2),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(format!("unknown dialect `{other}`")),
        }
    }
}
