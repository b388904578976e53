//! Identifier and column type definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::SchemaError;

/// A SQL identifier.
///
/// Unquoted identifiers are case-insensitive and are folded by the target
/// dialect before comparison. Quoted identifiers keep their exact spelling.
/// In text form a quoted identifier is written with surrounding double
/// quotes, e.g. `"Tester"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Ident {
    name: SmolStr,
    quoted: bool,
}

impl Ident {
    /// Create an unquoted identifier.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            quoted: false,
        }
    }

    /// Create a quoted (case-sensitive) identifier.
    pub fn quoted(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            quoted: true,
        }
    }

    /// Parse an identifier, treating a `"..."` wrapper as quoting.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            Self::quoted(trimmed[1..trimmed.len() - 1].replace("\"\"", "\""))
        } else {
            Self::new(trimmed)
        }
    }

    /// Get the name as written, without quotes.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Whether the identifier was quoted.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Case-insensitive key used for construction-time uniqueness checks.
    pub fn case_key(&self) -> SmolStr {
        SmolStr::new(self.name.to_lowercase())
    }

    /// Check whether two identifiers name the same object, ignoring case.
    pub fn eq_ignore_case(&self, other: &Ident) -> bool {
        self.case_key() == other.case_key()
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Ident {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for Ident {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Ident> for String {
    fn from(ident: Ident) -> Self {
        if ident.quoted {
            format!("\"{}\"", ident.name.replace('"', "\"\""))
        } else {
            ident.name.to_string()
        }
    }
}

/// Logical column type with its parameters.
///
/// Two columns have the same type only if the variant *and* every parameter
/// (length, precision, scale) match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Exact numeric.
    Decimal {
        /// Total number of digits.
        precision: Option<u32>,
        /// Digits after the decimal point.
        scale: Option<u32>,
    },
    /// Single precision float.
    Real,
    /// Double precision float.
    Double,
    /// Boolean.
    Boolean,
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string.
    Varchar(Option<u32>),
    /// Unbounded text.
    Text,
    /// Fixed-length binary string.
    Binary(Option<u32>),
    /// Binary large object.
    Blob,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp without time zone.
    Timestamp,
    /// Timestamp with time zone.
    TimestampTz,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
    /// Any other type, stored upper-cased.
    Custom(SmolStr),
}

impl ColumnType {
    /// Whether the type can back an autoincrement column.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::SmallInt | Self::Integer | Self::BigInt)
    }

    /// Whether the type carries a textual value.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Char(_) | Self::Varchar(_) | Self::Text)
    }

    /// Canonical upper-case SQL spelling.
    pub fn as_sql(&self) -> String {
        match self {
            Self::SmallInt => "SMALLINT".to_string(),
            Self::Integer => "INT".to_string(),
            Self::BigInt => "BIGINT".to_string(),
            Self::Decimal {
                precision: Some(p),
                scale: Some(s),
            } => format!("DECIMAL({}, {})", p, s),
            Self::Decimal {
                precision: Some(p),
                scale: None,
            } => format!("DECIMAL({})", p),
            Self::Decimal { .. } => "DECIMAL".to_string(),
            Self::Real => "REAL".to_string(),
            Self::Double => "DOUBLE PRECISION".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::Char(len) => with_length("CHAR", *len),
            Self::Varchar(len) => with_length("VARCHAR", *len),
            Self::Text => "TEXT".to_string(),
            Self::Binary(len) => with_length("BINARY", *len),
            Self::Blob => "BLOB".to_string(),
            Self::Date => "DATE".to_string(),
            Self::Time => "TIME".to_string(),
            Self::Timestamp => "TIMESTAMP".to_string(),
            Self::TimestampTz => "TIMESTAMP WITH TIME ZONE".to_string(),
            Self::Uuid => "UUID".to_string(),
            Self::Json => "JSON".to_string(),
            Self::Custom(name) => name.to_string(),
        }
    }
}

fn with_length(name: &str, len: Option<u32>) -> String {
    match len {
        Some(len) => format!("{}({})", name, len),
        None => name.to_string(),
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_sql())
    }
}

impl FromStr for ColumnType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        if normalized.is_empty() {
            return Err(SchemaError::InvalidType {
                input: s.to_string(),
            });
        }

        let (base, params) = match normalized.find('(') {
            Some(open) => {
                let close = normalized.rfind(')').ok_or_else(|| SchemaError::InvalidType {
                    input: s.to_string(),
                })?;
                if close < open {
                    return Err(SchemaError::InvalidType {
                        input: s.to_string(),
                    });
                }
                let params = normalized[open + 1..close]
                    .split(',')
                    .map(|p| p.trim().parse::<u32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| SchemaError::InvalidType {
                        input: s.to_string(),
                    })?;
                (normalized[..open].trim().to_string(), params)
            }
            None => (normalized.clone(), Vec::new()),
        };

        let first = params.first().copied();
        let ty = match base.as_str() {
            "SMALLINT" | "INT2" => Self::SmallInt,
            "INT" | "INTEGER" | "INT4" => Self::Integer,
            "BIGINT" | "INT8" | "LONG" => Self::BigInt,
            "DECIMAL" | "NUMERIC" => Self::Decimal {
                precision: first,
                scale: params.get(1).copied(),
            },
            "REAL" | "FLOAT4" | "FLOAT" => Self::Real,
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => Self::Double,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "CHAR" | "CHARACTER" => Self::Char(first),
            "VARCHAR" | "CHARACTER VARYING" => Self::Varchar(first),
            "TEXT" | "CLOB" => Self::Text,
            "BINARY" => Self::Binary(first),
            "BLOB" | "BYTEA" | "VARBINARY" => Self::Blob,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "DATETIME" => Self::Timestamp,
            "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => Self::TimestampTz,
            "UUID" => Self::Uuid,
            "JSON" | "JSONB" => Self::Json,
            _ => Self::Custom(SmolStr::new(&normalized)),
        };
        Ok(ty)
    }
}

impl TryFrom<String> for ColumnType {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.as_sql()
    }
}
