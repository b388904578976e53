//! Column default values.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A column default: either a literal value or an SQL expression.
///
/// "No default" is expressed as `Option::<DefaultValue>::None` on the column,
/// never as an empty literal. An empty string literal is a real default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// A literal value.
    Literal(Literal),
    /// An SQL expression such as `CURRENT_TIMESTAMP` or `nextval('s')`.
    Expression(SmolStr),
}

/// A literal default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    /// String literal. Whitespace is significant.
    String(String),
    /// Integer literal.
    Integer(i64),
    /// Exact decimal literal kept as text, e.g. `"10.50"`.
    Decimal(SmolStr),
    /// Floating point literal.
    Float(f64),
    /// Boolean literal.
    Boolean(bool),
    /// SQL `NULL`.
    Null,
}

impl DefaultValue {
    /// String literal default.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    /// Integer literal default.
    pub fn int(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    /// Decimal literal default.
    pub fn decimal(value: impl Into<SmolStr>) -> Self {
        Self::Literal(Literal::Decimal(value.into()))
    }

    /// Float literal default.
    pub fn float(value: f64) -> Self {
        Self::Literal(Literal::Float(value))
    }

    /// Boolean literal default.
    pub fn bool(value: bool) -> Self {
        Self::Literal(Literal::Boolean(value))
    }

    /// `NULL` default.
    pub fn null() -> Self {
        Self::Literal(Literal::Null)
    }

    /// Expression default.
    pub fn expr(expression: impl Into<SmolStr>) -> Self {
        Self::Expression(expression.into())
    }

    /// Whether this default is the `NULL` literal.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Literal(Literal::Null))
    }

    /// Render the default as SQL text, as it would appear after `DEFAULT`.
    pub fn to_sql(&self) -> String {
        match self {
            Self::Literal(literal) => literal.to_sql(),
            Self::Expression(expr) => expr.to_string(),
        }
    }
}

impl Literal {
    /// Render the literal as SQL text.
    pub fn to_sql(&self) -> String {
        match self {
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Integer(i) => i.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Boolean(true) => "TRUE".to_string(),
            Self::Boolean(false) => "FALSE".to_string(),
            Self::Null => "NULL".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_literal_escapes_quotes() {
        assert_eq!(DefaultValue::string("it's").to_sql(), "'it''s'");
    }

    #[test]
    fn test_whitespace_literal_is_preserved() {
        assert_eq!(DefaultValue::string(" ").to_sql(), "' '");
        assert_eq!(DefaultValue::string("").to_sql(), "''");
        assert_ne!(DefaultValue::string(" "), DefaultValue::string(""));
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(DefaultValue::int(42).to_sql(), "42");
        assert_eq!(DefaultValue::decimal("10.50").to_sql(), "10.50");
        assert_eq!(DefaultValue::float(1.5).to_sql(), "1.5");
    }

    #[test]
    fn test_expression_default() {
        let default = DefaultValue::expr("CURRENT_TIMESTAMP");
        assert_eq!(default.to_sql(), "CURRENT_TIMESTAMP");
        assert!(!default.is_null());
        assert!(DefaultValue::null().is_null());
    }
}
