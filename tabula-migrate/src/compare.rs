//! Canonical forms used when comparing desired and actual values.
//!
//! Defaults and index expressions arrive in whatever spelling the author or
//! the database catalog chose. Before comparing, both sides are rewritten to
//! a canonical text; anything that still differs is treated as a real change.

use tabula_schema::{DefaultValue, Literal};

use crate::dialect::DialectCapabilities;

/// Continuation words of multi-word type names in `::type` casts.
const CAST_CONTINUATIONS: &[&str] = &["VARYING", "PRECISION", "WITH", "WITHOUT", "TIME", "ZONE"];

/// Spellings of the current timestamp that all mean `CURRENT_TIMESTAMP`.
const TIMESTAMP_SYNONYMS: &[&str] = &[
    "NOW()",
    "CURRENT_TIMESTAMP()",
    "LOCALTIMESTAMP",
    "LOCALTIMESTAMP()",
    "TRANSACTION_TIMESTAMP()",
    "GETDATE()",
];

/// Canonical text of an SQL expression.
///
/// Whitespace is collapsed and keywords upper-cased outside string literals,
/// PostgreSQL `::type` casts and redundant outer parentheses are removed,
/// numeric literals are normalised and timestamp synonyms are mapped to
/// `CURRENT_TIMESTAMP`.
pub fn canonical_expression(expr: &str) -> String {
    let folded = fold_outside_literals(expr.trim());
    let uncast = strip_casts(&folded);
    let tight = tighten_punctuation(&uncast);
    let mut out = strip_outer_parens(&tight).to_string();

    if TIMESTAMP_SYNONYMS.contains(&out.as_str()) {
        out = "CURRENT_TIMESTAMP".to_string();
    }
    if let Some(number) = normalize_numeric(&out) {
        out = number;
    }
    out
}

/// Canonical text of a column default, or `None` for "no default".
///
/// A `NULL` literal is the same as no default. String literals keep their
/// exact content, so `' '` and `''` stay distinct.
pub fn canonical_default(
    capabilities: &dyn DialectCapabilities,
    default: Option<&DefaultValue>,
) -> Option<String> {
    let text = match default? {
        DefaultValue::Literal(Literal::Null) => return None,
        DefaultValue::Literal(Literal::String(s)) => Literal::String(s.clone()).to_sql(),
        DefaultValue::Literal(Literal::Integer(i)) => i.to_string(),
        DefaultValue::Literal(Literal::Decimal(d)) => {
            normalize_numeric(d).unwrap_or_else(|| d.to_string())
        }
        DefaultValue::Literal(Literal::Float(f)) => {
            let text = f.to_string();
            normalize_numeric(&text).unwrap_or(text)
        }
        DefaultValue::Literal(Literal::Boolean(b)) => Literal::Boolean(*b).to_sql(),
        DefaultValue::Expression(expr) => capabilities.canonical_expression(expr),
    };

    if text == "NULL" { None } else { Some(text) }
}

/// Whether two defaults are equivalent under the dialect's canonicalization.
pub fn defaults_equal(
    capabilities: &dyn DialectCapabilities,
    desired: Option<&DefaultValue>,
    actual: Option<&DefaultValue>,
) -> bool {
    canonical_default(capabilities, desired) == canonical_default(capabilities, actual)
}

/// Normalise a numeric literal, returning `None` if the text is not one.
///
/// `1`, `1.0`, `+1.00` and `01` all normalise to `1`; `1.50` becomes `1.5`.
pub fn normalize_numeric(text: &str) -> Option<String> {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };

    let plain = !(int_part.is_empty() && frac_part.is_empty())
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit());

    if !plain {
        // Scientific notation and the like.
        let value: f64 = text.parse().ok()?;
        if !value.is_finite() || text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
            return None;
        }
        return Some(value.to_string());
    }

    let int_part = int_part.trim_start_matches('0');
    let frac_part = frac_part.trim_end_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };

    let mut out = String::new();
    let is_zero = int_part == "0" && frac_part.is_empty();
    if negative && !is_zero {
        out.push('-');
    }
    out.push_str(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    Some(out)
}

/// Collapse whitespace and upper-case everything outside `'...'` literals
/// and `"..."` quoted identifiers.
fn fold_outside_literals(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                if chars.peek() == Some(&q) {
                    out.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;

        if c == '\'' || c == '"' {
            quote = Some(c);
            out.push(c);
        } else {
            out.extend(c.to_uppercase());
        }
    }
    out
}

/// Remove `::type` casts, including multi-word and parameterised types.
fn strip_casts(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let bytes = expr.as_bytes();
    let mut in_literal = false;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c == b'\'' {
            in_literal = !in_literal;
        }
        if !in_literal && c == b':' && bytes.get(i + 1) == Some(&b':') {
            i += 2;
            i = skip_type_name(expr, i);
            continue;
        }
        // Safe to push byte-wise: only ASCII bytes are ever skipped.
        let ch_len = utf8_len(c);
        out.push_str(&expr[i..i + ch_len]);
        i += ch_len;
    }
    out
}

fn skip_type_name(expr: &str, mut i: usize) -> usize {
    let bytes = expr.as_bytes();
    let word = |from: usize| -> usize {
        let mut j = from;
        while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_' || bytes[j] == b'"') {
            j += 1;
        }
        j
    };

    i = word(i);
    loop {
        if bytes.get(i) == Some(&b' ') {
            let end = word(i + 1);
            if CAST_CONTINUATIONS.contains(&&expr[i + 1..end]) {
                i = end;
                continue;
            }
        }
        break;
    }
    if bytes.get(i) == Some(&b'(')
        && let Some(close) = expr[i..].find(')')
        && expr[i + 1..i + close].bytes().all(|b| b.is_ascii_digit() || b == b',' || b == b' ')
    {
        i += close + 1;
    }
    if expr[i..].starts_with("[]") {
        i += 2;
    }
    i
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

/// Drop spaces next to parentheses and commas outside literals.
fn tighten_punctuation(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut in_literal = false;
    let chars: Vec<char> = expr.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '\'' {
            in_literal = !in_literal;
        }
        if !in_literal && c == ' ' {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let call = next == Some('(') && prev.is_some_and(|p| p.is_alphanumeric() || p == '_');
            if call || matches!(prev, Some('(') | Some(',')) || matches!(next, Some(')') | Some(',')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Strip parentheses that wrap the whole expression.
pub(crate) fn strip_outer_parens(mut expr: &str) -> &str {
    while expr.starts_with('(') && expr.ends_with(')') && wraps_whole(expr) {
        expr = expr[1..expr.len() - 1].trim();
    }
    expr
}

fn wraps_whole(expr: &str) -> bool {
    let mut depth = 0usize;
    let mut in_literal = false;
    for (i, c) in expr.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != expr.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::CapabilityTable;

    #[test]
    fn test_normalize_numeric() {
        assert_eq!(normalize_numeric("1").as_deref(), Some("1"));
        assert_eq!(normalize_numeric("1.0").as_deref(), Some("1"));
        assert_eq!(normalize_numeric("+001.500").as_deref(), Some("1.5"));
        assert_eq!(normalize_numeric("-0.0").as_deref(), Some("0"));
        assert_eq!(normalize_numeric(".5").as_deref(), Some("0.5"));
        assert_eq!(normalize_numeric("1e3").as_deref(), Some("1000"));
        assert_eq!(normalize_numeric("abc"), None);
        assert_eq!(normalize_numeric("inf"), None);
        assert_eq!(normalize_numeric(""), None);
    }

    #[test]
    fn test_canonical_expression_whitespace_and_case() {
        assert_eq!(canonical_expression("  lower( email )  "), "LOWER(EMAIL)");
        assert_eq!(canonical_expression("a   +  b"), "A + B");
    }

    #[test]
    fn test_canonical_expression_keeps_literals() {
        assert_eq!(canonical_expression("'Hello  World'"), "'Hello  World'");
        assert_eq!(canonical_expression("'it''s'"), "'it''s'");
    }

    #[test]
    fn test_canonical_expression_strips_casts() {
        assert_eq!(canonical_expression("'abc'::character varying"), "'abc'");
        assert_eq!(canonical_expression("'x'::varchar(20)"), "'x'");
        assert_eq!(canonical_expression("(0)::numeric"), "0");
    }

    #[test]
    fn test_canonical_expression_timestamp_synonyms() {
        assert_eq!(canonical_expression("now()"), "CURRENT_TIMESTAMP");
        assert_eq!(canonical_expression("CURRENT_TIMESTAMP"), "CURRENT_TIMESTAMP");
        assert_eq!(canonical_expression("(current_timestamp())"), "CURRENT_TIMESTAMP");
    }

    #[test]
    fn test_canonical_expression_keeps_quoted_identifiers() {
        assert_eq!(canonical_expression("lower(\"Email\")"), "LOWER(\"Email\")");
        assert_ne!(
            canonical_expression("lower(\"Email\")"),
            canonical_expression("lower(\"EMAIL\")")
        );
        assert_eq!(canonical_expression("lower( \"Email\" )"), "LOWER(\"Email\")");
    }

    #[test]
    fn test_outer_parens_only_when_wrapping() {
        assert_eq!(canonical_expression("((1))"), "1");
        assert_eq!(canonical_expression("(a) + (b)"), "(A) + (B)");
    }

    #[test]
    fn test_defaults_numeric_constructors_equal() {
        let caps = CapabilityTable::h2();
        assert!(defaults_equal(&caps, Some(&DefaultValue::int(1)), Some(&DefaultValue::decimal("1.0"))));
        assert!(defaults_equal(&caps, Some(&DefaultValue::float(1.0)), Some(&DefaultValue::expr("1"))));
        assert!(!defaults_equal(&caps, Some(&DefaultValue::int(1)), Some(&DefaultValue::int(2))));
    }

    #[test]
    fn test_defaults_whitespace_is_significant() {
        let caps = CapabilityTable::h2();
        let space = DefaultValue::string(" ");
        let empty = DefaultValue::string("");

        assert!(defaults_equal(&caps, Some(&space), Some(&space)));
        assert!(!defaults_equal(&caps, Some(&empty), Some(&space)));
        assert!(!defaults_equal(&caps, Some(&space), None));
        assert!(!defaults_equal(&caps, Some(&empty), None));
    }

    #[test]
    fn test_null_default_is_no_default() {
        let caps = CapabilityTable::postgres();
        assert!(defaults_equal(&caps, Some(&DefaultValue::null()), None));
        assert!(defaults_equal(&caps, Some(&DefaultValue::expr("null")), None));
    }

    #[test]
    fn test_literal_and_expression_compare_by_rendered_form() {
        let caps = CapabilityTable::postgres();
        assert!(defaults_equal(
            &caps,
            Some(&DefaultValue::string("active")),
            Some(&DefaultValue::expr("'active'::text")),
        ));
        assert!(defaults_equal(
            &caps,
            Some(&DefaultValue::bool(true)),
            Some(&DefaultValue::expr("true")),
        ));
    }
}
