//! Sequence definitions.

use serde::{Deserialize, Serialize};

use super::Ident;

/// A database sequence.
///
/// Sequences are identified by name only. They are not owned by any table
/// and may outlive the columns that draw from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence name.
    pub name: Ident,
    /// First value handed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    /// Step between values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<i64>,
    /// Lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    /// Upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
    /// Whether the sequence wraps around at its bound.
    #[serde(default)]
    pub cycle: bool,
    /// Number of values pre-allocated per session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<i64>,
}

impl Sequence {
    /// Create a sequence with database defaults for every parameter.
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            start: None,
            increment: None,
            min_value: None,
            max_value: None,
            cycle: false,
            cache: None,
        }
    }

    /// Set the start value.
    pub fn start_with(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the increment.
    pub fn increment_by(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }

    /// Set the minimum value.
    pub fn min_value(mut self, min: i64) -> Self {
        self.min_value = Some(min);
        self
    }

    /// Set the maximum value.
    pub fn max_value(mut self, max: i64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Enable cycling.
    pub fn cycle(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Set the cache size.
    pub fn cache(mut self, cache: i64) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Check the parameters for internal consistency.
    pub fn check(&self) -> Result<(), String> {
        if self.increment == Some(0) {
            return Err("increment must not be zero".to_string());
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value)
            && min > max
        {
            return Err(format!("min value {} exceeds max value {}", min, max));
        }
        if let Some(start) = self.start {
            if self.min_value.is_some_and(|min| start < min) {
                return Err(format!("start value {} is below the minimum", start));
            }
            if self.max_value.is_some_and(|max| start > max) {
                return Err(format!("start value {} is above the maximum", start));
            }
        }
        if self.cache.is_some_and(|cache| cache < 1) {
            return Err("cache size must be at least 1".to_string());
        }
        Ok(())
    }
}
