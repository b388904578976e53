//! Primary key and foreign key constraints.

use serde::{Deserialize, Serialize};

use super::Ident;

/// Referential actions for foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// No action (deferred check).
    #[default]
    NoAction,
    /// Restrict the operation (error if references exist).
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to null.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ReferentialAction {
    /// Parse from the spelling used by `information_schema`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "NO ACTION" | "NOACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" | "SETNULL" => Some(Self::SetNull),
            "SET DEFAULT" | "SETDEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// Get the action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// The primary key of a table.
///
/// Column order is significant: `(a, b)` and `(b, a)` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeySchema {
    /// Constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Ident>,
    /// Key columns in order.
    pub columns: Vec<Ident>,
}

impl PrimaryKeySchema {
    /// Create an unnamed primary key.
    pub fn new<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Ident>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the constraint name.
    pub fn named(mut self, name: impl Into<Ident>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of key columns.
    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyPart {
    /// Column on the owning table.
    pub column: Ident,
    /// Referenced table.
    pub referenced_table: Ident,
    /// Referenced column.
    pub referenced_column: Ident,
}

/// A foreign key constraint.
///
/// A composite key is a single constraint whose parts all reference the
/// same table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    /// Constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Ident>,
    /// Column pairs in order.
    pub parts: Vec<ForeignKeyPart>,
    /// Action on update of the referenced row.
    #[serde(default)]
    pub on_update: ReferentialAction,
    /// Action on delete of the referenced row.
    #[serde(default)]
    pub on_delete: ReferentialAction,
}

impl ForeignKeySchema {
    /// Create a single-column foreign key.
    pub fn new(
        column: impl Into<Ident>,
        referenced_table: impl Into<Ident>,
        referenced_column: impl Into<Ident>,
    ) -> Self {
        Self::composite([column], referenced_table, [referenced_column])
    }

    /// Create a composite foreign key.
    ///
    /// Columns are paired positionally; a length mismatch is reported by
    /// validation rather than here.
    pub fn composite<L, R, C, D>(columns: L, referenced_table: impl Into<Ident>, referenced: R) -> Self
    where
        L: IntoIterator<Item = C>,
        R: IntoIterator<Item = D>,
        C: Into<Ident>,
        D: Into<Ident>,
    {
        let table: Ident = referenced_table.into();
        let columns: Vec<Ident> = columns.into_iter().map(Into::into).collect();
        let referenced: Vec<Ident> = referenced.into_iter().map(Into::into).collect();
        let len = columns.len().max(referenced.len());

        let parts = (0..len)
            .map(|i| ForeignKeyPart {
                column: columns.get(i).cloned().unwrap_or_else(|| Ident::new("")),
                referenced_table: table.clone(),
                referenced_column: referenced.get(i).cloned().unwrap_or_else(|| Ident::new("")),
            })
            .collect();

        Self {
            name: None,
            parts,
            on_update: ReferentialAction::default(),
            on_delete: ReferentialAction::default(),
        }
    }

    /// Set the constraint name.
    pub fn named(mut self, name: impl Into<Ident>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the on delete action.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the on update action.
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    /// The referenced table (taken from the first part).
    pub fn referenced_table(&self) -> Option<&Ident> {
        self.parts.first().map(|p| &p.referenced_table)
    }

    /// Local columns in order.
    pub fn columns(&self) -> impl Iterator<Item = &Ident> {
        self.parts.iter().map(|p| &p.column)
    }

    /// Referenced columns in order.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &Ident> {
        self.parts.iter().map(|p| &p.referenced_column)
    }

    /// Number of column pairs.
    pub fn arity(&self) -> usize {
        self.parts.len()
    }
}
