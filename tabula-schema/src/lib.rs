//! # tabula-schema
//!
//! Declarative table schema model for the tabula migration planner.
//!
//! This crate provides:
//! - Identifier, column type and default value types
//! - Table, index, key and sequence descriptions
//! - Structural validation (duplicate columns, dangling references, key arity)
//!
//! ## Example
//!
//! ```rust
//! use tabula_schema::{ColumnSchema, ColumnType, PrimaryKeySchema, TableSchema};
//!
//! let table = TableSchema::builder("tester")
//!     .column(ColumnSchema::new("bar", ColumnType::Integer))
//!     .primary_key(PrimaryKeySchema::new(["bar"]))
//!     .build()?;
//!
//! assert_eq!(table.name(), "tester");
//! # Ok::<(), tabula_schema::SchemaError>(())
//! ```

pub mod ast;
pub mod error;
pub mod validator;

pub use ast::*;
pub use error::{SchemaError, SchemaResult};
pub use validator::{Validator, validate_tables};
