//! # tabula
//!
//! Schema diffing and migration planning for relational databases.
//!
//! tabula provides:
//! - A declarative table schema model with structural validation
//! - Differencers for columns, indexes, keys and sequences
//! - A planner emitting ordered, dialect-independent DDL operations
//! - SQL renderers for H2, PostgreSQL, MySQL and SQLite
//!
//! ## Quick Start
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! let desired = Schema::new().with_table(
//!     TableSchema::builder("users")
//!         .column(ColumnSchema::new("id", ColumnType::BigInt).auto_increment())
//!         .column(ColumnSchema::new("email", ColumnType::Varchar(Some(255))).unique())
//!         .primary_key(PrimaryKeySchema::new(["id"]))
//!         .build()?,
//! );
//!
//! let planner = MigrationPlanner::for_dialect(Dialect::Postgres);
//! let plan = planner.plan(&desired, &Schema::new())?;
//! let sql = Dialect::Postgres.renderer().render_plan(&plan)?;
//!
//! assert!(!sql.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Schema model and validation.
pub mod schema {
    pub use tabula_schema::*;
}

/// Differencing, planning and rendering.
pub mod migrate {
    pub use tabula_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        Dialect, DialectCapabilities, MigrationPlan, MigrationPlanner, Operation, PlannerConfig,
        PlanningError, StatementRenderer,
    };
    pub use crate::schema::{
        AutoIncrement, ColumnSchema, ColumnType, DefaultValue, ForeignKeySchema, Ident,
        IndexSchema, PrimaryKeySchema, Schema, Sequence, TableSchema,
    };
}

// Re-export key types at the crate root
pub use migrate::{MigrationPlan, MigrationPlanner, PlanningError};
pub use schema::{Schema, SchemaError};
