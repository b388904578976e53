//! # tabula-migrate
//!
//! Schema diffing and migration planning for tabula.
//!
//! This crate provides:
//! - Dialect capability descriptions for H2, PostgreSQL, MySQL and SQLite
//! - Column, index, constraint and sequence differencers
//! - A migration planner producing ordered, dialect-independent operations
//! - Metadata introspection of live databases into schema snapshots
//! - SQL rendering per dialect and `.sql` script output
//! - Shadow verification of generated plans
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────────┐
//! │ Desired      │────▶│  Differencers  │────▶│ Migration Plan  │
//! └──────────────┘     └────────────────┘     └─────────────────┘
//!                              ▲                       │
//! ┌──────────────┐             │                       ▼
//! │ Metadata     │─────────────┘              ┌─────────────────┐
//! │ Reader       │                            │ Statement       │
//! └──────────────┘                            │ Renderer        │
//!                                             └─────────────────┘
//! ```
//!
//! The planner never touches a connection. Reading the actual schema and
//! executing the rendered statements are left to the caller.
//!
//! ## Example
//!
//! ```rust
//! use tabula_migrate::{Dialect, MigrationPlanner};
//! use tabula_schema::{ColumnSchema, ColumnType, PrimaryKeySchema, Schema, TableSchema};
//!
//! let desired = Schema::new().with_table(
//!     TableSchema::builder("tester")
//!         .column(ColumnSchema::new("bar", ColumnType::Integer))
//!         .primary_key(PrimaryKeySchema::new(["bar"]))
//!         .build()?,
//! );
//! let actual = Schema::new().with_table(
//!     TableSchema::builder("tester")
//!         .column(ColumnSchema::new("bar", ColumnType::Integer))
//!         .build()?,
//! );
//!
//! let planner = MigrationPlanner::for_dialect(Dialect::H2);
//! let plan = planner.plan(&desired, &actual)?;
//! let sql = Dialect::H2.renderer().render_plan(&plan)?;
//!
//! assert_eq!(sql.statements, vec!["ALTER TABLE TESTER ADD PRIMARY KEY (BAR)"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compare;
pub mod config;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod introspect;
pub mod operation;
pub mod planner;
pub mod script;
pub mod shadow;
pub mod sql;

pub use config::PlannerConfig;
pub use dialect::{CapabilityTable, Dialect, DialectCapabilities, IdentifierCase};
pub use error::{PlanResult, PlanningError};
pub use introspect::{InMemoryMetadataReader, MetadataReader, SnapshotBuilder, read_snapshot};
pub use operation::{MigrationPlan, Operation};
pub use planner::MigrationPlanner;
pub use script::{ScriptWriter, write_migration_script};
pub use shadow::{ShadowSchema, verify_plan};
pub use sql::{
    H2Renderer, MigrationSql, MySqlRenderer, PostgresRenderer, SqliteRenderer, StatementRenderer,
};
