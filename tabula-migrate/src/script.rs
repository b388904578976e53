//! Migration script files.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tabula_schema::Schema;
use tracing::info;

use crate::error::{PlanResult, PlanningError};
use crate::planner::MigrationPlanner;
use crate::sql::{MigrationSql, StatementRenderer};

/// Writes rendered migrations as `.sql` files.
#[derive(Debug, Clone)]
pub struct ScriptWriter {
    /// Directory scripts are written to.
    dir: PathBuf,
}

impl ScriptWriter {
    /// Create a writer for a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a script of this name is written to.
    pub fn script_path(&self, name: &str) -> PathBuf {
        if name.ends_with(".sql") {
            self.dir.join(name)
        } else {
            self.dir.join(format!("{}.sql", name))
        }
    }

    /// Ensure the output directory exists.
    pub async fn ensure_dir(&self) -> PlanResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Write a script, replacing any existing file of the same name.
    pub async fn write(&self, name: &str, sql: &MigrationSql) -> PlanResult<PathBuf> {
        self.ensure_dir().await?;

        let path = self.script_path(name);
        tokio::fs::write(&path, render_script(sql)).await?;

        info!(
            path = %path.display(),
            statements = sql.len(),
            dialect = %sql.dialect,
            "wrote migration script"
        );
        Ok(path)
    }
}

/// Script text: a header comment followed by the terminated statements.
pub fn render_script(sql: &MigrationSql) -> String {
    let mut script = format!(
        "-- dialect: {}\n-- generated: {}\n-- checksum: {}\n\n",
        sql.dialect,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        sql.checksum()
    );
    script.push_str(&sql.to_script());
    script
}

/// Plan, render and write a migration script in one call.
///
/// Fails with [`PlanningError::NoTables`] when `desired` declares no tables.
pub async fn write_migration_script(
    planner: &MigrationPlanner,
    renderer: &dyn StatementRenderer,
    desired: &Schema,
    actual: &Schema,
    dir: impl AsRef<Path>,
    name: &str,
) -> PlanResult<PathBuf> {
    if desired.tables.is_empty() {
        return Err(PlanningError::NoTables);
    }

    let plan = planner.plan(desired, actual)?;
    let sql = renderer.render_plan(&plan)?;

    ScriptWriter::new(dir.as_ref()).write(name, &sql).await
}
