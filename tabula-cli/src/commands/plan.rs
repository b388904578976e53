//! `tabula plan` command - Plan the migration from a snapshot to a schema.

use std::path::PathBuf;

use tabula_migrate::{
    Dialect, InMemoryMetadataReader, MigrationPlanner, PlanningError, ScriptWriter,
};
use tabula_schema::Schema;
use tracing::debug;

use crate::cli::PlanArgs;
use crate::commands::load_schema;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, success, warn};

/// Run the plan command
pub async fn run(args: PlanArgs, config_path: Option<PathBuf>) -> CliResult<()> {
    output::header("Plan Migration");

    let config = Config::discover(config_path.as_deref())?;
    let dialect: Dialect = args.dialect.map(Into::into).unwrap_or(config.dialect.name);
    let capabilities = config.dialect.capabilities(dialect)?;

    let verify = args.verify || config.planner.verify_plans;
    let planner_config = config
        .planner
        .clone()
        .drop_unmapped_columns(args.drop_columns || config.planner.drop_unmapped_columns)
        .verify_plans(false);
    let planner = MigrationPlanner::new(capabilities).with_config(planner_config);

    output::kv("Schema", &args.schema.display().to_string());
    output::kv(
        "Actual",
        &args
            .actual
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(empty database)".to_string()),
    );
    output::kv("Dialect", dialect.as_str());
    output::newline();

    output::step(1, 3, "Loading schemas...");
    let desired = load_schema(&args.schema)?;
    let actual = match &args.actual {
        Some(path) => load_schema(path)?,
        None => Schema::new(),
    };
    let reader = InMemoryMetadataReader::new(actual);

    output::step(2, 3, "Planning...");
    let plan = planner.plan_from_reader(&desired, &reader).await?;

    if verify {
        let drift = planner.verify(&desired, reader.schema(), &plan)?;
        if !drift.is_empty() {
            return Err(CliError::Verification(format!(
                "{} operation(s) left after applying the plan: {}",
                drift.len(),
                drift.summary()
            )));
        }
        debug!("plan verified");
    }

    output::step(3, 3, "Rendering SQL...");
    let sql = dialect.renderer().render_plan(&plan)?;

    output::newline();
    for table in &plan.missing_tables {
        output::info(&format!("Table '{}' does not exist yet and will be created", table));
    }
    for warning in &plan.warnings {
        warn(warning);
    }

    if plan.is_empty() {
        success("Database is up to date");
    } else {
        output::section("Operations");
        for (i, op) in plan.iter().enumerate() {
            output::numbered_item(i + 1, &op.describe());
        }
        output::newline();
        output::section("SQL");
        output::code(&sql.to_script());
        output::kv("Summary", &plan.summary());
    }

    if let Some(name) = &args.write {
        if desired.tables.is_empty() {
            return Err(PlanningError::NoTables.into());
        }
        let dir = args.out.clone().unwrap_or(config.output.dir);
        let path = ScriptWriter::new(dir).write(name, &sql).await?;

        output::newline();
        success(&format!("Wrote {}", path.display()));
        output::kv("Checksum", &sql.checksum());
    }

    Ok(())
}
