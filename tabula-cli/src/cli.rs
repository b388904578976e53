//! CLI argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tabula_migrate::Dialect;

/// tabula - Schema diff and migration planner
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(version)]
#[command(about = "tabula - Schema diff and migration planner", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to the configuration file (defaults to ./tabula.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a schema file
    Validate(ValidateArgs),

    /// Plan the migration from a snapshot to a schema
    Plan(PlanArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Validate Command
// =============================================================================

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the schema file
    pub schema: PathBuf,
}

// =============================================================================
// Plan Command
// =============================================================================

/// Arguments for the `plan` command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the desired schema file
    pub schema: PathBuf,

    /// Snapshot of the current database (empty database when omitted)
    #[arg(short, long)]
    pub actual: Option<PathBuf>,

    /// Target dialect (overrides the configuration file)
    #[arg(short, long)]
    pub dialect: Option<DialectArg>,

    /// Write the rendered statements to a script of this name
    #[arg(short, long, value_name = "NAME")]
    pub write: Option<String>,

    /// Output directory for scripts (overrides the configuration file)
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Re-plan against the plan's result and report drift
    #[arg(long)]
    pub verify: bool,

    /// Drop columns the schema no longer declares
    #[arg(long)]
    pub drop_columns: bool,
}

/// Supported dialects
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectArg {
    H2,
    #[value(alias = "postgresql")]
    Postgres,
    Mysql,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::H2 => Dialect::H2,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::parse_from([
            "tabula", "-v", "plan", "schema.toml", "--dialect", "postgresql", "--write", "init",
        ]);
        assert_eq!(cli.verbose, 1);
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.dialect, Some(DialectArg::Postgres));
        assert_eq!(args.write.as_deref(), Some("init"));
        assert!(args.actual.is_none());
    }
}
