//! tabula CLI - Schema diffing and migration planning.

use clap::Parser;

use tabula_cli::cli::{Cli, Command};
use tabula_cli::commands;
use tabula_cli::error::CliResult;
use tabula_cli::output;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    output::init_tracing(cli.verbose);

    match cli.command {
        Command::Validate(args) => commands::validate::run(args).await,
        Command::Plan(args) => commands::plan::run(args, cli.config).await,
        Command::Version => commands::version::run().await,
    }
}
