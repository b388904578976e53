//! `tabula validate` command - Validate a schema file.

use tabula_schema::Schema;

use crate::cli::ValidateArgs;
use crate::commands::load_schema;
use crate::error::CliResult;
use crate::output::{self, success, warn};

/// Run the validate command
pub async fn run(args: ValidateArgs) -> CliResult<()> {
    output::header("Validate Schema");

    output::kv("Schema", &args.schema.display().to_string());
    output::newline();

    // Reading the file runs every structural check.
    output::step(1, 2, "Parsing and validating schema...");
    let schema = load_schema(&args.schema)?;

    output::step(2, 2, "Checking for common issues...");
    let warnings = check_schema(&schema);

    output::newline();
    if warnings.is_empty() {
        success("Schema is valid!");
    } else {
        success("Schema is valid with warnings:");
        output::newline();
        for warning in &warnings {
            warn(warning);
        }
    }

    output::newline();
    output::section("Schema Summary");
    output::kv("Tables", &schema.tables.len().to_string());
    output::kv("Sequences", &schema.all_sequences().len().to_string());

    let columns: usize = schema.tables().map(|t| t.columns.len()).sum();
    let indexes: usize = schema.tables().map(|t| t.indexes.len()).sum();
    let foreign_keys: usize = schema.tables().map(|t| t.foreign_keys.len()).sum();
    output::kv("Columns", &columns.to_string());
    output::kv("Indexes", &indexes.to_string());
    output::kv("Foreign Keys", &foreign_keys.to_string());

    Ok(())
}

/// Valid but suspicious definitions.
fn check_schema(schema: &Schema) -> Vec<String> {
    let mut warnings = Vec::new();

    if schema.tables.is_empty() {
        warnings.push("Schema declares no tables".to_string());
    }

    for table in schema.tables() {
        if table.primary_key.is_none() {
            warnings.push(format!("Table '{}' has no primary key", table.name()));
        }
        if table.columns.is_empty() {
            warnings.push(format!("Table '{}' has no columns", table.name()));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_schema::{ColumnSchema, ColumnType, TableSchema};

    #[test]
    fn test_check_schema_warnings() {
        assert_eq!(check_schema(&Schema::new()), vec!["Schema declares no tables".to_string()]);

        let schema = Schema::new().with_table(
            TableSchema::builder("log")
                .column(ColumnSchema::new("line", ColumnType::Text))
                .build()
                .unwrap(),
        );
        assert_eq!(check_schema(&schema), vec!["Table 'log' has no primary key".to_string()]);
    }
}
