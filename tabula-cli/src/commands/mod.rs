//! CLI command implementations.

pub mod plan;
pub mod validate;
pub mod version;

use std::path::Path;

use tabula_schema::Schema;

use crate::error::{CliError, CliResult};

/// Read and validate a schema file.
pub(crate) fn load_schema(path: &Path) -> CliResult<Schema> {
    if !path.exists() {
        return Err(CliError::Schema(format!(
            "Schema file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| CliError::Schema(format!("{}: {}", path.display(), e)))
}
