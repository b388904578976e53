//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tabula_migrate::{CapabilityTable, Dialect, PlannerConfig};

use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "tabula.toml";

/// Default script directory (relative to project root)
pub const SCRIPTS_DIR: &str = "migrations";

/// tabula CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target dialect and capability overrides
    pub dialect: DialectConfig,

    /// Planner options
    pub planner: PlannerConfig,

    /// Script output
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the given file, or `tabula.toml` in the working directory if it
    /// exists, or the defaults.
    pub fn discover(explicit: Option<&Path>) -> CliResult<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path);
        }

        let default = std::env::current_dir()?.join(CONFIG_FILE_NAME);
        if default.exists() {
            Self::load(&default)
        } else {
            Ok(Self::default())
        }
    }
}

/// Dialect configuration
///
/// Keys other than `name` override the preset capability table of the
/// chosen dialect:
///
/// ```toml
/// [dialect]
/// name = "postgres"
/// partial_index = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectConfig {
    /// Dialect name
    pub name: Dialect,

    /// Capability overrides
    #[serde(flatten)]
    pub overrides: toml::Table,
}

impl DialectConfig {
    /// Capability table for `dialect`, with the overrides applied.
    pub fn capabilities(&self, dialect: Dialect) -> CliResult<CapabilityTable> {
        if self.overrides.is_empty() {
            return Ok(dialect.capabilities());
        }

        let toml::Value::Table(mut table) = toml::Value::try_from(dialect.capabilities())? else {
            return Err(CliError::Config("capability table is not a table".to_string()));
        };
        for (key, value) in &self.overrides {
            if !table.contains_key(key) {
                return Err(CliError::Config(format!("unknown dialect setting `{}`", key)));
            }
            table.insert(key.clone(), value.clone());
        }

        Ok(toml::Value::Table(table).try_into()?)
    }
}

/// Script output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory scripts are written to
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(SCRIPTS_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dialect.name, Dialect::H2);
        assert_eq!(config.output.dir, PathBuf::from("migrations"));
        assert!(!config.planner.verify_plans);
    }

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
            [dialect]
            name = "postgres"
            partial_index = false

            [planner]
            verify_plans = true

            [output]
            dir = "db/scripts"
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect.name, Dialect::Postgres);
        assert!(config.planner.verify_plans);
        assert_eq!(config.output.dir, PathBuf::from("db/scripts"));

        let caps = config.dialect.capabilities(Dialect::Postgres).unwrap();
        assert!(!caps.partial_index);
        assert!(caps.functional_index);
        assert_eq!(caps.name, "postgres");
    }

    #[test]
    fn test_unknown_override_rejected() {
        let config: Config = toml::from_str(
            r#"
            [dialect]
            name = "h2"
            bogus = true
            "#,
        )
        .unwrap();
        assert!(config.dialect.capabilities(Dialect::H2).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[dialect]\nname = \"mysql\"\n").unwrap();

        let config = Config::discover(Some(&path)).unwrap();
        assert_eq!(config.dialect.name, Dialect::MySql);
        assert!(Config::discover(Some(&temp.path().join("missing.toml"))).is_err());
    }
}
