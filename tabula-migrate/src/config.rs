//! Planner configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the migration planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Drop actual columns that the desired table no longer declares.
    ///
    /// Off by default because the dropped data cannot be recovered.
    pub drop_unmapped_columns: bool,
    /// Re-plan against the plan's own result and report any residue.
    pub verify_plans: bool,
}

impl PlannerConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow dropping unmapped columns.
    pub fn drop_unmapped_columns(mut self, allow: bool) -> Self {
        self.drop_unmapped_columns = allow;
        self
    }

    /// Enable plan verification.
    pub fn verify_plans(mut self, verify: bool) -> Self {
        self.verify_plans = verify;
        self
    }
}
