//! Command handlers -- one module per subcommand

pub mod config;
pub mod integration;
pub mod load;
pub mod scenarios;

use hookprobe_core::config::HookprobeConfig;
use hookprobe_core::scenario::ScenarioTable;

use crate::error::CliError;

/// Builds the scenario table: the configured scenarios file, or the builtin table.
pub async fn scenario_table(
    config: &HookprobeConfig,
    suffix: &str,
) -> Result<ScenarioTable, CliError> {
    if config.integration.scenarios_file.is_empty() {
        Ok(ScenarioTable::builtin(suffix))
    } else {
        Ok(ScenarioTable::from_file(&config.integration.scenarios_file, suffix).await?)
    }
}
