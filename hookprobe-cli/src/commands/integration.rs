//! `hookprobe integration` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use hookprobe_core::client::ReqwestWebhookClient;
use hookprobe_core::config::HookprobeConfig;
use hookprobe_core::runner::{Failure, ScenarioRunner, SuiteReport};
use hookprobe_core::scenario::random_suffix;
use hookprobe_core::store::RedisStore;
use hookprobe_core::verifier::SideEffectVerifier;

use crate::cli::IntegrationArgs;
use crate::commands::scenario_table;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `integration` command.
///
/// # Errors
///
/// - `CliError::Config` for an unreadable scenarios file or unknown `--only` names
/// - `CliError::StoreUnavailable` when Redis cannot be reached
/// - `CliError::ScenariosFailed` when any scenario failed (after rendering the report)
pub async fn execute(
    args: IntegrationArgs,
    config: &HookprobeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let suffix = random_suffix();
    let table = scenario_table(config, &suffix).await?;
    let selected = table.select(&args.only)?;

    let client = ReqwestWebhookClient::for_integration(&config.integration)
        .map_err(|e| CliError::Config(e.to_string()))?;
    let store = RedisStore::connect(&config.integration.store)
        .await
        .map_err(|e| CliError::StoreUnavailable(e.to_string()))?;
    let verifier = SideEffectVerifier::from_config(store, &config.verify);
    let runner = ScenarioRunner::new(client, verifier, config.integration.base_url.as_str());

    info!(suffix = %suffix, scenarios = selected.len(), "running integration suite");
    let suite = runner.run(&selected).await;

    let report = IntegrationReport { suffix, suite };
    writer.render(&report)?;

    if !report.suite.passed() {
        return Err(CliError::ScenariosFailed {
            failed: report.suite.failed_count(),
            total: report.suite.scenarios.len(),
        });
    }
    Ok(())
}

/// Suite result plus the random suffix used in payloads.
#[derive(Serialize)]
pub struct IntegrationReport {
    pub suffix: String,
    #[serde(flatten)]
    pub suite: SuiteReport,
}

impl Render for IntegrationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Integration run {} (suffix: {})",
            self.suite.run_id.bold(),
            self.suffix
        )?;
        writeln!(w)?;

        for scenario in &self.suite.scenarios {
            if scenario.passed() {
                writeln!(
                    w,
                    "  {} {} {}",
                    "✓".green(),
                    scenario.case_name,
                    format!("{}ms", scenario.duration_ms).dimmed()
                )?;
                continue;
            }
            writeln!(
                w,
                "  {} {} {}",
                "✗".red(),
                scenario.case_name,
                format!("{}ms", scenario.duration_ms).dimmed()
            )?;
            for failure in &scenario.failures {
                writeln!(w, "      - {}", failure.to_string().red())?;
                if let Failure::SideEffectMismatch { differences, .. } = failure {
                    for difference in differences {
                        writeln!(w, "          {difference}")?;
                    }
                }
            }
        }

        writeln!(w)?;
        let rate = self.suite.checks_rate() * 100.0;
        let summary = format!(
            "checks: {}/{} passed ({rate:.2}%)",
            self.suite.passed_count(),
            self.suite.scenarios.len()
        );
        if self.suite.passed() {
            writeln!(w, "{}", summary.green().bold())?;
        } else {
            writeln!(w, "{}", summary.red().bold())?;
        }
        writeln!(w, "duration: {}ms", self.suite.duration_ms)?;
        Ok(())
    }
}
