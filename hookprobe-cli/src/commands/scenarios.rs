//! `hookprobe scenarios` command handler

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use hookprobe_core::config::HookprobeConfig;
use hookprobe_core::scenario::{SUFFIX_PLACEHOLDER, Scenario};

use crate::cli::{ScenariosAction, ScenariosArgs};
use crate::commands::scenario_table;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scenarios` command.
pub async fn execute(
    args: ScenariosArgs,
    config: &HookprobeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ScenariosAction::List { verbose } => {
            // Listing shows the placeholder where a run would put its random suffix.
            let table = scenario_table(config, SUFFIX_PLACEHOLDER).await?;
            let report = ScenarioListReport {
                verbose,
                scenarios: table.scenarios().iter().map(ScenarioEntry::from).collect(),
            };
            writer.render(&report)?;
            Ok(())
        }
    }
}

/// One row of `scenarios list`.
#[derive(Serialize)]
pub struct ScenarioEntry {
    pub name: String,
    pub description: String,
    pub queue_key: String,
    pub expectation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub expected_response: String,
    pub payload: Value,
    pub expected: Value,
}

impl From<&Scenario> for ScenarioEntry {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            queue_key: scenario.queue_key(),
            expectation: scenario.expectation.label().to_owned(),
            expected_response: scenario.expected_response.clone(),
            payload: scenario.payload.clone(),
            expected: scenario.expected(),
        }
    }
}

#[derive(Serialize)]
pub struct ScenarioListReport {
    #[serde(skip)]
    pub verbose: bool,
    pub scenarios: Vec<ScenarioEntry>,
}

impl Render for ScenarioListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scenarios ({}):", self.scenarios.len())?;
        writeln!(w)?;
        for entry in &self.scenarios {
            writeln!(w, "  {} [{}]", entry.name.bold(), entry.expectation)?;
            writeln!(w, "    {}", entry.description)?;
            if !entry.expected_response.is_empty() {
                writeln!(w, "    response: {:?}", entry.expected_response)?;
            }
            if self.verbose {
                writeln!(w, "    queue:    {}", entry.queue_key)?;
                writeln!(w, "    payload:  {}", entry.payload)?;
                writeln!(w, "    expected: {}", entry.expected)?;
            }
        }
        Ok(())
    }
}
