//! `hookprobe config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use hookprobe_core::config::HookprobeConfig;
use hookprobe_core::error::HookprobeError;

use crate::cli::{ConfigAction, ConfigArgs, DEFAULT_CONFIG_PATH};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
const SECTIONS: [&str; 5] = ["general", "integration", "verify", "load", "metrics"];

const REDACTED: &str = "***REDACTED***";

/// Source label used when no file is loaded.
const DEFAULTS_SOURCE: &str = "(defaults)";

/// Loads the effective configuration and names where it came from.
///
/// An explicit path must exist. Without one, `./hookprobe.toml` is used when
/// present; otherwise built-in defaults with environment overrides apply.
pub async fn resolve(path: Option<&Path>) -> Result<(HookprobeConfig, String), HookprobeError> {
    if let Some(path) = path {
        let config = HookprobeConfig::load(path).await?;
        return Ok((config, path.display().to_string()));
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if tokio::fs::try_exists(default_path).await.unwrap_or(false) {
        let config = HookprobeConfig::load(default_path).await?;
        return Ok((config, DEFAULT_CONFIG_PATH.to_owned()));
    }

    let mut config = HookprobeConfig::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok((config, DEFAULTS_SOURCE.to_owned()))
}

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Loads and validates the configuration, reporting the error instead of aborting.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (after rendering the report).
async fn execute_validate(config_path: Option<&Path>, writer: &OutputWriter) -> Result<(), CliError> {
    let report = match resolve(config_path).await {
        Ok((_, source)) => {
            info!(source = %source, "configuration is valid");
            ConfigValidationReport {
                source,
                valid: true,
                errors: Vec::new(),
            }
        }
        Err(e) => ConfigValidationReport {
            source: source_label(config_path),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Shows the effective configuration (file + env overrides + defaults) with secrets redacted.
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` for an unknown section.
async fn execute_show(
    config_path: Option<&Path>,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (mut config, source) = resolve(config_path).await?;
    redact_secrets(&mut config);

    let config_toml = match section.as_deref() {
        None => to_toml(&config),
        Some("general") => to_toml(&config.general),
        Some("integration") => to_toml(&config.integration),
        Some("verify") => to_toml(&config.verify),
        Some("load") => to_toml(&config.load),
        Some("metrics") => to_toml(&config.metrics),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    writer.render(&ConfigReport {
        source,
        section,
        config_toml,
    })?;
    Ok(())
}

fn source_label(config_path: Option<&Path>) -> String {
    match config_path {
        Some(path) => path.display().to_string(),
        None => DEFAULT_CONFIG_PATH.to_owned(),
    }
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Replaces every non-empty credential with a placeholder.
fn redact_secrets(config: &mut HookprobeConfig) {
    for secret in [
        &mut config.integration.store.password,
        &mut config.integration.token,
        &mut config.load.secret,
    ] {
        if !secret.is_empty() {
            *secret = REDACTED.to_owned();
        }
    }
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;
        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid.
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}
