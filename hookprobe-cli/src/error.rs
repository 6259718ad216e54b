//! CLI-specific error types and exit code mapping

use hookprobe_core::error::{HookprobeError, ScenarioError};

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The side-effect store could not be reached.
    #[error("store not reachable: {0}")]
    StoreUnavailable(String),

    /// At least one integration scenario failed.
    #[error("{failed} of {total} scenario(s) failed")]
    ScenariosFailed { failed: usize, total: usize },

    /// At least one load threshold was breached.
    #[error("{0} threshold(s) breached")]
    ThresholdsBreached(usize),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from hookprobe-core.
    #[error("{0}")]
    Core(#[from] HookprobeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                       |
    /// |------|-------------------------------|
    /// | 0    | Success                       |
    /// | 1    | General / command error       |
    /// | 2    | Configuration error           |
    /// | 3    | Store unreachable             |
    /// | 4    | Scenario failures             |
    /// | 5    | Load thresholds breached      |
    /// | 10   | IO error                      |
    ///
    /// `load run` exits with 130 on a second Ctrl-C without building a `CliError`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(HookprobeError::Config(_)) => 2,
            Self::StoreUnavailable(_) | Self::Core(HookprobeError::Store(_)) => 3,
            Self::ScenariosFailed { .. } => 4,
            Self::ThresholdsBreached(_) => 5,
            Self::Io(_) | Self::Core(HookprobeError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

/// Scenario table problems (bad file, unknown `--only` name) are configuration errors.
impl From<ScenarioError> for CliError {
    fn from(e: ScenarioError) -> Self {
        Self::Config(e.to_string())
    }
}
