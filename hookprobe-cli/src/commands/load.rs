//! `hookprobe load` command handler

use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hookprobe_core::client::ReqwestWebhookClient;
use hookprobe_core::config::LoadConfig;
use hookprobe_core::load::{LoadDriver, LoadReport, PlannedStage, Ramp};

use crate::cli::{LoadAction, LoadArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `load` command.
pub async fn execute(
    args: LoadArgs,
    config: &LoadConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        LoadAction::Run { url } => execute_run(config, url, writer).await,
        LoadAction::Plan => execute_plan(config, writer),
    }
}

/// Runs the ramp until it completes or Ctrl-C is pressed.
///
/// # Errors
///
/// Returns `CliError::ThresholdsBreached` when any gate failed (after rendering the report).
async fn execute_run(
    config: &LoadConfig,
    url: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = config.clone();
    if let Some(url) = url {
        config.url = url;
    }

    let client =
        ReqwestWebhookClient::for_load(&config).map_err(|e| CliError::Config(e.to_string()))?;
    let driver = LoadDriver::from_config(client, &config)
        .map_err(|e| CliError::Config(e.to_string()))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if watch_interrupts(interrupt, tokio::signal::ctrl_c).await {
            eprintln!("interrupted twice, aborting without a report");
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
    });

    let result = driver.run(cancel).await;
    signal_task.abort();
    let report = result.map_err(hookprobe_core::error::HookprobeError::from)?;

    writer.render(&report)?;

    let breached = report.thresholds.iter().filter(|c| !c.passed).count();
    if breached > 0 {
        return Err(CliError::ThresholdsBreached(breached));
    }
    Ok(())
}

/// Exit code when a second Ctrl-C aborts the drain (128 + SIGINT).
const INTERRUPT_EXIT_CODE: i32 = 130;

/// Cancels `cancel` on the first signal, then waits for a second one.
///
/// Returns `true` when a second signal arrived while draining, `false` when
/// the signal source failed.
async fn watch_interrupts<F, Fut>(cancel: CancellationToken, mut next_signal: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    warn!("interrupted, draining virtual users (press Ctrl-C again to abort)");
    cancel.cancel();
    next_signal().await.is_ok()
}

fn execute_plan(config: &LoadConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let ramp = Ramp::from_config(config).map_err(|e| CliError::Config(e.to_string()))?;
    info!(stages = ramp.stages().len(), "resolved load plan");
    writer.render(&PlanReport::new(&config.url, &ramp))?;
    Ok(())
}

impl Render for LoadReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let s = &self.summary;
        writeln!(w, "Load run {} against {}", self.run_id.bold(), self.url)?;
        if self.cancelled {
            writeln!(w, "  {}", "run was interrupted before the ramp finished".yellow())?;
        }
        writeln!(w)?;
        writeln!(
            w,
            "  http_reqs ............ {} ({:.1}/s)",
            s.requests, s.requests_per_second
        )?;
        writeln!(
            w,
            "  http_req_failed ...... {:.4}% ({} bad status, {} transport)",
            s.failure_rate * 100.0,
            s.bad_status,
            s.transport_errors
        )?;
        let l = &s.latency;
        writeln!(
            w,
            "  http_req_duration .... min={:.2}ms avg={:.2}ms p(50)={:.2}ms p(90)={:.2}ms",
            l.min_ms, l.mean_ms, l.p50_ms, l.p90_ms
        )?;
        writeln!(
            w,
            "                         p(95)={:.2}ms p(99)={:.2}ms p(99.9)={:.2}ms max={:.2}ms",
            l.p95_ms, l.p99_ms, l.p999_ms, l.max_ms
        )?;
        writeln!(w, "  vus_max .............. {}", s.peak_vus)?;
        writeln!(
            w,
            "  duration ............. {}",
            humantime::format_duration(Duration::from_millis(s.duration_ms))
        )?;

        writeln!(w)?;
        writeln!(w, "Thresholds:")?;
        for check in &self.thresholds {
            let mark = if check.passed {
                "✓".green()
            } else {
                "✗".red()
            };
            let unit = if check.unit == "ms" { "ms" } else { "" };
            writeln!(
                w,
                "  {} {}: {:.4}{unit} < {}{unit}",
                mark, check.metric, check.actual, check.bound
            )?;
        }
        Ok(())
    }
}

/// Resolved ramp, printed by `load plan`.
#[derive(Serialize)]
pub struct PlanReport {
    pub url: String,
    pub start_vus: u32,
    pub peak_vus: u32,
    pub total_duration_ms: u64,
    pub stages: Vec<PlannedStage>,
}

impl PlanReport {
    fn new(url: &str, ramp: &Ramp) -> Self {
        let stages = ramp.plan();
        Self {
            url: url.to_owned(),
            start_vus: stages.first().map_or(0, |s| s.from),
            peak_vus: ramp.peak(),
            total_duration_ms: ramp.total_duration().as_millis() as u64,
            stages,
        }
    }
}

impl Render for PlanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Load plan for {}", self.url.bold())?;
        writeln!(w)?;
        writeln!(
            w,
            "  {:<6} {:<10} {:<10} {:>6} -> {:<6}",
            "STAGE", "STARTS", "DURATION", "FROM", "TO"
        )?;
        for stage in &self.stages {
            writeln!(
                w,
                "  {:<6} {:<10} {:<10} {:>6} -> {:<6}",
                stage.index + 1,
                humantime::format_duration(Duration::from_millis(stage.starts_at_ms)).to_string(),
                humantime::format_duration(Duration::from_millis(stage.duration_ms)).to_string(),
                stage.from,
                stage.to
            )?;
        }
        writeln!(w)?;
        writeln!(
            w,
            "  peak {} VUs, total {}",
            self.peak_vus,
            humantime::format_duration(Duration::from_millis(self.total_duration_ms))
        )?;
        Ok(())
    }
}
