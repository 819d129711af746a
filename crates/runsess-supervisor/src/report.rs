//! Report collaborator invocation.
//!
//! Thin trigger for the external plotting tool. Its failure is logged but
//! never changes the session outcome: the session result is defined by
//! whether the engine ran and was reaped, not by reporting.

use crate::config::SessionConfig;
use tokio::process::Command;
use tracing::{info, warn};

/// Invokes the plotting collaborator with the session's CSV paths.
pub struct ReportTrigger {
    command: Vec<String>,
    raw_csv: String,
    trend_csv: String,
    raw_out: String,
    trend_out: String,
}

impl ReportTrigger {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            command: config.report_command.clone(),
            raw_csv: config.raw_csv().display().to_string(),
            trend_csv: config.trend_csv().display().to_string(),
            raw_out: config.raw_plot().display().to_string(),
            trend_out: config.trend_plot().display().to_string(),
        }
    }

    /// Run the report tool. Best-effort: spawn failures and non-zero exits
    /// are logged and swallowed.
    pub async fn trigger(&self) {
        if self.command.is_empty() {
            info!("No report command configured, skipping report generation");
            return;
        }

        let mut command = Command::new(&self.command[0]);
        command.args(&self.command[1..]).args([
            "--raw_csv",
            &self.raw_csv,
            "--trend_csv",
            &self.trend_csv,
            "--raw_out",
            &self.raw_out,
            "--trend_out",
            &self.trend_out,
        ]);

        info!(command = ?self.command, raw_csv = %self.raw_csv, "Triggering report generation");

        match command.output().await {
            Ok(output) if output.status.success() => {
                info!(raw_out = %self.raw_out, trend_out = %self.trend_out, "Report generated");
            }
            Ok(output) => {
                warn!(
                    status = ?output.status.code(),
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "Report tool exited non-zero"
                );
            }
            Err(e) => {
                warn!(?e, command = ?self.command, "Report tool could not be started");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_report(argv: Vec<&str>) -> SessionConfig {
        SessionConfig {
            report_command: argv.into_iter().map(String::from).collect(),
            ..SessionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_empty_command_is_noop() {
        ReportTrigger::new(&config_with_report(vec![])).trigger().await;
    }

    #[tokio::test]
    async fn test_failure_does_not_propagate() {
        ReportTrigger::new(&config_with_report(vec!["false"]))
            .trigger()
            .await;
        ReportTrigger::new(&config_with_report(vec!["/nonexistent/plot-tool"]))
            .trigger()
            .await;
    }

    #[tokio::test]
    async fn test_flags_passed_to_collaborator() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("argv.txt");
        let mut config = config_with_report(vec![]);
        config.report_command = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("echo \"$@\" > {}", out.display()),
            "argv0".to_string(),
        ];
        ReportTrigger::new(&config).trigger().await;

        let recorded = std::fs::read_to_string(&out).unwrap();
        assert!(recorded.contains("--raw_csv"));
        assert!(recorded.contains("--trend_csv"));
        assert!(recorded.contains("--raw_out"));
        assert!(recorded.contains("--trend_out"));
        assert!(recorded.contains("monitor_raw.csv"));
    }
}
