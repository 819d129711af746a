//! Build collaborator invocation.
//!
//! Two opaque steps, `<command> clean` then `<command> all`, preceded by
//! the optional strategy code generator. Success is the exit code; captured
//! output is carried in the error for diagnostics only.

use crate::config::BuildSection;
use crate::error::{AppError, AppResult};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{info, warn};

/// Runs the pre-build generator and the clean/all build steps.
pub struct BuildStep {
    command: String,
    generator: Option<Vec<String>>,
    workdir: Option<PathBuf>,
}

impl BuildStep {
    pub fn new(section: &BuildSection) -> Self {
        Self {
            command: section.command.clone(),
            generator: section.generator.clone(),
            workdir: section.workdir.clone(),
        }
    }

    /// Run generator (if configured), then `clean`, then `all`.
    /// Any failure aborts the session before a single process is spawned.
    pub async fn run(&self) -> AppResult<()> {
        if let Some(generator) = &self.generator {
            if generator.is_empty() {
                warn!("Empty generator argv, skipping code generation");
            } else {
                self.run_step("generate", generator.clone()).await?;
            }
        }

        self.run_step("clean", vec![self.command.clone(), "clean".to_string()])
            .await?;
        self.run_step("all", vec![self.command.clone(), "all".to_string()])
            .await?;

        info!(command = %self.command, "Build succeeded");
        Ok(())
    }

    async fn run_step(&self, step: &str, argv: Vec<String>) -> AppResult<()> {
        let rendered = argv.join(" ");
        info!(step, command = %rendered, "Running build step");

        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| AppError::Build {
            step: step.to_string(),
            command: rendered.clone(),
            output: e.to_string(),
        })?;

        if !output.status.success() {
            let mut captured = String::from_utf8_lossy(&output.stderr).into_owned();
            if captured.trim().is_empty() {
                captured = String::from_utf8_lossy(&output.stdout).into_owned();
            }
            return Err(AppError::Build {
                step: step.to_string(),
                command: rendered,
                output: captured,
            });
        }

        Ok(())
    }
}
