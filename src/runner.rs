//! Launch the external test runner over the output directory.

use crate::config::{ExitPolicy, RunnerConfig};
use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// What happened to the test runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerOutcome {
    /// The runner finished with this status
    Finished(ExitStatus),
    /// The runner was started and left running
    Detached,
    /// No runner was requested
    Skipped,
}

impl RunnerOutcome {
    /// Exit code this process should report under `policy`.
    pub fn exit_code(&self, policy: ExitPolicy) -> u8 {
        match (self, policy) {
            (RunnerOutcome::Finished(status), ExitPolicy::Propagate) if !status.success() => {
                status
                    .code()
                    .and_then(|c| u8::try_from(c).ok())
                    .filter(|c| *c != 0)
                    .unwrap_or(1)
            }
            _ => 0,
        }
    }
}

/// The runner invocation template.
#[derive(Debug, Clone)]
pub struct TestRunner {
    program: String,
    args: Vec<String>,
    preload: Option<PathBuf>,
    policy: ExitPolicy,
}

impl TestRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            preload: config.preload.clone(),
            policy: config.exit_policy,
        }
    }

    /// Arguments with `{preload}` and `{output}` substituted. Both are made
    /// absolute since the runner starts inside the output directory.
    pub fn command_args(&self, output_dir: &Path) -> Vec<String> {
        let output = absolute(output_dir);
        let preload = self.preload.as_deref().map(absolute).unwrap_or_default();
        let output = output.to_string_lossy();
        let preload = preload.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{preload}", &preload).replace("{output}", &output))
            .collect()
    }

    /// Start the runner in `output_dir` with our stdin/stdout/stderr.
    ///
    /// Whether we wait for it depends on the exit policy; the exit code
    /// itself is interpreted by [`RunnerOutcome::exit_code`].
    pub async fn run(&self, output_dir: &Path) -> Result<RunnerOutcome, PipelineError> {
        let program = self.resolve_program();
        let args = self.command_args(output_dir);
        tracing::info!(program = %program, ?args, "running tests in {}", output_dir.display());

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(output_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| PipelineError::RunnerSpawn {
                program: program.clone(),
                source,
            })?;

        if self.policy == ExitPolicy::Detach {
            tracing::debug!(pid = ?child.id(), "test runner detached");
            return Ok(RunnerOutcome::Detached);
        }

        let status = child
            .wait()
            .await
            .map_err(|source| PipelineError::RunnerSpawn {
                program: program.clone(),
                source,
            })?;
        if status.success() {
            tracing::info!("test runner passed");
        } else {
            tracing::warn!("test runner failed: {}", status);
        }
        Ok(RunnerOutcome::Finished(status))
    }

    /// The runner starts in the output directory, so a relative program path
    /// like `./node_modules/.bin/mocha` is resolved against our working
    /// directory first. Bare names are left for `PATH` lookup.
    fn resolve_program(&self) -> String {
        let path = Path::new(&self.program);
        if path.components().count() > 1 && path.is_relative() {
            absolute(path).to_string_lossy().into_owned()
        } else {
            self.program.clone()
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
