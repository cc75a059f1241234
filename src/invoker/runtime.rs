use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use crate::consts::DEFAULT_RUNTIME;

/// Captured result of one runtime invocation that actually ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stderr, or stdout when the process wrote nothing to stderr.
    pub fn into_diagnostics(self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout
        } else {
            self.stderr
        }
    }
}

/// Something that can launch a container image. Docker, podman, or a test double.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Program name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Run the runtime with `args` from `work_dir` and wait for it to exit.
    ///
    /// `Err` means the process could not be started at all. A nonzero exit
    /// is reported through [`CommandOutput::code`].
    async fn run(&self, args: &[OsString], work_dir: &Path) -> Result<CommandOutput>;
}

/// Launches a docker-compatible CLI as a child process.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    program: String,
}

impl DockerRuntime {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME)
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    fn name(&self) -> &str {
        &self.program
    }

    async fn run(&self, args: &[OsString], work_dir: &Path) -> Result<CommandOutput> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("cannot run {} in {}", self.program, work_dir.display()))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
