use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::runtime::{CommandOutput, ContainerRuntime};

/// One recorded call to [`MockRuntime::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub args: Vec<OsString>,
    pub work_dir: PathBuf,
}

/// A scripted runtime for tests. Replays outputs in order and records every call.
pub struct MockRuntime {
    outputs: Mutex<Vec<Result<CommandOutput>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockRuntime {
    pub fn new(outputs: Vec<Result<CommandOutput>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into_iter().rev().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A runtime whose every call exits 0 with no output.
    pub fn succeeding(calls: usize) -> Self {
        Self::new((0..calls).map(|_| Ok(Self::exit(0, ""))).collect())
    }

    /// Build an output with the given exit code and stderr.
    pub fn exit(code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, args: &[OsString], work_dir: &Path) -> Result<CommandOutput> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Invocation {
                args: args.to_vec(),
                work_dir: work_dir.to_path_buf(),
            });
            calls.len()
        };
        self.outputs
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(anyhow!("MockRuntime: no more outputs (called {n} times)")))
    }
}
