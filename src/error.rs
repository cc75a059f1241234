//! Domain error types.
//!
//! Neither error escapes its module as a hard failure: [`InvokeError`] is
//! folded into a failed [`ProcessResult`](crate::invoker::ProcessResult) and
//! [`ValidationError`] into a failed [`Check`](crate::validate::Check).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a container invocation did not produce an output file.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch {runtime}: {reason:#}")]
    Launch {
        runtime: String,
        reason: anyhow::Error,
    },

    #[error("{runtime} exited with {}", describe_exit(*code))]
    Failed {
        runtime: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl InvokeError {
    /// Diagnostic text to surface to the caller.
    pub fn diagnostics(&self) -> String {
        match self {
            InvokeError::Failed { stderr, .. } if !stderr.trim().is_empty() => stderr.clone(),
            other => other.to_string(),
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            InvokeError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// A configuration file the checks depend on is absent or unusable.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{} not found", path.display())]
    Missing { path: PathBuf },

    #[error("{} could not be read: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not valid JSON: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
