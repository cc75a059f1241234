//! Presence checks over the codespace configuration files.
//!
//! [`validate`] reads the devcontainer definition, its setup script and the
//! notebook under a root directory and returns a [`Report`]. Missing or
//! malformed files show up as failed checks, never as errors.

pub mod devcontainer;
pub mod notebook;

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;

pub const DEVCONTAINER_PATH: &str = ".devcontainer/devcontainer.json";
pub const SETUP_SCRIPT_PATH: &str = ".devcontainer/setup.sh";
pub const NOTEBOOK_PATH: &str = "Video2X_Codespace_Adapted.ipynb";

/// A single named check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub detail: Option<String>,
}

impl Check {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// A failed check carrying the reason a file could not be used.
    pub fn from_error(name: impl Into<String>, err: &ValidationError) -> Self {
        Self::new(name, false).with_detail(err.to_string())
    }
}

/// Checks grouped under a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub checks: Vec<Check>,
}

impl Section {
    pub fn new(title: impl Into<String>, checks: Vec<Check>) -> Self {
        Self {
            title: title.into(),
            checks,
        }
    }
}

/// Everything [`validate`] found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    /// True iff every check in every section passed.
    pub fn passed(&self) -> bool {
        self.checks().all(|c| c.passed)
    }

    pub fn checks(&self) -> impl Iterator<Item = &Check> {
        self.sections.iter().flat_map(|s| s.checks.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks().filter(|c| !c.passed)
    }

    fn push(&mut self, title: &str, checks: Vec<Check>) {
        self.sections.push(Section::new(title, checks));
    }
}

/// Run every check against the files under `root`.
///
/// A missing or invalid devcontainer definition stops validation early:
/// nothing else is meaningful without it.
pub fn validate(root: &Path) -> Report {
    let mut report = Report::default();

    let config = match read_json(&root.join(DEVCONTAINER_PATH)) {
        Ok(config) => config,
        Err(err) => {
            debug!(error = %err, "devcontainer definition unusable");
            report.push("DevContainer", vec![Check::from_error("devcontainer.json", &err)]);
            return report;
        }
    };
    report.push(
        "DevContainer",
        vec![Check::new("devcontainer.json is valid JSON", true)],
    );
    report.push("Configuration", devcontainer::config_checks(&config));

    match read_text(&root.join(SETUP_SCRIPT_PATH)) {
        Ok(script) => {
            let mut checks = vec![Check::new("Setup script exists", true)];
            checks.extend(devcontainer::setup_checks(&script));
            report.push("Setup Script", checks);
        }
        Err(err) => report.push("Setup Script", vec![Check::from_error("Setup script", &err)]),
    }

    let checks = match read_json(&root.join(NOTEBOOK_PATH)) {
        Ok(nb) => {
            let mut checks = vec![Check::new(format!("{NOTEBOOK_PATH} exists"), true)];
            checks.extend(notebook::notebook_checks(&nb));
            checks
        }
        Err(err) => vec![Check::from_error(NOTEBOOK_PATH, &err)],
    };
    report.push("Notebook", checks);

    report
}

fn read_text(path: &Path) -> Result<String, ValidationError> {
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ValidationError::Missing {
            path: path.to_path_buf(),
        },
        _ => ValidationError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })
}

fn read_json(path: &Path) -> Result<Value, ValidationError> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| ValidationError::Malformed {
        path: PathBuf::from(path),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_passes() {
        assert!(Report::default().passed());
    }

    #[test]
    fn one_failure_fails_report() {
        let mut report = Report::default();
        report.push("A", vec![Check::new("ok", true)]);
        report.push("B", vec![Check::new("ok", true), Check::new("bad", false)]);
        assert!(!report.passed());
        let failed: Vec<_> = report.failures().map(|c| c.name.as_str()).collect();
        assert_eq!(failed, vec!["bad"]);
    }

    #[test]
    fn read_text_maps_not_found_to_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_text(&dir.path().join("nope.sh")).unwrap_err();
        assert!(matches!(err, ValidationError::Missing { .. }));
    }

    #[test]
    fn read_json_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_json(&path).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { .. }));
    }
}
