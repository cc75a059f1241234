//! Host environment check: which tools are installed and whether the image
//! has been pulled.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::invoker::runtime::ContainerRuntime;

/// Optional host tools, with what they are used for.
const OPTIONAL_TOOLS: &[(&str, &str)] = &[
    ("nvidia-smi", "GPU check"),
    ("ffmpeg", "previewing results"),
    ("python3", "notebook kernel"),
    ("jupyter", "notebook server"),
];

/// Whether one host tool was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub name: String,
    pub purpose: String,
    pub required: bool,
    pub location: Option<PathBuf>,
}

/// Result of [`diagnose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub tools: Vec<ToolStatus>,
    pub image: String,
    /// `None` when the runtime is missing and the image was not queried.
    pub image_present: Option<bool>,
}

impl Diagnosis {
    /// Required tools are present and the image is available.
    pub fn healthy(&self) -> bool {
        self.tools
            .iter()
            .filter(|t| t.required)
            .all(|t| t.location.is_some())
            && self.image_present == Some(true)
    }

    /// One-line image status for the report.
    pub fn image_line(&self) -> String {
        match self.image_present {
            Some(true) => format!("✓ image        {}", self.image),
            Some(false) => format!(
                "✗ image        {} not available locally (pull it, then rerun doctor)",
                self.image
            ),
            None => "- image        not checked (no container runtime)".to_string(),
        }
    }
}

/// Look for the runtime, the optional tools and the image, using `$PATH`.
pub async fn diagnose(runtime: &dyn ContainerRuntime, image: &str, work_dir: &Path) -> Diagnosis {
    let path_var = std::env::var_os("PATH");
    diagnose_with(path_var.as_deref(), runtime, image, work_dir).await
}

/// [`diagnose`] against an explicit search path.
pub async fn diagnose_with(
    path_var: Option<&OsStr>,
    runtime: &dyn ContainerRuntime,
    image: &str,
    work_dir: &Path,
) -> Diagnosis {
    let mut tools = vec![ToolStatus {
        name: runtime.name().to_string(),
        purpose: "container runtime".to_string(),
        required: true,
        location: find_program(runtime.name(), path_var),
    }];
    tools.extend(OPTIONAL_TOOLS.iter().map(|(name, purpose)| ToolStatus {
        name: name.to_string(),
        purpose: purpose.to_string(),
        required: false,
        location: find_program(name, path_var),
    }));

    let image_present = if tools[0].location.is_some() {
        Some(image_available(runtime, image, work_dir).await)
    } else {
        None
    };

    Diagnosis {
        tools,
        image: image.to_string(),
        image_present,
    }
}

/// Ask the runtime whether `image` exists locally.
pub async fn image_available(runtime: &dyn ContainerRuntime, image: &str, work_dir: &Path) -> bool {
    let args: Vec<OsString> = vec!["image".into(), "inspect".into(), image.into()];
    match runtime.run(&args, work_dir).await {
        Ok(output) => output.success(),
        Err(err) => {
            debug!(error = %err, "image inspect could not run");
            false
        }
    }
}

/// Resolve `program` against `path_var`. Names containing a separator are
/// checked as given.
pub fn find_program(program: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    std::env::split_paths(path_var?)
        .map(|dir| dir.join(program))
        .find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
