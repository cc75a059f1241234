//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Container image that does the actual processing.
pub const DEFAULT_IMAGE: &str = "ghcr.io/k4yt3x/video2x:latest";

/// Program used to launch the image.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Real-ESRGAN model passed when none is specified.
pub const DEFAULT_MODEL: &str = "realesr-animevideov3";

/// Workspace mounted into the container when none is configured.
pub const DEFAULT_WORKSPACE: &str = "/workspaces/video2x-codespace";

/// Mount point of the workspace inside the container.
pub const CONTAINER_MOUNT: &str = "/host";

/// Frame rate accepted by `interpolate`. Not forwarded to the container.
pub const DEFAULT_TARGET_FPS: u32 = 60;

/// Suffix appended to the input stem when deriving an output path.
pub const OUTPUT_SUFFIX: &str = "_upscaled";

/// Sample video used by the smoke test, relative to the input directory.
pub const SMOKE_SAMPLE: &str = "test_sample.mp4";

/// Default number of runs shown by `v2x history`.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Default database path: `~/.v2x/v2x.db`.
/// Single DB for settings and run history.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".v2x").join("v2x.db"))
}

/// Format a duration as `42s`, `3m 07s` or `1h 02m 09s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}
