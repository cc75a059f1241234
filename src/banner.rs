//! Run banner and result summary display.

use std::path::Path;
use std::time::Duration;

use crate::consts::{AUTHOR, format_elapsed};
use crate::invoker::ProcessResult;

/// What is about to run, for display in the banner.
pub struct BannerInfo<'a> {
    pub image: &'a str,
    pub runtime: &'a str,
    pub workspace: &'a Path,
    pub input: &'a Path,
    pub output: &'a Path,
    pub processor: &'a str,
    pub scale: u32,
    /// `None` for processors that take no model.
    pub model: Option<&'a str>,
}

/// Print the banner describing the upcoming container run.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   v2x {} by {}

   image      {} (via {})
   workspace  {}
   input      {}
   output     {}
   processor  {}, {}x"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        info.image,
        info.runtime,
        info.workspace.display(),
        info.input.display(),
        info.output.display(),
        info.processor,
        info.scale,
    );
    if let Some(model) = info.model {
        println!("   model      {model}");
    }
    println!();
}

/// Print the outcome of a run.
pub fn print_result(result: &ProcessResult, elapsed: Duration) {
    match (&result.output_path, result.success) {
        (Some(output), true) => {
            println!("✓ done in {}: {}", format_elapsed(elapsed), output.display());
        }
        _ => {
            match result.exit_code {
                Some(code) => println!("✗ failed after {} (exit {code})", format_elapsed(elapsed)),
                None => println!("✗ failed after {}", format_elapsed(elapsed)),
            }
            if let Some(stderr) = result.stderr.as_deref().map(str::trim)
                && !stderr.is_empty()
            {
                println!("\n{stderr}");
            }
        }
    }
}
