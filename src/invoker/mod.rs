//! Wrapper around the Video2X container.
//!
//! [`Video2x`] turns an [`UpscaleRequest`] into a `run` command for a
//! [`ContainerRuntime`], waits for it, and folds every failure into a
//! [`ProcessResult`]. Nothing here touches video data directly.

pub mod mock;
pub mod runtime;

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{CONTAINER_MOUNT, DEFAULT_IMAGE, DEFAULT_MODEL, OUTPUT_SUFFIX};
use crate::error::InvokeError;
use runtime::{ContainerRuntime, DockerRuntime};

/// Scale used when a request does not set one.
pub const DEFAULT_SCALE: NonZeroU32 = match NonZeroU32::new(2) {
    Some(n) => n,
    None => panic!("scale must be nonzero"),
};

/// Processing algorithm requested from the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Processor {
    /// Real-ESRGAN upscaling. The only processor that takes a model.
    Realesrgan,
    /// Anime4K upscaling.
    Anime4k,
    /// RIFE frame interpolation.
    Rife,
}

impl Processor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Processor::Realesrgan => "realesrgan",
            Processor::Anime4k => "anime4k",
            Processor::Rife => "rife",
        }
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single upscale (or interpolation) job.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleRequest {
    pub input: PathBuf,
    /// Derived from the input name when absent.
    pub output: Option<PathBuf>,
    pub processor: Processor,
    pub scale: NonZeroU32,
    /// Real-ESRGAN model. Ignored by other processors.
    pub model: Option<String>,
}

impl UpscaleRequest {
    /// Real-ESRGAN at 2x with the default model and a derived output path.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            processor: Processor::Realesrgan,
            scale: DEFAULT_SCALE,
            model: None,
        }
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn processor(mut self, processor: Processor) -> Self {
        self.processor = processor;
        self
    }

    pub fn scale(mut self, scale: NonZeroU32) -> Self {
        self.scale = scale;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The same job as frame interpolation: RIFE at scale 1.
    pub fn for_interpolation(&self) -> Self {
        Self {
            processor: Processor::Rife,
            scale: NonZeroU32::MIN,
            ..self.clone()
        }
    }
}

/// Outcome of one invocation. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
}

impl ProcessResult {
    pub fn succeeded(output_path: PathBuf) -> Self {
        Self {
            success: true,
            output_path: Some(output_path),
            stderr: None,
            exit_code: Some(0),
        }
    }

    pub fn failed(err: &InvokeError) -> Self {
        Self {
            success: false,
            output_path: None,
            stderr: Some(err.diagnostics()),
            exit_code: err.exit_code(),
        }
    }
}

/// Runs the Video2X image against a mounted workspace.
pub struct Video2x {
    workspace: PathBuf,
    output_dir: PathBuf,
    image: String,
    runtime: Arc<dyn ContainerRuntime>,
}

impl Video2x {
    /// Docker-backed wrapper with outputs under `<workspace>/output`.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self {
            output_dir: workspace.join("output"),
            workspace,
            image: DEFAULT_IMAGE.to_string(),
            runtime: Arc::new(DockerRuntime::default()),
        }
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Directory derived output paths are placed in. Relative paths are
    /// resolved against the workspace when the directory is created.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn input_dir(&self) -> PathBuf {
        self.workspace.join("input")
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Explicit output, or `<output_dir>/<stem>_upscaled<.ext>`.
    ///
    /// Built from the raw path bytes, so names that are not UTF-8 survive.
    pub fn resolve_output(&self, request: &UpscaleRequest) -> PathBuf {
        if let Some(output) = &request.output {
            return output.clone();
        }
        let mut name = request.input.file_stem().map(OsStr::to_os_string).unwrap_or_default();
        name.push(OUTPUT_SUFFIX);
        if let Some(ext) = request.input.extension() {
            name.push(".");
            name.push(ext);
        }
        self.output_dir.join(name)
    }

    /// Runtime arguments for `request`, without the runtime program itself.
    pub fn command(&self, request: &UpscaleRequest) -> Vec<OsString> {
        let output = self.resolve_output(request);
        let mut mount = self.workspace.as_os_str().to_os_string();
        mount.push(":");
        mount.push(CONTAINER_MOUNT);

        let mut args: Vec<OsString> = vec![
            "run".into(),
            "--rm".into(),
            "-v".into(),
            mount,
            self.image.as_str().into(),
            "-i".into(),
            request.input.as_os_str().to_os_string(),
            "-o".into(),
            output.into_os_string(),
            "-p".into(),
            request.processor.as_str().into(),
            "-s".into(),
            request.scale.to_string().into(),
        ];

        match (request.processor, &request.model) {
            (Processor::Realesrgan, model) => {
                args.push("--realesrgan-model".into());
                args.push(model.as_deref().unwrap_or(DEFAULT_MODEL).into());
            }
            (processor, Some(model)) => {
                debug!(%processor, %model, "model only applies to realesrgan, ignoring");
            }
            (_, None) => {}
        }

        args
    }

    /// Upscale `request.input`, returning the output path on success.
    ///
    /// Never returns an error: a missing runtime, a missing image and a
    /// nonzero exit all come back as a failed [`ProcessResult`].
    pub async fn upscale(&self, request: &UpscaleRequest) -> ProcessResult {
        let output = self.resolve_output(request);

        info!(
            input = %request.input.display(),
            output = %output.display(),
            processor = %request.processor,
            scale = request.scale.get(),
            "starting video2x"
        );

        match self.execute(request, &output).await {
            Ok(()) => {
                info!(output = %output.display(), "video2x completed");
                ProcessResult::succeeded(output)
            }
            Err(err) => {
                warn!(error = %err, "video2x failed");
                ProcessResult::failed(&err)
            }
        }
    }

    /// Frame interpolation: `upscale` with RIFE at scale 1.
    ///
    /// `target_fps` is not passed to the container yet; the image's flag
    /// for it has not been confirmed.
    pub async fn interpolate(&self, request: &UpscaleRequest, target_fps: u32) -> ProcessResult {
        debug!(target_fps, "target frame rate is not forwarded to video2x");
        self.upscale(&request.for_interpolation()).await
    }

    async fn execute(&self, request: &UpscaleRequest, output: &Path) -> Result<(), InvokeError> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            let dir = self.workspace.join(parent);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| InvokeError::OutputDir { path: dir, source })?;
        }

        let args = self.command(request);
        debug!(runtime = self.runtime.name(), ?args, "invoking container runtime");

        let result = self
            .runtime
            .run(&args, &self.workspace)
            .await
            .map_err(|reason| InvokeError::Launch {
                runtime: self.runtime.name().to_string(),
                reason,
            })?;

        if result.success() {
            Ok(())
        } else {
            Err(InvokeError::Failed {
                runtime: self.runtime.name().to_string(),
                code: result.code,
                stderr: result.into_diagnostics(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper() -> Video2x {
        Video2x::new("/ws")
    }

    fn position(args: &[OsString], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(|a| a.to_string_lossy().into_owned())
    }

    #[test]
    fn processor_names_match_cli_values() {
        use clap::ValueEnum;
        for p in Processor::value_variants() {
            assert_eq!(Processor::from_str(p.as_str(), false).unwrap(), *p);
        }
        assert!(Processor::from_str("waifu2x", false).is_err());
    }

    #[test]
    fn default_request_is_realesrgan_2x() {
        let req = UpscaleRequest::new("clip.mp4");
        assert_eq!(req.processor, Processor::Realesrgan);
        assert_eq!(req.scale.get(), 2);
        assert!(req.model.is_none());
        assert!(req.output.is_none());
    }

    #[test]
    fn interpolation_request_fixes_processor_and_scale() {
        let req = UpscaleRequest::new("a.mp4")
            .processor(Processor::Anime4k)
            .scale(NonZeroU32::new(4).unwrap())
            .output("b.mp4");
        let interp = req.for_interpolation();
        assert_eq!(interp.processor, Processor::Rife);
        assert_eq!(interp.scale.get(), 1);
        assert_eq!(interp.output, req.output);
        assert_eq!(interp.input, req.input);
    }

    #[test]
    fn derives_output_from_input_name() {
        let req = UpscaleRequest::new("input/sample.mp4");
        assert_eq!(
            wrapper().resolve_output(&req),
            PathBuf::from("/ws/output/sample_upscaled.mp4")
        );
    }

    #[test]
    fn derived_output_keeps_only_last_extension() {
        let req = UpscaleRequest::new("clips/show.s01e01.mkv");
        assert_eq!(
            wrapper().resolve_output(&req),
            PathBuf::from("/ws/output/show.s01e01_upscaled.mkv")
        );
    }

    #[test]
    fn derived_output_without_extension() {
        let req = UpscaleRequest::new("input/raw");
        assert_eq!(
            wrapper().resolve_output(&req),
            PathBuf::from("/ws/output/raw_upscaled")
        );
    }

    #[test]
    fn explicit_output_wins() {
        let req = UpscaleRequest::new("a.mp4").output("/elsewhere/b.mkv");
        assert_eq!(wrapper().resolve_output(&req), PathBuf::from("/elsewhere/b.mkv"));
    }

    #[test]
    fn command_has_fixed_shape() {
        let req = UpscaleRequest::new("input/sample.mp4")
            .processor(Processor::Anime4k)
            .scale(NonZeroU32::new(4).unwrap());
        let args = wrapper().command(&req);
        assert_eq!(
            args,
            vec![
                "run",
                "--rm",
                "-v",
                "/ws:/host",
                DEFAULT_IMAGE,
                "-i",
                "input/sample.mp4",
                "-o",
                "/ws/output/sample_upscaled.mp4",
                "-p",
                "anime4k",
                "-s",
                "4",
            ]
        );
    }

    #[test]
    fn realesrgan_gets_default_model() {
        let args = wrapper().command(&UpscaleRequest::new("a.mp4"));
        assert_eq!(
            position(&args, "--realesrgan-model").as_deref(),
            Some(DEFAULT_MODEL)
        );
        assert_eq!(args.last().and_then(|a| a.to_str()), Some(DEFAULT_MODEL));
    }

    #[test]
    fn realesrgan_uses_explicit_model() {
        let req = UpscaleRequest::new("a.mp4").model("realesrgan-x4plus");
        let args = wrapper().command(&req);
        assert_eq!(
            position(&args, "--realesrgan-model").as_deref(),
            Some("realesrgan-x4plus")
        );
    }

    #[test]
    fn other_processors_never_get_a_model() {
        for p in [Processor::Anime4k, Processor::Rife] {
            let req = UpscaleRequest::new("a.mp4").processor(p).model("ignored");
            let args = wrapper().command(&req);
            assert!(!args.iter().any(|a| a == "--realesrgan-model"));
            assert!(!args.iter().any(|a| a == "ignored"));
        }
    }

    #[test]
    fn custom_image_and_output_dir() {
        let v2x = Video2x::new("/ws")
            .with_image("localhost/video2x:dev")
            .with_output_dir("output");
        let args = v2x.command(&UpscaleRequest::new("input/sample.mp4"));
        assert_eq!(args[4], "localhost/video2x:dev");
        assert_eq!(
            position(&args, "-o").as_deref(),
            Some("output/sample_upscaled.mp4")
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_pass_through_unchanged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let v2x = Video2x::new(OsStr::from_bytes(b"/ws\xfe"));
        let req = UpscaleRequest::new(OsStr::from_bytes(b"input/clip\xff.mp4"));

        assert_eq!(
            v2x.resolve_output(&req).as_os_str().as_bytes(),
            b"/ws\xfe/output/clip\xff_upscaled.mp4"
        );
        let args = v2x.command(&req);
        assert_eq!(args[3].as_bytes(), b"/ws\xfe:/host");
        assert_eq!(args[6].as_bytes(), b"input/clip\xff.mp4");
        assert_eq!(args[8].as_bytes(), b"/ws\xfe/output/clip\xff_upscaled.mp4");
    }

    #[test]
    fn input_dir_is_under_workspace() {
        assert_eq!(wrapper().input_dir(), PathBuf::from("/ws/input"));
        assert_eq!(wrapper().output_dir(), Path::new("/ws/output"));
    }
}
