use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use v2x::banner::{BannerInfo, print_banner, print_result};
use v2x::config::{Setting, Settings};
use v2x::consts::{DEFAULT_HISTORY_LIMIT, DEFAULT_TARGET_FPS, SMOKE_SAMPLE, default_db_path};
use v2x::doctor;
use v2x::history::{History, Operation, RunRecord};
use v2x::invoker::runtime::DockerRuntime;
use v2x::invoker::{DEFAULT_SCALE, Processor, UpscaleRequest, Video2x};
use v2x::spinner::Spinner;
use v2x::validate::{self, Report};

#[derive(Parser)]
#[command(name = "v2x", version, about = "Run Video2X from a codespace.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database for settings and run history (use :memory: for ephemeral)
    #[arg(long, global = true)]
    db: Option<String>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Where and how the container runs. Unset flags fall back to stored settings.
#[derive(Args)]
struct ContainerArgs {
    /// Host directory mounted into the container
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Video2X image
    #[arg(long)]
    image: Option<String>,

    /// Container runtime program
    #[arg(long)]
    runtime: Option<String>,

    /// Print the command instead of running it
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Open the result with the default application
    #[arg(long, default_value_t = false)]
    open: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Upscale a video
    Upscale {
        /// Input video, as seen from the workspace
        input: PathBuf,

        /// Output path (default: output/<stem>_upscaled<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Processing algorithm
        #[arg(short, long, value_enum, default_value_t = Processor::Realesrgan)]
        processor: Processor,

        /// Scale factor
        #[arg(short, long, default_value_t = DEFAULT_SCALE)]
        scale: NonZeroU32,

        /// Real-ESRGAN model
        #[arg(short, long)]
        model: Option<String>,

        #[command(flatten)]
        container: ContainerArgs,
    },
    /// Interpolate frames with RIFE
    Interpolate {
        /// Input video, as seen from the workspace
        input: PathBuf,

        /// Output path (default: output/<stem>_upscaled<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target frame rate (not yet passed to the container)
        #[arg(long)]
        fps: Option<u32>,

        #[command(flatten)]
        container: ContainerArgs,
    },
    /// Upscale input/test_sample.mp4 if it exists
    Smoke {
        #[command(flatten)]
        container: ContainerArgs,
    },
    /// Check the devcontainer, setup script and notebook
    Validate {
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Check host tools and the container image
    Doctor {
        #[command(flatten)]
        container: ContainerArgs,
    },
    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show recent runs
    History {
        /// Number of runs to show
        #[arg(short = 'n', long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,

        /// Delete all recorded runs
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// List every setting and its effective value
    List,
    /// Print one setting
    Get {
        #[arg(value_enum)]
        setting: Setting,
    },
    /// Store a setting
    Set {
        #[arg(value_enum)]
        setting: Setting,
        value: String,
    },
    /// Remove a stored setting
    Unset {
        #[arg(value_enum)]
        setting: Setting,
    },
}

/// A container job as requested on the command line.
#[derive(Debug, Clone, Copy)]
enum Job {
    Upscale,
    Interpolate { target_fps: u32 },
}

impl Job {
    fn verb(&self) -> &'static str {
        match self {
            Job::Upscale => "upscaling",
            Job::Interpolate { .. } => "interpolating",
        }
    }

    fn operation(&self) -> Operation {
        match self {
            Job::Upscale => Operation::Upscale,
            Job::Interpolate { .. } => Operation::Interpolate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Validation touches no database.
    if let Command::Validate { root } = &cli.command {
        return Ok(handle_validate(root));
    }

    let db = open_db_path(cli.db)?;
    let settings = Settings::open(&db)?;

    match cli.command {
        Command::Upscale {
            input,
            output,
            processor,
            scale,
            model,
            container,
        } => {
            let v2x = build_wrapper(&settings, &container)?;
            let mut request = UpscaleRequest::new(input)
                .processor(processor)
                .scale(scale)
                .model(settings.resolve(Setting::Model, model.as_deref())?);
            request.output = output;
            run_job(&db, &v2x, &container, Job::Upscale, request).await
        }
        Command::Interpolate {
            input,
            output,
            fps,
            container,
        } => {
            if let Some(fps) = fps {
                println!(
                    "note: --fps {fps} is accepted but not passed to video2x yet; \
                     the source frame rate is used"
                );
            }
            let v2x = build_wrapper(&settings, &container)?;
            let mut request = UpscaleRequest::new(input);
            request.output = output;
            let target_fps = fps.unwrap_or(DEFAULT_TARGET_FPS);
            run_job(&db, &v2x, &container, Job::Interpolate { target_fps }, request).await
        }
        Command::Smoke { container } => {
            let v2x = build_wrapper(&settings, &container)?;
            let sample = v2x.input_dir().join(SMOKE_SAMPLE);
            if !sample.exists() {
                println!(
                    "no test video found at {}; place a video in the input directory to test",
                    sample.display()
                );
                return Ok(ExitCode::SUCCESS);
            }
            let request = UpscaleRequest::new(sample)
                .model(settings.resolve(Setting::Model, None)?);
            run_job(&db, &v2x, &container, Job::Upscale, request).await
        }
        Command::Doctor { container } => {
            let image = settings.resolve(Setting::Image, container.image.as_deref())?;
            let runtime = DockerRuntime::new(settings.resolve(
                Setting::Runtime,
                container.runtime.as_deref(),
            )?);
            let work_dir = std::env::current_dir().context("cannot read current directory")?;
            let diagnosis = doctor::diagnose(&runtime, &image, &work_dir).await;
            Ok(print_diagnosis(&diagnosis))
        }
        Command::Config { action } => {
            handle_config(&settings, action)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::History { limit, clear } => {
            let history = History::open(&db)?;
            if clear {
                history.clear()?;
                println!("history cleared.");
            } else {
                print_history(&history, limit)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { .. } => unreachable!("validate returns before the database is opened"),
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// `--db`, or the default path with its directory created.
fn open_db_path(flag: Option<String>) -> Result<String> {
    if let Some(db) = flag {
        return Ok(db);
    }
    let path = default_db_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    path.to_str()
        .map(str::to_string)
        .context("database path is not valid UTF-8")
}

fn build_wrapper(settings: &Settings, args: &ContainerArgs) -> Result<Video2x> {
    let workspace = match &args.workspace {
        Some(ws) => ws.clone(),
        None => PathBuf::from(settings.resolve(Setting::Workspace, None)?),
    };
    let image = settings.resolve(Setting::Image, args.image.as_deref())?;
    let runtime = settings.resolve(Setting::Runtime, args.runtime.as_deref())?;
    Ok(Video2x::new(workspace)
        .with_image(image)
        .with_runtime(Arc::new(DockerRuntime::new(runtime))))
}

/// Show, run, record and report one container job.
async fn run_job(
    db: &str,
    v2x: &Video2x,
    args: &ContainerArgs,
    job: Job,
    request: UpscaleRequest,
) -> Result<ExitCode> {
    let effective = match job {
        Job::Interpolate { .. } => request.for_interpolation(),
        Job::Upscale => request.clone(),
    };
    let output = v2x.resolve_output(&effective);

    if args.dry_run {
        let command: Vec<_> = v2x
            .command(&effective)
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        println!("{} {}", v2x.runtime_name(), command.join(" "));
        return Ok(ExitCode::SUCCESS);
    }

    print_banner(&BannerInfo {
        image: v2x.image(),
        runtime: v2x.runtime_name(),
        workspace: v2x.workspace(),
        input: &effective.input,
        output: &output,
        processor: effective.processor.as_str(),
        scale: effective.scale.get(),
        model: match effective.processor {
            Processor::Realesrgan => effective.model.as_deref(),
            _ => None,
        },
    });

    let label = file_label(&effective.input);
    let spinner = Spinner::start(&format!("{} {label}", job.verb()));
    let result = match job {
        Job::Interpolate { target_fps } => v2x.interpolate(&request, target_fps).await,
        Job::Upscale => v2x.upscale(&request).await,
    };
    let elapsed = spinner.stop().await;
    print_result(&result, elapsed);

    if let Err(err) = History::open(db)
        .and_then(|h| h.record(&RunRecord::new(job.operation(), &effective, &result)))
    {
        warn!(error = %err, "could not record run in history");
    }

    if !result.success {
        return Ok(ExitCode::FAILURE);
    }
    if args.open
        && let Some(path) = &result.output_path
    {
        let shown = v2x.workspace().join(path);
        // Headless codespaces have nothing to open with.
        if let Err(err) = open::that(&shown) {
            warn!(error = %err, path = %shown.display(), "could not open result");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn handle_validate(root: &Path) -> ExitCode {
    println!("validating codespace configuration in {}", root.display());
    let report = validate::validate(root);
    print_report(&report);
    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &Report) {
    for section in &report.sections {
        println!("\n{}:", section.title);
        for check in &section.checks {
            let mark = if check.passed { "✓" } else { "✗" };
            match &check.detail {
                Some(detail) => println!("  {mark} {} ({detail})", check.name),
                None => println!("  {mark} {}", check.name),
            }
        }
    }
    let failed = report.failures().count();
    println!();
    if failed == 0 {
        println!("all {} checks passed.", report.checks().count());
    } else {
        println!(
            "{failed} of {} checks failed.",
            report.checks().count()
        );
    }
}

fn print_diagnosis(diagnosis: &doctor::Diagnosis) -> ExitCode {
    for tool in &diagnosis.tools {
        let kind = if tool.required { "required" } else { "optional" };
        match &tool.location {
            Some(path) => println!("  ✓ {:<12} {}", tool.name, path.display()),
            None => println!("  ✗ {:<12} not found ({kind}, {})", tool.name, tool.purpose),
        }
    }
    println!("  {}", diagnosis.image_line());
    if diagnosis.healthy() {
        println!("\nready.");
        ExitCode::SUCCESS
    } else {
        println!("\nenvironment is incomplete.");
        ExitCode::FAILURE
    }
}

fn handle_config(settings: &Settings, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::List => {
            for (setting, value, stored) in settings.list()? {
                let origin = if stored { "" } else { " (default)" };
                println!("{:<10} {value}{origin}", setting.key());
            }
        }
        ConfigAction::Get { setting } => {
            println!("{}", settings.resolve(setting, None)?);
        }
        ConfigAction::Set { setting, value } => {
            settings.set(setting, &value)?;
            println!("✓ {setting} = {value}");
        }
        ConfigAction::Unset { setting } => {
            settings.remove(setting)?;
            println!("✓ {setting} reset to {}", setting.default_value());
        }
    }
    Ok(())
}

fn print_history(history: &History, limit: usize) -> Result<()> {
    let runs = history.recent(limit)?;
    if runs.is_empty() {
        println!("  (no runs recorded)");
        return Ok(());
    }
    for run in runs {
        let mark = if run.success { "✓" } else { "✗" };
        println!(
            "{mark} {} {:<11} {} {}x {} -> {}",
            run.timestamp.as_deref().unwrap_or("-"),
            run.operation.as_str(),
            run.processor,
            run.scale,
            run.input,
            run.output.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
