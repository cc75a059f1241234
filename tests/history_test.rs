use std::num::NonZeroU32;
use std::path::PathBuf;

use v2x::error::InvokeError;
use v2x::history::{History, Operation, RunRecord};
use v2x::invoker::{ProcessResult, Processor, UpscaleRequest};

fn success(input: &str) -> RunRecord {
    let request = UpscaleRequest::new(input);
    let result = ProcessResult::succeeded(PathBuf::from("output/x_upscaled.mp4"));
    RunRecord::new(Operation::Upscale, &request, &result)
}

#[test]
fn record_and_read_back() {
    let history = History::in_memory().unwrap();
    let id = history.record(&success("input/a.mp4")).unwrap();

    let runs = history.recent(10).unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.id, Some(id));
    assert!(run.timestamp.is_some());
    assert_eq!(run.input, "input/a.mp4");
    assert_eq!(run.output.as_deref(), Some("output/x_upscaled.mp4"));
    assert_eq!(run.processor, Processor::Realesrgan);
    assert_eq!(run.scale, 2);
    assert!(run.success);
}

#[test]
fn failures_keep_stderr() {
    let history = History::in_memory().unwrap();
    let request = UpscaleRequest::new("input/a.mp4").for_interpolation();
    let result = ProcessResult::failed(&InvokeError::Failed {
        runtime: "docker".to_string(),
        code: Some(125),
        stderr: "Unable to find image".to_string(),
    });
    history
        .record(&RunRecord::new(Operation::Interpolate, &request, &result))
        .unwrap();

    let run = history.recent(1).unwrap().remove(0);
    assert_eq!(run.operation, Operation::Interpolate);
    assert_eq!(run.processor, Processor::Rife);
    assert_eq!(run.scale, 1);
    assert!(!run.success);
    assert!(run.output.is_none());
    assert_eq!(run.stderr.as_deref(), Some("Unable to find image"));
}

#[test]
fn recent_returns_last_n_oldest_first() {
    let history = History::in_memory().unwrap();
    for name in ["a", "b", "c", "d"] {
        history
            .record(&success(&format!("input/{name}.mp4")))
            .unwrap();
    }

    let inputs: Vec<String> = history
        .recent(2)
        .unwrap()
        .into_iter()
        .map(|r| r.input)
        .collect();
    assert_eq!(inputs, vec!["input/c.mp4", "input/d.mp4"]);
}

#[test]
fn clear_empties_history() {
    let history = History::in_memory().unwrap();
    history.record(&success("input/a.mp4")).unwrap();
    history.clear().unwrap();
    assert!(history.recent(10).unwrap().is_empty());
}

#[test]
fn shares_a_file_with_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v2x.db");
    let path = path.to_str().unwrap();

    let settings = v2x::config::Settings::open(path).unwrap();
    settings
        .set(v2x::config::Setting::Runtime, "podman")
        .unwrap();

    {
        let history = History::open(path).unwrap();
        let request = UpscaleRequest::new("input/a.mp4")
            .processor(Processor::Anime4k)
            .scale(NonZeroU32::new(4).unwrap());
        let result = ProcessResult::succeeded(PathBuf::from("output/a_upscaled.mp4"));
        history
            .record(&RunRecord::new(Operation::Upscale, &request, &result))
            .unwrap();
    }

    let history = History::open(path).unwrap();
    let run = history.recent(5).unwrap().remove(0);
    assert_eq!(run.processor, Processor::Anime4k);
    assert_eq!(run.scale, 4);
    assert_eq!(
        settings.get(v2x::config::Setting::Runtime).unwrap().as_deref(),
        Some("podman")
    );
}
