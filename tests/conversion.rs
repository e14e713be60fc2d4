use assert_fs::prelude::*;
use assert_fs::TempDir;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clipconv::config::StorageConfig;
use clipconv::error::{ConvertError, Result};
use clipconv::media::{EngineInvocation, PipelineRunner};
use clipconv::request::{ConversionRequest, OutputFormat};
use clipconv::task::{TaskOrchestrator, TaskResult};

/// Stands in for ffmpeg: checks that every `-i` input exists, then writes the output.
#[derive(Default)]
struct RecordingEngine {
    runs: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl PipelineRunner for RecordingEngine {
    async fn run(&self, invocation: &EngineInvocation) -> Result<()> {
        self.runs.lock().unwrap().push(invocation.args.clone());

        let inputs = invocation
            .args
            .windows(2)
            .filter(|pair| pair[0] == "-i")
            .map(|pair| PathBuf::from(&pair[1]));
        for input in inputs {
            if !input.exists() {
                return Err(ConvertError::engine_failed(
                    Some(1),
                    &format!("{}: No such file or directory", input.display()),
                ));
            }
        }

        std::fs::write(&invocation.output_path, b"output")?;
        Ok(())
    }
}

fn setup() -> (TempDir, StorageConfig) {
    let root = TempDir::new().unwrap();
    root.child("uploads").create_dir_all().unwrap();
    let storage = StorageConfig {
        input_dir: root.child("uploads").path().to_path_buf(),
        output_dir: root.child("converted").path().to_path_buf(),
    };
    (root, storage)
}

#[tokio::test]
async fn gif_pipeline_runs_both_stages_in_order() {
    let (root, storage) = setup();
    root.child("uploads/dance.mp4").write_str("video").unwrap();

    let engine = Arc::new(RecordingEngine::default());
    let orchestrator = Arc::new(TaskOrchestrator::new(storage, engine.clone()));

    let request = ConversionRequest::new("dance.mp4", OutputFormat::Gif)
        .with_resolution("480x270")
        .with_bitrate("300k");
    let result = orchestrator.spawn(request).wait().await;

    assert_eq!(result, TaskResult::Completed { output_name: "dance.gif".to_string() });

    let runs = engine.runs.lock().unwrap().clone();
    assert_eq!(runs.len(), 2);
    assert!(runs[0].iter().any(|a| a.contains("palettegen")));
    assert!(runs[1].iter().any(|a| a.contains("paletteuse")));

    assert!(!root.child("uploads/dance.mp4").path().exists());
    assert!(root.child("converted/dance.gif").path().exists());
    let leftovers: Vec<_> = std::fs::read_dir(root.child("converted").path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[tokio::test]
async fn audio_conversion_reports_output_name() {
    let (root, storage) = setup();
    root.child("uploads/interview.final.mov").write_str("video").unwrap();

    let engine = Arc::new(RecordingEngine::default());
    let orchestrator = TaskOrchestrator::new(storage, engine.clone());

    let result = orchestrator
        .run(ConversionRequest::new("interview.final.mov", OutputFormat::Mp3))
        .await;

    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"success":true,"outputName":"interview.final.mp3"}"#
    );
    let runs = engine.runs.lock().unwrap().clone();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].contains(&"-vn".to_string()));
    assert!(root.child("converted/interview.final.mp3").path().exists());
}

#[tokio::test]
async fn missing_upload_is_reported_without_side_effects() {
    let (root, storage) = setup();
    root.child("uploads/other.mov").write_str("video").unwrap();

    let engine = Arc::new(RecordingEngine::default());
    let orchestrator = TaskOrchestrator::new(storage, engine.clone());

    let result = orchestrator
        .run(ConversionRequest::new("missing.mov", OutputFormat::Mp4).with_crf(23))
        .await;

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["error"].as_str().unwrap().contains("missing.mov"));
    assert!(json.get("success").is_none());
    assert!(engine.runs.lock().unwrap().is_empty());
    assert!(root.child("uploads/other.mov").path().exists());
}
