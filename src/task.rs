//! End-to-end conversion of one uploaded file.
//!
//! A [`TaskOrchestrator`] is created once with the storage layout and a runner, then
//! handles any number of requests. Each request yields exactly one [`TaskResult`].

use chrono::Utc;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{ConvertError, Result};
use crate::media::{build_plan, PipelineRunner};
use crate::request::ConversionRequest;

/// Terminal outcome reported to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Completed { output_name: String },
    Failed { error: String },
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Completed { .. })
    }

    pub fn output_name(&self) -> Option<&str> {
        match self {
            TaskResult::Completed { output_name } => Some(output_name),
            TaskResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TaskResult::Completed { .. } => None,
            TaskResult::Failed { error } => Some(error),
        }
    }
}

// `{ "success": true, "outputName": .. }` or `{ "error": .. }`
impl Serialize for TaskResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TaskResult::Completed { output_name } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("outputName", output_name)?;
                map.end()
            }
            TaskResult::Failed { error } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

/// Receives the single result of a spawned task
pub struct TaskHandle {
    task_id: Uuid,
    receiver: oneshot::Receiver<TaskResult>,
}

impl TaskHandle {
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// Wait for the task's terminal result
    pub async fn wait(self) -> TaskResult {
        self.receiver.await.unwrap_or_else(|_| TaskResult::Failed {
            error: "Conversion task ended without reporting a result".to_string(),
        })
    }
}

pub struct TaskOrchestrator {
    storage: StorageConfig,
    runner: Arc<dyn PipelineRunner>,
}

impl TaskOrchestrator {
    pub fn new(storage: StorageConfig, runner: Arc<dyn PipelineRunner>) -> Self {
        Self { storage, runner }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Run `request` on its own tokio task. The handle yields exactly one result.
    pub fn spawn(self: &Arc<Self>, request: ConversionRequest) -> TaskHandle {
        let task_id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();
        let orchestrator = Arc::clone(self);

        tokio::spawn(async move {
            let result = orchestrator.run_with_id(request, task_id).await;
            if sender.send(result).is_err() {
                debug!("Task {} finished after its caller went away", task_id);
            }
        });

        TaskHandle { task_id, receiver }
    }

    /// Convert one file and report the outcome
    pub async fn run(&self, request: ConversionRequest) -> TaskResult {
        self.run_with_id(request, Uuid::new_v4()).await
    }

    async fn run_with_id(&self, request: ConversionRequest, task_id: Uuid) -> TaskResult {
        info!(
            "Task {}: converting {} to {}",
            task_id, request.input_file, request.format
        );

        let result = match self.execute(&request, &task_id).await {
            Ok(output_name) => TaskResult::Completed { output_name },
            Err(e) => {
                warn!("Task {} failed: {}", task_id, e);
                TaskResult::Failed { error: e.to_string() }
            }
        };

        let elapsed = Utc::now() - request.start_time;
        info!(
            "Task {} finished in {} ms (success: {})",
            task_id,
            elapsed.num_milliseconds(),
            result.is_success()
        );
        result
    }

    async fn execute(&self, request: &ConversionRequest, task_id: &Uuid) -> Result<String> {
        let input_dir = absolutize(&self.storage.input_dir)?;
        let output_dir = absolutize(&self.storage.output_dir)?;
        fs::create_dir_all(&input_dir).await?;
        fs::create_dir_all(&output_dir).await?;

        if !is_plain_relative(&request.input_file) {
            return Err(ConvertError::InputNotFound { path: PathBuf::from(&request.input_file) });
        }

        let input_path = input_dir.join(&request.input_file);
        match fs::metadata(&input_path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(ConvertError::InputNotFound { path: input_path }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConvertError::InputNotFound { path: input_path });
            }
            Err(e) => return Err(ConvertError::Io(e)),
        }

        let plan = build_plan(request, &input_path, &output_dir, task_id);
        let total = plan.len();

        // Strictly sequential: a palette encode needs the palette on disk
        for (index, invocation) in plan.invocations.iter().enumerate() {
            info!(
                "Task {}: step {}/{} {}",
                task_id,
                index + 1,
                total,
                invocation.description
            );
            self.runner.run(invocation).await?;
        }

        if let Some(artifacts) = &plan.artifacts {
            fs::rename(&artifacts.temp_output, &plan.output_path).await?;
            remove_quietly(&artifacts.palette, "palette").await;
        }

        remove_quietly(&input_path, "original input").await;

        let output_name = request.output_name();
        info!("Task {}: wrote {}", task_id, plan.output_path.display());
        Ok(output_name)
    }
}

/// Uploads are addressed by a relative name that stays inside the input directory
fn is_plain_relative(input_file: &str) -> bool {
    let path = Path::new(input_file);
    !input_file.is_empty()
        && path.components().all(|component| matches!(component, Component::Normal(_)))
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Cleanup never fails a task that already produced its output.
async fn remove_quietly(path: &Path, what: &str) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed {} {}", what, path.display()),
        Err(e) => warn!("Failed to remove {} {}: {}", what, path.display(), e),
    }
}
