// Media pipeline: argument construction and engine execution
//
// - Commands: engine invocation builder
// - Plan: request -> ordered invocations
// - Runner: executes one invocation as a child process

pub mod commands;
pub mod plan;
pub mod runner;

use async_trait::async_trait;
use std::sync::Arc;

pub use commands::*;
pub use plan::*;
pub use runner::*;

use crate::config::EngineConfig;
use crate::error::Result;

/// Runs a single engine invocation to completion.
///
/// Implementations know nothing about formats or plans.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    /// Resolves `Ok(())` on exit code 0, otherwise with the launch or exit failure
    async fn run(&self, invocation: &EngineInvocation) -> Result<()>;
}

/// Factory for creating pipeline runner instances
pub struct RunnerFactory;

impl RunnerFactory {
    /// Create the default runner (FFmpeg-based)
    pub fn create_runner(config: EngineConfig) -> Arc<dyn PipelineRunner> {
        Arc::new(runner::FfmpegRunner::new(config))
    }
}
