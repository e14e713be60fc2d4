use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{Result, ConvertError};
use super::{EngineInvocation, PipelineRunner};

/// Runs invocations through the ffmpeg binary
pub struct FfmpegRunner {
    config: EngineConfig,
}

impl FfmpegRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        // an abandoned run must not leave the engine writing in the background
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn launch_error(&self, source: std::io::Error) -> ConvertError {
        ConvertError::EngineLaunch {
            binary: self.config.binary_path.clone(),
            source,
        }
    }

    /// Check if the engine can be started
    pub async fn check_availability(&self) -> Result<()> {
        let output = self
            .command()
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        if output.status.success() {
            info!("Engine is available: {}", self.config.binary_path);
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ConvertError::engine_failed(output.status.code(), &stderr))
        }
    }

    /// Get engine version information
    pub async fn version_info(&self) -> Result<String> {
        debug!("Getting engine version information");

        let output = self
            .command()
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            // First line carries the version
            let first_line = version_info.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ConvertError::engine_failed(output.status.code(), &stderr))
        }
    }
}

#[async_trait]
impl PipelineRunner for FfmpegRunner {
    async fn run(&self, invocation: &EngineInvocation) -> Result<()> {
        debug!("Executing {}: {} {:?}", invocation.description, self.config.binary_path, invocation.args);

        let mut child = self
            .command()
            .args(&invocation.args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConvertError::Io(std::io::Error::other("engine stderr was not captured")))?;

        // stderr is the engine's log channel, so collect all of it
        let mut reader = BufReader::new(stderr);
        let mut diagnostics = String::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&line);
            debug!("[engine] {}", text.trim_end());
            diagnostics.push_str(&text);
        }

        let status = child.wait().await?;
        if status.success() {
            debug!("{} finished", invocation.description);
            Ok(())
        } else {
            Err(ConvertError::engine_failed(status.code(), &diagnostics))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell_runner() -> FfmpegRunner {
        FfmpegRunner::new(EngineConfig {
            binary_path: "sh".to_string(),
            working_dir: None,
        })
    }

    fn script(body: &str) -> EngineInvocation {
        EngineInvocation::new("Shell script").arg("-c").arg(body)
    }

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let runner = shell_runner();
        runner
            .run(&script("echo 'frame=  10 fps=0.0' >&2; exit 0"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_code_and_stderr() {
        let runner = shell_runner();
        let err = runner
            .run(&script("echo 'line one' >&2; echo 'No such filter' >&2; exit 3"))
            .await
            .unwrap_err();

        match err {
            ConvertError::EngineFailed { code, diagnostics } => {
                assert_eq!(code, Some(3));
                assert_eq!(diagnostics, "line one\nNo such filter");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_stderr_is_unknown() {
        let runner = shell_runner();
        let err = runner.run(&script("exit 1")).await.unwrap_err();
        assert_eq!(err.to_string(), "Engine exited with code 1: Unknown");
    }

    #[tokio::test]
    async fn test_stdout_is_not_diagnostics() {
        let runner = shell_runner();
        let err = runner.run(&script("echo noisy; exit 2")).await.unwrap_err();
        assert_eq!(err.to_string(), "Engine exited with code 2: Unknown");
    }

    #[tokio::test]
    async fn test_working_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FfmpegRunner::new(EngineConfig {
            binary_path: "sh".to_string(),
            working_dir: Some(dir.path().to_path_buf()),
        });

        runner.run(&script("touch marker")).await.unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_dropped_run_stops_engine() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FfmpegRunner::new(EngineConfig {
            binary_path: "sh".to_string(),
            working_dir: Some(dir.path().to_path_buf()),
        });

        let invocation = script("sleep 1; touch marker");
        let run = runner.run(&invocation);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(200), run).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(!dir.path().join("marker").exists());
    }

    #[test]
    fn test_missing_binary_is_launch_error() {
        let runner = FfmpegRunner::new(EngineConfig {
            binary_path: "/nonexistent/bin/ffmpeg".to_string(),
            working_dir: None,
        });

        let err = tokio_test::block_on(runner.run(&script("exit 0"))).unwrap_err();
        match err {
            ConvertError::EngineLaunch { binary, source } => {
                assert_eq!(binary, "/nonexistent/bin/ffmpeg");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_version_info_reads_first_stdout_line() {
        // echo prints its argument, standing in for `ffmpeg -version`
        let runner = FfmpegRunner::new(EngineConfig {
            binary_path: "echo".to_string(),
            working_dir: None,
        });

        runner.check_availability().await.unwrap();
        assert_eq!(runner.version_info().await.unwrap(), "-version");
    }
}
