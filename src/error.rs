use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Input file not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("Failed to launch {binary}: {source}")]
    EngineLaunch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine exited with code {}: {diagnostics}", exit_code_label(.code))]
    EngineFailed {
        /// `None` when the process was terminated by a signal
        code: Option<i32>,
        diagnostics: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl ConvertError {
    /// Build an engine failure from raw stderr text.
    pub fn engine_failed(code: Option<i32>, stderr: &str) -> Self {
        let trimmed = stderr.trim();
        let diagnostics = if trimmed.is_empty() {
            "Unknown".to_string()
        } else {
            trimmed.to_string()
        };
        Self::EngineFailed { code, diagnostics }
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_failed_trims_diagnostics() {
        let err = ConvertError::engine_failed(Some(1), "  \nInvalid data found\n\n");
        assert_eq!(
            err.to_string(),
            "Engine exited with code 1: Invalid data found"
        );
    }

    #[test]
    fn test_engine_failed_empty_stderr_is_unknown() {
        let err = ConvertError::engine_failed(Some(234), "   \n");
        match &err {
            ConvertError::EngineFailed { code, diagnostics } => {
                assert_eq!(*code, Some(234));
                assert_eq!(diagnostics, "Unknown");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_signal_exit_label() {
        let err = ConvertError::engine_failed(None, "killed");
        assert_eq!(err.to_string(), "Engine exited with code signal: killed");
    }
}
