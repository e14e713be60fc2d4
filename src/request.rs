//! Conversion request model and output naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConvertError;

/// Target formats accepted by a conversion task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Gif,
    Mp4,
    Webm,
    Mp3,
    Wav,
    Avi,
    Mov,
    Mkv,
}

/// How the argument builder treats a format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Palette-based two stage pipeline
    AnimatedImage,
    /// Fast preset plus crf
    StreamingVideo,
    /// Video stream disabled
    AudioOnly,
    /// crf only
    Generic,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 8] = [
        OutputFormat::Gif,
        OutputFormat::Mp4,
        OutputFormat::Webm,
        OutputFormat::Mp3,
        OutputFormat::Wav,
        OutputFormat::Avi,
        OutputFormat::Mov,
        OutputFormat::Mkv,
    ];

    /// File extension, which is also the identifier used on the wire
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Gif => "gif",
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Wav => "wav",
            OutputFormat::Avi => "avi",
            OutputFormat::Mov => "mov",
            OutputFormat::Mkv => "mkv",
        }
    }

    pub fn kind(&self) -> FormatKind {
        match self {
            OutputFormat::Gif => FormatKind::AnimatedImage,
            OutputFormat::Mp4 | OutputFormat::Webm => FormatKind::StreamingVideo,
            OutputFormat::Mp3 | OutputFormat::Wav => FormatKind::AudioOnly,
            OutputFormat::Avi | OutputFormat::Mov | OutputFormat::Mkv => FormatKind::Generic,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.extension() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = OutputFormat::ALL.iter().map(|f| f.extension()).collect();
                ConvertError::UnsupportedFormat(format!(
                    "'{}'. Valid formats: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Everything a task needs to convert one uploaded file.
///
/// Field names follow the task message format (`inputFile`, `format`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    /// File name relative to the input directory
    pub input_file: String,
    pub format: OutputFormat,
    /// `WxH` or an engine scale expression such as `640:-1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Lower is higher quality; range depends on the codec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crf: Option<u32>,
    /// Engine bitrate expression such as `2M` or `800k`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    /// Diagnostic timing only
    #[serde(default = "Utc::now")]
    pub start_time: DateTime<Utc>,
}

impl ConversionRequest {
    pub fn new<S: Into<String>>(input_file: S, format: OutputFormat) -> Self {
        Self {
            input_file: input_file.into(),
            format,
            resolution: None,
            crf: None,
            bitrate: None,
            start_time: Utc::now(),
        }
    }

    pub fn with_resolution<S: Into<String>>(mut self, resolution: S) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    pub fn with_bitrate<S: Into<String>>(mut self, bitrate: S) -> Self {
        self.bitrate = Some(bitrate.into());
        self
    }

    /// Name of the converted file: the input's base name with its last
    /// extension replaced by the target format.
    pub fn output_name(&self) -> String {
        output_name_for(&self.input_file, self.format)
    }
}

pub fn output_name_for(input_file: &str, format: OutputFormat) -> String {
    let base = Path::new(input_file)
        .file_name()
        .map(Path::new)
        .unwrap_or_else(|| Path::new(input_file));

    base.with_extension(format.extension())
        .to_string_lossy()
        .to_string()
}
