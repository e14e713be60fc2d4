//! Translation of a conversion request into the engine runs that perform it.
//!
//! Building a plan has no side effects: the same request, paths and task id
//! always produce the same argument vectors.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::commands::EngineInvocation;
use crate::request::{ConversionRequest, FormatKind, OutputFormat};

/// Frame rate gif output is sampled at
pub const GIF_FPS: u32 = 10;
/// Width gif output is scaled to when no resolution is requested
pub const GIF_WIDTH: u32 = 320;
const GIF_MAX_COLORS: u32 = 256;
const GIF_BAYER_SCALE: u32 = 5;

/// Audio bitrate forced for mp3 output
pub const MP3_AUDIO_BITRATE: &str = "128k";
const STREAMING_PRESET: &str = "fast";

/// Intermediate files of the palette pipeline, namespaced by task id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifArtifacts {
    pub palette: PathBuf,
    pub temp_output: PathBuf,
}

impl GifArtifacts {
    pub fn for_task(output_dir: &Path, task_id: &Uuid) -> Self {
        let id = task_id.simple();
        Self {
            palette: output_dir.join(format!(".palette-{}.png", id)),
            temp_output: output_dir.join(format!(".tmp-{}.gif", id)),
        }
    }
}

/// Ordered engine runs for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    pub invocations: Vec<EngineInvocation>,
    /// Where the converted file ends up once the plan has succeeded
    pub output_path: PathBuf,
    /// Set for the palette pipeline only; `temp_output` is moved onto
    /// `output_path` after the last run
    pub artifacts: Option<GifArtifacts>,
}

impl PipelinePlan {
    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

/// Build the plan for `request`.
///
/// `input_path` is the resolved upload, `output_dir` the directory results go to.
/// `task_id` only affects the names of gif intermediates.
pub fn build_plan(
    request: &ConversionRequest,
    input_path: &Path,
    output_dir: &Path,
    task_id: &Uuid,
) -> PipelinePlan {
    let output_path = output_dir.join(request.output_name());

    match request.format.kind() {
        FormatKind::AnimatedImage => {
            let artifacts = GifArtifacts::for_task(output_dir, task_id);
            let invocations = vec![
                palette_generation(request, input_path, &artifacts.palette),
                palette_encode(request, input_path, &artifacts.palette, &artifacts.temp_output),
            ];
            PipelinePlan {
                invocations,
                output_path,
                artifacts: Some(artifacts),
            }
        }
        kind => PipelinePlan {
            invocations: vec![single_stage(request, kind, input_path, &output_path)],
            output_path,
            artifacts: None,
        },
    }
}

fn palette_generation(request: &ConversionRequest, input_path: &Path, palette: &Path) -> EngineInvocation {
    let scale = match &request.resolution {
        Some(resolution) => scale_expression(resolution),
        None => format!("{}:-1", GIF_WIDTH),
    };

    EngineInvocation::new("Palette generation")
        .input(input_path)
        .video_filter(format!(
            "fps={},scale={}:flags=lanczos,palettegen=max_colors={}",
            GIF_FPS, scale, GIF_MAX_COLORS
        ))
        .overwrite()
        .output(palette)
}

fn palette_encode(
    request: &ConversionRequest,
    input_path: &Path,
    palette: &Path,
    temp_output: &Path,
) -> EngineInvocation {
    let paletteuse = format!(
        "paletteuse=dither=bayer:bayer_scale={}:diff_mode=rectangle",
        GIF_BAYER_SCALE
    );
    let graph = match &request.resolution {
        Some(resolution) => format!(
            "[0:v]scale={}:flags=lanczos[scaled];[scaled][1:v]{}",
            scale_expression(resolution),
            paletteuse
        ),
        None => format!("[0:v][1:v]{}", paletteuse),
    };

    let mut invocation = EngineInvocation::new("Palette encode")
        .input(input_path)
        .input(palette)
        .complex_filter(graph);

    // gif has no real bitrate control; the engine treats this as a hint
    if let Some(bitrate) = &request.bitrate {
        invocation = invocation.video_bitrate(bitrate.as_str());
    }

    invocation.overwrite().output(temp_output)
}

fn single_stage(
    request: &ConversionRequest,
    kind: FormatKind,
    input_path: &Path,
    output_path: &Path,
) -> EngineInvocation {
    let mut invocation = EngineInvocation::new(format!("Convert to {}", request.format))
        .input(input_path);

    if let Some(resolution) = &request.resolution {
        invocation = invocation.size(resolution.as_str());
    }
    if let Some(bitrate) = &request.bitrate {
        invocation = invocation.video_bitrate(bitrate.as_str());
    }

    match kind {
        FormatKind::StreamingVideo => {
            invocation = invocation.preset(STREAMING_PRESET);
            if let Some(crf) = request.crf {
                invocation = invocation.crf(crf);
            }
        }
        FormatKind::AudioOnly => {
            invocation = invocation.no_video();
            if request.format == OutputFormat::Mp3 {
                invocation = invocation.audio_bitrate(MP3_AUDIO_BITRATE);
            }
        }
        FormatKind::Generic | FormatKind::AnimatedImage => {
            if let Some(crf) = request.crf {
                invocation = invocation.crf(crf);
            }
        }
    }

    invocation.overwrite().output(output_path)
}

/// `WxH` becomes the filter form `W:H`; anything else is already a scale expression.
fn scale_expression(resolution: &str) -> String {
    let resolution = resolution.trim();
    match resolution.split_once('x') {
        Some((w, h))
            if !w.is_empty()
                && !h.is_empty()
                && w.chars().all(|c| c.is_ascii_digit())
                && h.chars().all(|c| c.is_ascii_digit()) =>
        {
            format!("{}:{}", w, h)
        }
        _ => resolution.to_string(),
    }
}
