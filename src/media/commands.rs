use std::path::{Path, PathBuf};

/// One run of the transcoding engine: an argument vector and the file it must produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub args: Vec<String>,
    pub output_path: PathBuf,
    pub description: String,
}

impl EngineInvocation {
    /// Start an invocation with no arguments
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self {
            args: Vec::new(),
            output_path: PathBuf::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Set the output file. Must be the last call.
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        self.output_path = path.to_path_buf();
        self.arg(path.to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set output frame size
    pub fn size<S: Into<String>>(self, size: S) -> Self {
        self.arg("-s").arg(size)
    }

    pub fn video_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:v").arg(bitrate)
    }

    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    /// Set encoder speed preset
    pub fn preset<S: Into<String>>(self, preset: S) -> Self {
        self.arg("-preset").arg(preset)
    }

    /// Set constant rate factor
    pub fn crf(self, crf: u32) -> Self {
        self.arg("-crf").arg(crf.to_string())
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add a filter graph spanning several inputs
    pub fn complex_filter<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-lavfi").arg(graph)
    }

    /// Whether any argument mentions the given path
    pub fn references<P: AsRef<Path>>(&self, path: P) -> bool {
        let needle = path.as_ref().to_string_lossy();
        self.args.iter().any(|arg| *arg == needle)
    }
}
