use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::request::{ConversionRequest, OutputFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a file from the input directory and print the task result as JSON
    Convert(RequestArgs),

    /// Print the engine invocations a conversion would run, without running them
    Plan(RequestArgs),

    /// Check that the transcoding engine can be started
    Check,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "clipconv.toml")]
        output: PathBuf,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RequestArgs {
    /// File name inside the input directory
    #[arg(short, long)]
    pub input: String,

    /// Target format (gif, mp4, webm, mp3, wav, avi, mov, mkv)
    #[arg(short, long)]
    pub format: OutputFormat,

    /// Output size as WxH, or a scale expression for gif output
    #[arg(short, long)]
    pub resolution: Option<String>,

    /// Quality value, lower is better
    #[arg(long)]
    pub crf: Option<u32>,

    /// Video bitrate, e.g. 2M or 800k
    #[arg(short, long)]
    pub bitrate: Option<String>,
}

impl RequestArgs {
    pub fn into_request(self) -> ConversionRequest {
        let mut request = ConversionRequest::new(self.input, self.format);
        request.resolution = self.resolution;
        request.crf = self.crf;
        request.bitrate = self.bitrate;
        request
    }
}
