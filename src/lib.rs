//! Clipconv - single-file media conversion
//!
//! Converts an uploaded media file to a target format by driving ffmpeg, using a
//! two-stage palette pipeline for animated GIF output.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod request;
pub mod task;
