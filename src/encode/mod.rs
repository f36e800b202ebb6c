//! Video Assembler.

/// System `ffmpeg` muxing of the frame sequence with audio.
pub mod ffmpeg;

pub use ffmpeg::{AssembleConfig, assemble, is_ffmpeg_on_path};
