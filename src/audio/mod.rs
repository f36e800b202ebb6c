//! Audio ingestion: probing, trimming, PCM streaming and waveform analysis.

/// Chunked PCM sources (`ffmpeg` child process, in-memory slices).
pub mod decode;
/// `ffprobe` metadata.
pub mod probe;
/// `ffmpeg` audio trimming.
pub mod trim;
/// Waveform Analyzer.
pub mod waveform;
