//! Audiogram renders audio into video: an animated waveform with burned-in captions, muxed with
//! the source audio by the system `ffmpeg`.
//!
//! The pipeline for one job:
//!
//! - [`audio::waveform::analyze`] reduces the decoded PCM stream to a [`WaveformSummary`]
//! - [`layout::layout_frame`] turns the scene plus one instant into a [`DisplayList`]
//! - [`render::render_frames`] rasterizes every frame to `frame-NNNNNN.png` on a bounded pool
//! - [`encode::assemble`] muxes the frames with the audio
//!
//! [`job::Orchestrator`] sequences these stages on long-lived workers and tracks job status.
#![forbid(unsafe_code)]

pub mod audio;
/// Video Assembler.
pub mod encode;
pub(crate) mod foundation;
pub mod job;
pub mod layout;
pub mod render;
/// Job input and theme model.
pub mod scene;
/// Process-wide configuration.
pub mod settings;
pub mod transcribe;

pub use crate::audio::waveform::{WaveformPoint, WaveformSummary};
pub use crate::foundation::color::Rgba8;
pub use crate::foundation::core::{CancelToken, Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{AudiogramError, AudiogramResult, TranscriptionError};
pub use crate::job::{JobStage, JobStatusReport, Orchestrator, RenderJob};
pub use crate::layout::{DisplayList, DrawOp, FrameScene};
pub use crate::scene::submission::JobSubmission;
pub use crate::scene::theme::Theme;
pub use crate::settings::Settings;
