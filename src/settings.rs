//! Process-wide configuration.
//!
//! Settings are loaded from an optional JSON file; every field has a default so an empty
//! object (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{AudiogramError, AudiogramResult};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Settings {
    /// Root for per-job working directories (frames, trimmed audio).
    pub working_directory: PathBuf,
    /// Root for submitted audio and finished videos.
    pub storage_path: PathBuf,
    /// Root that relative theme asset paths (fonts, background images) resolve against.
    pub theme_asset_root: PathBuf,
    /// Long-lived job workers.
    pub worker_count: usize,
    /// Upper bound on simultaneous `ffmpeg` encodes across all jobs.
    pub max_concurrent_encoders: usize,
    /// Rendering surfaces (and rasterizer threads) per frames stage.
    pub render_pool_width: usize,
    /// Frame rate used when the theme does not set one.
    pub default_fps: u32,
    /// Waveform sub-points per frame used when the theme does not set one.
    pub default_samples_per_frame: usize,
    /// Hard cap on retained PCM samples during waveform analysis.
    pub max_waveform_samples: usize,
    /// Multiplier applied to `frames * samplesPerFrame` when estimating the input length.
    pub waveform_oversampling: usize,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Keep job working directories after completion (debugging aid).
    pub keep_work_dir: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            working_directory: std::env::temp_dir().join("audiogram"),
            storage_path: PathBuf::from("media"),
            theme_asset_root: PathBuf::from("."),
            worker_count: 1,
            max_concurrent_encoders: 1,
            render_pool_width: 10,
            default_fps: 20,
            default_samples_per_frame: 128,
            max_waveform_samples: 5_000_000,
            waveform_oversampling: 100,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            keep_work_dir: false,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> AudiogramResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings '{}'", path.display()))?;
        let settings: Self = serde_json::from_str(&text).map_err(|e| {
            AudiogramError::serde(format!("settings '{}': {e}", path.display()))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AudiogramResult<()> {
        if self.worker_count == 0 {
            return Err(AudiogramError::validation("workerCount must be >= 1"));
        }
        if self.max_concurrent_encoders == 0 {
            return Err(AudiogramError::validation(
                "maxConcurrentEncoders must be >= 1",
            ));
        }
        if self.render_pool_width == 0 {
            return Err(AudiogramError::validation("renderPoolWidth must be >= 1"));
        }
        if self.default_fps == 0 {
            return Err(AudiogramError::validation("defaultFps must be > 0"));
        }
        if self.default_samples_per_frame == 0 {
            return Err(AudiogramError::validation(
                "defaultSamplesPerFrame must be > 0",
            ));
        }
        if self.max_waveform_samples == 0 || self.waveform_oversampling == 0 {
            return Err(AudiogramError::validation(
                "maxWaveformSamples and waveformOversampling must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/settings.rs"]
mod tests;
