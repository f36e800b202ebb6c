use std::path::Path;

use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Requested `[start, end)` window in seconds. Either bound may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrimWindow {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl TrimWindow {
    pub fn is_empty(self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn validate(self) -> AudiogramResult<()> {
        for (name, v) in [("start", self.start), ("end", self.end)] {
            if let Some(v) = v
                && (!v.is_finite() || v < 0.0)
            {
                return Err(AudiogramError::validation(format!(
                    "trim {name} must be a non-negative number of seconds, got {v}"
                )));
            }
        }
        if let (Some(s), Some(e)) = (self.start, self.end)
            && s >= e
        {
            return Err(AudiogramError::validation(format!(
                "trim start ({s}) must be before end ({e})"
            )));
        }
        Ok(())
    }

    fn ffmpeg_args(self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(s) = self.start {
            args.push("-ss".to_owned());
            args.push(format!("{s:.3}"));
        }
        if let Some(e) = self.end {
            args.push("-to".to_owned());
            args.push(format!("{e:.3}"));
        }
        args
    }
}

/// Cut `source` to `window` and write a PCM WAV to `out`.
#[tracing::instrument(skip(ffmpeg, source, out), fields(source = %source.display()))]
pub fn trim_audio(
    ffmpeg: &Path,
    source: &Path,
    window: TrimWindow,
    out: &Path,
) -> AudiogramResult<()> {
    window.validate()?;

    let mut cmd = std::process::Command::new(ffmpeg);
    cmd.args(["-y", "-v", "error", "-i"])
        .arg(source)
        .args(window.ffmpeg_args())
        .args(["-vn", "-acodec", "pcm_s16le"])
        .arg(out);
    tracing::debug!(?cmd, "trimming audio");

    let output = cmd.output().map_err(|e| {
        AudiogramError::decode(format!("failed to run '{}' for trim: {e}", ffmpeg.display()))
    })?;
    if !output.status.success() {
        return Err(AudiogramError::decode(format!(
            "ffmpeg trim of '{}' exited with status {}: {}",
            source.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let len = std::fs::metadata(out).map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        return Err(AudiogramError::decode(format!(
            "trimmed audio '{}' is missing or empty",
            out.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/audio/trim.rs"]
mod tests;
