use std::path::Path;

use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Audio stream facts reported by `ffprobe`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AudioInfo {
    pub duration_secs: f64,
    pub channels: u16,
    pub sample_rate: u32,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    channels: Option<u16>,
    sample_rate: Option<String>,
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe the first audio stream of `source` through `ffprobe`.
#[tracing::instrument(skip(ffprobe, source), fields(source = %source.display()))]
pub fn probe_audio(ffprobe: &Path, source: &Path) -> AudiogramResult<AudioInfo> {
    let out = std::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source)
        .output()
        .map_err(|e| {
            AudiogramError::decode(format!("failed to run '{}': {e}", ffprobe.display()))
        })?;
    if !out.status.success() {
        return Err(AudiogramError::decode(format!(
            "ffprobe failed for '{}': {}",
            source.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(&out.stdout)
}

/// Extract [`AudioInfo`] from `ffprobe -print_format json` output.
pub fn parse_probe_json(bytes: &[u8]) -> AudiogramResult<AudioInfo> {
    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| AudiogramError::decode(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| AudiogramError::decode("no audio stream found"))?;

    let channels = stream
        .channels
        .filter(|&c| c > 0)
        .ok_or_else(|| AudiogramError::decode("missing audio channel count from ffprobe"))?;
    let sample_rate = stream
        .sample_rate
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    // Container duration is more reliable than stream duration for compressed formats.
    let duration_secs = parsed
        .format
        .and_then(|f| f.duration)
        .or_else(|| stream.duration.clone())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| AudiogramError::decode("missing audio duration from ffprobe"))?;

    Ok(AudioInfo {
        duration_secs,
        channels,
        sample_rate,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/probe.rs"]
mod tests;
