//! Job submission boundary.
//!
//! Form-style clients send nested structures either as JSON values or as JSON-encoded strings;
//! both are accepted for `theme`, `timedCaptions`, `speakerNames` and `captionFormatting`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::audio::trim::TrimWindow;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::scene::captions::{CaptionSegment, CaptionSource, TimedCaptions};
use crate::scene::formatting::FormattingOverrides;
use crate::scene::theme::Theme;
use crate::scene::waveform::{WaveformConfig, WaveformPositioning};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionMode {
    #[default]
    Static,
    /// Time-coded captions (typically produced by transcription).
    Auto,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    /// Audio file name inside the storage area, or an absolute path.
    pub audio_file: String,
    #[serde(deserialize_with = "json_or_string")]
    pub theme: Theme,
    #[serde(default)]
    pub caption_mode: CaptionMode,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, deserialize_with = "opt_json_or_string")]
    pub timed_captions: Option<Vec<CaptionSegment>>,
    #[serde(default, deserialize_with = "opt_json_or_string")]
    pub speaker_names: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub speaker_recognition_enabled: bool,
    #[serde(default, deserialize_with = "opt_json_or_string")]
    pub caption_formatting: Option<FormattingOverrides>,
    #[serde(default, deserialize_with = "opt_json_or_string")]
    pub waveform_positioning: Option<WaveformPositioning>,
    #[serde(default, deserialize_with = "opt_json_or_string")]
    pub waveform_config: Option<WaveformConfig>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

impl JobSubmission {
    /// Minimal submission with a default theme and no captions.
    pub fn new(audio_file: impl Into<String>) -> Self {
        Self {
            audio_file: audio_file.into(),
            theme: Theme::default(),
            caption_mode: CaptionMode::Static,
            caption: None,
            timed_captions: None,
            speaker_names: None,
            speaker_recognition_enabled: false,
            caption_formatting: None,
            waveform_positioning: None,
            waveform_config: None,
            start: None,
            end: None,
        }
    }

    pub fn from_json_str(s: &str) -> AudiogramResult<Self> {
        serde_json::from_str(s).map_err(|e| AudiogramError::validation(format!("submission: {e}")))
    }

    /// Reject malformed submissions before they are queued.
    pub fn validate(&self) -> AudiogramResult<()> {
        if self.audio_file.trim().is_empty() {
            return Err(AudiogramError::validation("audioFile is required"));
        }
        self.theme.validate()?;
        self.trim_window().validate()?;

        if self.caption_mode == CaptionMode::Auto {
            let Some(segments) = &self.timed_captions else {
                return Err(AudiogramError::validation(
                    "captionMode \"auto\" requires timedCaptions",
                ));
            };
            for (i, seg) in segments.iter().enumerate() {
                seg.validate().map_err(|e| {
                    AudiogramError::validation(format!("timedCaptions[{i}]: {e}"))
                })?;
            }
        }
        if let Some(f) = &self.caption_formatting {
            f.validate()?;
        }
        if let Some(p) = &self.waveform_positioning {
            p.validate()?;
        }
        if let Some(c) = &self.waveform_config {
            c.validate()?;
        }
        Ok(())
    }

    pub fn trim_window(&self) -> TrimWindow {
        TrimWindow {
            start: self.start,
            end: self.end,
        }
    }

    /// Caption source for rendering. Static and timed captions are mutually exclusive.
    pub fn caption_source(&self) -> CaptionSource {
        match self.caption_mode {
            CaptionMode::Auto => CaptionSource::Timed(TimedCaptions {
                segments: self.timed_captions.clone().unwrap_or_default(),
                speaker_names: self.speaker_names.clone().unwrap_or_default(),
                speaker_recognition: self.speaker_recognition_enabled,
            }),
            CaptionMode::Static => match self.caption.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => CaptionSource::Static(text.to_owned()),
                _ => CaptionSource::None,
            },
        }
    }

    pub fn waveform_positioning(&self) -> WaveformPositioning {
        self.waveform_positioning
            .unwrap_or(self.theme.waveform_positioning)
    }

    pub fn waveform_config(&self) -> WaveformConfig {
        self.waveform_config
            .clone()
            .unwrap_or_else(|| self.theme.waveform_config.clone())
    }

    pub fn formatting(&self) -> FormattingOverrides {
        self.caption_formatting.clone().unwrap_or_default()
    }
}

fn json_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
        v => serde_json::from_value(v).map_err(serde::de::Error::custom),
    }
}

fn opt_json_or_string<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => serde_json::from_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        v => serde_json::from_value(v)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/submission.rs"]
mod tests;
