use std::collections::BTreeMap;

use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Time-bounded caption text over `[start, end)` seconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptionSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl CaptionSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            speaker: None,
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// `true` when `t` falls in `[start, end)`.
    pub fn is_active_at(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    pub fn validate(&self) -> AudiogramResult<()> {
        if !self.start.is_finite() || !self.end.is_finite() || self.start < 0.0 {
            return Err(AudiogramError::validation(format!(
                "caption segment times must be finite and non-negative (start={}, end={})",
                self.start, self.end
            )));
        }
        if self.start >= self.end {
            return Err(AudiogramError::validation(format!(
                "caption segment start ({}) must be before end ({})",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Every segment active at `t`, in input order. Overlapping segments are all returned.
pub fn active_segments(segments: &[CaptionSegment], t: f64) -> Vec<&CaptionSegment> {
    segments.iter().filter(|s| s.is_active_at(t)).collect()
}

/// Timed captions with their speaker display options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimedCaptions {
    pub segments: Vec<CaptionSegment>,
    /// Speaker label -> display name.
    pub speaker_names: BTreeMap<String, String>,
    /// Prefix captions with the speaker name.
    pub speaker_recognition: bool,
}

impl TimedCaptions {
    /// Display name for a speaker label: the mapped name, else the raw label.
    pub fn display_name<'a>(&'a self, label: &'a str) -> &'a str {
        self.speaker_names
            .get(label)
            .map(String::as_str)
            .unwrap_or(label)
    }

    /// Caption text as drawn: `"Name: text"` when speaker recognition is on and the segment
    /// has a speaker, otherwise the raw text.
    pub fn display_text(&self, seg: &CaptionSegment) -> String {
        match (&seg.speaker, self.speaker_recognition) {
            (Some(label), true) => format!("{}: {}", self.display_name(label), seg.text),
            _ => seg.text.clone(),
        }
    }
}

/// Caption mode for one job. Static and timed captions never render in the same frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CaptionSource {
    #[default]
    None,
    Static(String),
    Timed(TimedCaptions),
}

#[cfg(test)]
#[path = "../../tests/unit/scene/captions.rs"]
mod tests;
