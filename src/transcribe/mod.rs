//! Transcription boundary.
//!
//! Speech-to-text runs in an external service behind [`TranscriptionProvider`]. This module owns
//! the request shape, the credential check and the grouping of word timestamps into
//! [`CaptionSegment`]s. Provider failures are surfaced verbatim; there is no fallback to static
//! captions.

use std::path::PathBuf;

use crate::foundation::error::{AudiogramError, AudiogramResult, TranscriptionError};
use crate::scene::captions::CaptionSegment;

/// Environment variable holding the hosted provider's API key.
pub const API_KEY_ENV: &str = "ASSEMBLYAI_API_KEY";

/// Speaker label assigned to words the provider left unlabeled.
pub const DEFAULT_SPEAKER: &str = "Speaker A";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerCountType {
    #[default]
    Auto,
    Minimum,
    Exact,
}

/// Speaker-count constraint passed to diarization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeakerHint {
    Exact(u32),
    Minimum(u32),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionRequest {
    pub audio_path: PathBuf,
    pub speaker_recognition_enabled: bool,
    pub disfluencies_enabled: bool,
    pub speaker_count_type: SpeakerCountType,
    pub speaker_count_value: u32,
    pub keyterms: Vec<String>,
    pub speech_model: String,
    /// Upper bound on a caption's span, measured from its first word's start.
    pub max_segment_duration: f64,
}

impl Default for TranscriptionRequest {
    fn default() -> Self {
        Self {
            audio_path: PathBuf::new(),
            speaker_recognition_enabled: true,
            disfluencies_enabled: false,
            speaker_count_type: SpeakerCountType::Auto,
            speaker_count_value: 2,
            keyterms: Vec::new(),
            speech_model: "best".to_owned(),
            max_segment_duration: 3.0,
        }
    }
}

impl TranscriptionRequest {
    pub fn new(audio_path: impl Into<PathBuf>) -> Self {
        Self {
            audio_path: audio_path.into(),
            ..Self::default()
        }
    }

    /// `None` when diarization is off or the count is left to the provider.
    pub fn speaker_hint(&self) -> Option<SpeakerHint> {
        if !self.speaker_recognition_enabled {
            return None;
        }
        match self.speaker_count_type {
            SpeakerCountType::Auto => None,
            SpeakerCountType::Minimum => Some(SpeakerHint::Minimum(self.speaker_count_value)),
            SpeakerCountType::Exact => Some(SpeakerHint::Exact(self.speaker_count_value)),
        }
    }
}

/// One recognized word. Times are milliseconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptWord {
    pub start: u64,
    pub end: u64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

/// Raw provider output.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub words: Option<Vec<TranscriptWord>>,
}

pub trait TranscriptionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn transcribe(&self, request: &TranscriptionRequest) -> Result<Transcript, TranscriptionError>;
}

/// Read the provider credential from the environment.
pub fn provider_credential() -> Result<String, TranscriptionError> {
    credential_from(std::env::var(API_KEY_ENV).ok())
}

fn credential_from(value: Option<String>) -> Result<String, TranscriptionError> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TranscriptionError::Unavailable(format!(
            "set {API_KEY_ENV} to enable transcription"
        ))),
    }
}

/// Transcribe `request.audio_path` and group the words into caption segments.
#[tracing::instrument(skip_all, fields(provider = provider.name(), audio = %request.audio_path.display()))]
pub fn transcribe(
    provider: &dyn TranscriptionProvider,
    request: &TranscriptionRequest,
) -> AudiogramResult<Vec<CaptionSegment>> {
    if !request.audio_path.is_file() {
        return Err(AudiogramError::validation(format!(
            "audio file not found: {}",
            request.audio_path.display()
        )));
    }
    let transcript = provider.transcribe(request)?;
    let segments = group_words(
        &transcript,
        request.speaker_recognition_enabled,
        request.max_segment_duration,
    );
    tracing::debug!(segments = segments.len(), "transcript grouped");
    Ok(segments)
}

/// Group word timestamps into caption segments.
///
/// A word joins the running segment while it starts less than `max_duration` seconds after
/// the segment start and, with diarization on, has the same speaker. Bounds are rounded to
/// 0.01 s; a segment that would round to zero length (or has `end < start`) is widened to
/// 0.01 s. A transcript with text but no words becomes a single `[0, 10)` segment.
pub fn group_words(
    transcript: &Transcript,
    speaker_recognition: bool,
    max_duration: f64,
) -> Vec<CaptionSegment> {
    let Some(words) = &transcript.words else {
        return transcript
            .text
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| CaptionSegment::new(0.0, 10.0, t.clone()))
            .collect();
    };

    let mut out = Vec::new();
    let mut current: Option<CaptionSegment> = None;
    for word in words {
        let start = word.start as f64 / 1000.0;
        let end = word.end as f64 / 1000.0;
        let speaker = speaker_recognition
            .then(|| word.speaker.clone().unwrap_or_else(|| DEFAULT_SPEAKER.to_owned()));

        if let Some(seg) = current.as_mut()
            && start - seg.start < max_duration
            && (!speaker_recognition || seg.speaker == speaker)
        {
            seg.end = seg.end.max(end);
            seg.text.push(' ');
            seg.text.push_str(&word.text);
            continue;
        }
        if let Some(done) = current.take() {
            out.push(rounded(done));
        }
        current = Some(CaptionSegment {
            start,
            end,
            text: word.text.clone(),
            speaker,
        });
    }
    out.extend(current.map(rounded));
    out
}

fn rounded(mut seg: CaptionSegment) -> CaptionSegment {
    let start = (seg.start * 100.0).round();
    let end = (seg.end * 100.0).round().max(start + 1.0);
    seg.start = start / 100.0;
    seg.end = end / 100.0;
    seg
}

#[cfg(test)]
#[path = "../../tests/unit/transcribe/mod.rs"]
mod tests;
