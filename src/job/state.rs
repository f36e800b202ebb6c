use std::time::{SystemTime, UNIX_EPOCH};

use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Lifecycle stage of a render job.
///
/// Stages only move forward (skipping is allowed); [`JobStage::Error`] is reachable from any
/// non-terminal stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStage {
    Queued,
    AudioDownload,
    Trim,
    Probing,
    Waveform,
    Renderer,
    Frames,
    Combine,
    Ready,
    Error,
}

impl JobStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::AudioDownload => "audio-download",
            Self::Trim => "trim",
            Self::Probing => "probing",
            Self::Waveform => "waveform",
            Self::Renderer => "renderer",
            Self::Frames => "frames",
            Self::Combine => "combine",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::AudioDownload => 1,
            Self::Trim => 2,
            Self::Probing => 3,
            Self::Waveform => 4,
            Self::Renderer => 5,
            Self::Frames => 6,
            Self::Combine => 7,
            Self::Ready => 8,
            Self::Error => 9,
        }
    }

    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Error || next.rank() > self.rank()
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted state of one job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    pub id: uuid::Uuid,
    pub status: JobStage,
    /// Unix milliseconds.
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_frames: Option<u64>,
    #[serde(default)]
    pub frames_complete: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderJob {
    pub fn new(id: uuid::Uuid) -> Self {
        Self {
            id,
            status: JobStage::Queued,
            created_at: unix_millis(),
            num_frames: None,
            frames_complete: 0,
            url: None,
            error: None,
        }
    }

    pub fn advance(&mut self, next: JobStage) -> AudiogramResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(AudiogramError::validation(format!(
                "job {}: illegal transition {} -> {next}",
                self.id, self.status
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Move to `error` with a displayable message. A job that already finished keeps its state.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStage::Error;
        self.error = Some(message.into());
        true
    }

    /// Counters never go backwards, even when ticks arrive out of order.
    pub fn record_frames(&mut self, complete: u64) {
        self.frames_complete = self.frames_complete.max(complete);
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// What a status poll returns.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    pub status: JobStage,
    /// 1-based rank while queued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_complete: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl JobStatusReport {
    pub fn from_job(job: &RenderJob, position: Option<usize>) -> Self {
        let position = position.filter(|_| job.status == JobStage::Queued);
        Self {
            status: job.status,
            position,
            num_frames: job.num_frames,
            frames_complete: job.num_frames.map(|_| job.frames_complete),
            url: job.url.clone(),
            error: job.error.clone(),
            message: status_message(job, position),
        }
    }
}

/// Human-readable progress line for the current stage.
pub fn status_message(job: &RenderJob, position: Option<usize>) -> String {
    match job.status {
        JobStage::Queued => match position {
            Some(p) => format!("Waiting for other jobs to finish, #{p} in queue"),
            None => "Waiting for other jobs to finish".to_owned(),
        },
        JobStage::AudioDownload => "Downloading audio for processing".to_owned(),
        JobStage::Trim => "Trimming audio".to_owned(),
        JobStage::Probing => "Probing audio file".to_owned(),
        JobStage::Waveform => "Analyzing waveform".to_owned(),
        JobStage::Renderer => "Initializing renderer".to_owned(),
        JobStage::Frames => match job.num_frames {
            Some(n) if n > 0 => format!(
                "Generating frames, {}/{n} ({}% complete)",
                job.frames_complete,
                (100 * job.frames_complete.min(n)) / n
            ),
            _ => "Generating frames".to_owned(),
        },
        JobStage::Combine => "Combining frames with audio".to_owned(),
        JobStage::Ready => "Video ready".to_owned(),
        JobStage::Error => job
            .error
            .clone()
            .unwrap_or_else(|| "Render failed".to_owned()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/state.rs"]
mod tests;
