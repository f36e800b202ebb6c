pub type AudiogramResult<T> = Result<T, AudiogramError>;

#[derive(thiserror::Error, Debug)]
pub enum AudiogramError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("job cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures reported across the transcription boundary.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionError {
    /// The provider cannot be used at all (missing credential, unreachable).
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The provider accepted the request and reported a failure. The message is kept verbatim.
    #[error("{0}")]
    Provider(String),
}

impl AudiogramError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for failures that should be rejected before a job is queued.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for AudiogramError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
