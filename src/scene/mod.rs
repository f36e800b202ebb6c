//! Job data model: theme, captions, formatting overrides and the submission boundary.

pub mod captions;
pub mod formatting;
pub mod submission;
pub mod theme;
pub mod waveform;
