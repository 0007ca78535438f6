//! Error types for ENF extraction
//!
//! Every pipeline stage returns an [`EnfError`] kind. The orchestrator wraps it
//! in a [`PipelineError`] tagged with the stage that failed, so callers can
//! tell a misconfigured filter apart from an input that was simply too short.

use std::fmt;
use thiserror::Error;

/// Failure kinds produced by the individual pipeline stages
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnfError {
    /// Malformed filter specification or extraction configuration
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The signal could not fill a single analysis window
    #[error("Empty spectrum: {samples} samples cannot fill a {window}-sample analysis window")]
    EmptySpectrum { samples: usize, window: usize },

    /// The track cannot define an interpolant
    #[error("Interpolation error: {0}")]
    Interpolation(String),

    /// Smoothing window is even, zero, or longer than the track
    #[error("Invalid smoothing window {window} for a track of {len} points (must be odd and <= length)")]
    InvalidWindow { window: usize, len: usize },

    /// Statistics requested over an empty track
    #[error("Cannot summarize an empty track")]
    EmptyTrack,

    /// Cancellation token was triggered between stages
    #[error("Extraction cancelled")]
    Cancelled,

    /// Deadline passed before the next stage could start
    #[error("Extraction deadline exceeded")]
    DeadlineExceeded,
}

/// Pipeline states, in the order an extraction moves through them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Loaded,
    Filtered,
    SpectrallyTracked,
    Resampled,
    Smoothed,
    Summarized,
    Done,
}

impl PipelineStage {
    /// Stage reached after this one completes
    pub fn next(self) -> Self {
        match self {
            PipelineStage::Loaded => PipelineStage::Filtered,
            PipelineStage::Filtered => PipelineStage::SpectrallyTracked,
            PipelineStage::SpectrallyTracked => PipelineStage::Resampled,
            PipelineStage::Resampled => PipelineStage::Smoothed,
            PipelineStage::Smoothed => PipelineStage::Summarized,
            PipelineStage::Summarized | PipelineStage::Done => PipelineStage::Done,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Loaded => "loaded",
            PipelineStage::Filtered => "filtered",
            PipelineStage::SpectrallyTracked => "spectrally_tracked",
            PipelineStage::Resampled => "resampled",
            PipelineStage::Smoothed => "smoothed",
            PipelineStage::Summarized => "summarized",
            PipelineStage::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Absorbing failure state of an extraction.
///
/// `stage` is the stage whose output could not be produced (`Loaded` for a
/// rejected configuration); `kind` is what went wrong.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("ENF extraction failed at stage '{stage}': {kind}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub kind: EnfError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, kind: EnfError) -> Self {
        Self { stage, kind }
    }

    /// Whether the caller can retry with a different configuration
    /// (currently only a smaller smoothing window)
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind, EnfError::InvalidWindow { .. })
    }
}

/// Ingestion failures, kept apart from pipeline errors since decoding happens
/// before a pipeline exists
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Audio decode error: {0}")]
    Symphonia(#[from] symphonia::core::errors::Error),

    #[error("Unsupported input: {0}")]
    Unsupported(String),

    #[error("Malformed brightness series at line {line}: {reason}")]
    Brightness { line: usize, reason: String },

    #[error("No samples decoded from input")]
    NoSamples,
}

/// A serialized result that cannot be read back
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Malformed result JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Inconsistent result record: {0}")]
    Inconsistent(String),
}

/// Convenience Result type for stage operations
pub type Result<T> = std::result::Result<T, EnfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let mut stage = PipelineStage::Loaded;
        let mut visited = vec![stage];
        while stage != PipelineStage::Done {
            stage = stage.next();
            visited.push(stage);
        }
        assert_eq!(visited.len(), 7);
        assert_eq!(visited[2], PipelineStage::SpectrallyTracked);
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::new(
            PipelineStage::SpectrallyTracked,
            EnfError::EmptySpectrum { samples: 100, window: 1024 },
        );
        let msg = err.to_string();
        assert!(msg.contains("at stage 'spectrally_tracked'"));
        assert!(msg.contains("1024"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invalid_window_is_recoverable() {
        let err = PipelineError::new(
            PipelineStage::Smoothed,
            EnfError::InvalidWindow { window: 7, len: 3 },
        );
        assert!(err.is_recoverable());
    }
}
