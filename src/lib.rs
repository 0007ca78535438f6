//! enftrack - Electric Network Frequency extraction
//!
//! Recovers the mains-frequency curve (nominally 50/60 Hz) that power-line hum
//! leaves in audio recordings and that LED/fluorescent flicker leaves in video
//! brightness. The curve is a forensic fingerprint for timestamp and
//! authenticity checks against grid reference data.
//!
//! ## Pipeline
//!
//! | Stage              | What it does                                          |
//! |--------------------|-------------------------------------------------------|
//! | Bandpass filter    | Zero-phase Butterworth around target ± tolerance      |
//! | Peak tracking      | STFT, dominant in-band bin per frame + confidence     |
//! | Resampling         | Linear interpolation onto a 1 Hz grid from t = 0      |
//! | Smoothing          | Median filter, then Savitzky-Golay (degree 2)         |
//! | Statistics         | Mean, spread, deviation from nominal, stability       |
//!
//! ## Module Structure
//!
//! - `core` - Pipeline stages, DSP kernels, ingestion and batch running
//! - `config` - Extraction presets and configuration layering
//! - `result` - Result record, JSON form and diagnostics
//! - `cli` - Command-line interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use enftrack::{EnfExtractor, ExtractionConfig, ExtractionPreset, SourceSignal};
//!
//! let extractor = EnfExtractor::new(ExtractionConfig::from_preset(ExtractionPreset::Mains50));
//! let result = extractor.extract(SourceSignal::Audio { samples, sample_rate: 44100.0 })?;
//!
//! println!("Mean ENF: {:.3} Hz", result.statistics().mean);
//! std::fs::write("out.json", result.to_json()?)?;
//! ```

// Core extraction functionality
pub mod core;

// Command-line interface
pub mod cli;

// Configuration and presets
pub mod config;

// Error types
pub mod error;

// Result types
pub mod result;

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ExtractionPreset};
pub use core::analysis::{EnfStatistics, PeakRefinement};
pub use core::{
    BatchError, BatchOutcome, BatchRunner, CancellationToken, EnfExtractor, ExtractionControl,
    InputKind, RawSignal, SourceKind, SourceSignal,
};
pub use error::{DecodeError, EnfError, PipelineError, PipelineStage, RecordError};
pub use result::{Diagnostic, Diagnostics, EnfResult};
