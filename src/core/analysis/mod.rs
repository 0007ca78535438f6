//! ENF tracking stages
//!
//! Each stage is a pure transformation over owned buffers:
//! - Spectral peak tracking (per-frame dominant in-band frequency + confidence)
//! - Uniform resampling (frame centres onto a fixed-rate grid)
//! - Robust smoothing (median + Savitzky-Golay)
//! - Summary statistics

mod peak_tracker;
mod resampler;
mod smoother;
mod statistics;

pub use peak_tracker::{
    EnfTrack, FrequencyBand, PeakEstimate, PeakRefinement, SpectralPeakTracker, TrackerConfig,
};
pub use resampler::{resample, Resampled, UniformEnfTrack};
pub use smoother::{smooth, SmoothedEnfTrack, SAVGOL_MAX_DEGREE};
pub use statistics::{summarize, EnfStatistics};
