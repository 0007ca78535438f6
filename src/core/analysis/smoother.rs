// src/core/analysis/smoother.rs
//
// Two-stage smoothing of the uniform track: a running median knocks out
// isolated spurious peaks, then a degree-2 Savitzky-Golay fit removes
// frame-to-frame jitter without flattening the slow ENF drift.

use serde::{Deserialize, Serialize};

use super::resampler::UniformEnfTrack;
use crate::core::dsp::stats::{median_filter, savgol_filter};
use crate::error::{EnfError, Result};

/// Highest polynomial degree of the local fit
pub const SAVGOL_MAX_DEGREE: usize = 2;

/// Uniform track after robust smoothing of the frequency channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothedEnfTrack {
    pub time_stamps: Vec<f64>,
    pub frequencies: Vec<f64>,
    pub confidences: Vec<f64>,
    pub window: usize,
}

impl SmoothedEnfTrack {
    pub fn len(&self) -> usize {
        self.time_stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_stamps.is_empty()
    }

    /// View as a uniform track, e.g. to smooth again
    pub fn to_uniform(&self, target_rate: f64) -> UniformEnfTrack {
        UniformEnfTrack {
            time_stamps: self.time_stamps.clone(),
            frequencies: self.frequencies.clone(),
            confidences: self.confidences.clone(),
            target_rate,
        }
    }
}

/// Median filter followed by Savitzky-Golay smoothing, both over `window`
/// points. The window is never shrunk to fit a short track.
pub fn smooth(track: &UniformEnfTrack, window: usize) -> Result<SmoothedEnfTrack> {
    let len = track.frequencies.len();
    if window == 0 || window % 2 == 0 || window > len {
        return Err(EnfError::InvalidWindow { window, len });
    }

    let degree = SAVGOL_MAX_DEGREE.min(window - 1);
    let despiked = median_filter(&track.frequencies, window);
    let frequencies = savgol_filter(&despiked, window, degree);

    log::debug!("Smoothed {} points (window {}, degree {})", len, window, degree);

    Ok(SmoothedEnfTrack {
        time_stamps: track.time_stamps.clone(),
        frequencies,
        confidences: track.confidences.clone(),
        window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(frequencies: Vec<f64>) -> UniformEnfTrack {
        let n = frequencies.len();
        UniformEnfTrack {
            time_stamps: (0..n).map(|i| i as f64).collect(),
            frequencies,
            confidences: vec![0.8; n],
            target_rate: 1.0,
        }
    }

    #[test]
    fn test_spike_is_removed() {
        let mut freqs = vec![50.0; 11];
        freqs[5] = 53.0;
        let out = smooth(&uniform(freqs), 5).unwrap();
        for f in &out.frequencies {
            assert!((f - 50.0).abs() < 1e-9);
        }
        assert_eq!(out.confidences, vec![0.8; 11]);
    }

    #[test]
    fn test_window_validation() {
        let track = uniform(vec![50.0; 4]);
        assert_eq!(smooth(&track, 4), Err(EnfError::InvalidWindow { window: 4, len: 4 }));
        assert_eq!(smooth(&track, 0), Err(EnfError::InvalidWindow { window: 0, len: 4 }));
        assert_eq!(smooth(&track, 5), Err(EnfError::InvalidWindow { window: 5, len: 4 }));
        assert!(smooth(&track, 3).is_ok());
    }

    #[test]
    fn test_window_one_is_identity() {
        let freqs = vec![50.0, 50.2, 49.9];
        let out = smooth(&uniform(freqs.clone()), 1).unwrap();
        assert_eq!(out.frequencies, freqs);
    }

    #[test]
    fn test_smoothing_is_stable() {
        let freqs: Vec<f64> = (0..120)
            .map(|i| 50.0 + 0.05 * (i as f64 * 0.3).sin() + if i % 17 == 0 { 0.4 } else { 0.0 })
            .collect();
        let once = smooth(&uniform(freqs), 5).unwrap();
        let twice = smooth(&once.to_uniform(1.0), 5).unwrap();

        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!((mean(&once.frequencies) - mean(&twice.frequencies)).abs() < 0.01);
    }
}
