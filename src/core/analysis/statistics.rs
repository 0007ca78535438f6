// src/core/analysis/statistics.rs
//
// Summary statistics over the smoothed frequency channel.

use serde::{Deserialize, Serialize};

use crate::core::dsp::stats::{mean, population_std};

/// Summary of one ENF curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnfStatistics {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    /// Mean absolute deviation from the nominal frequency
    pub target_deviation: f64,
    /// 1 / (1 + std); 1.0 for a perfectly flat curve
    pub stability_score: f64,
}

/// Compute statistics for a non-empty frequency series.
///
/// Callers reject empty tracks beforehand; an empty slice yields all zeros
/// with a stability of 1.0.
pub fn summarize(frequencies: &[f64], target_frequency: f64) -> EnfStatistics {
    let mean = mean(frequencies);
    let std = population_std(frequencies);
    let min = frequencies.iter().copied().fold(f64::INFINITY, f64::min);
    let max = frequencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (min, max) = if frequencies.is_empty() { (0.0, 0.0) } else { (min, max) };

    let target_deviation = if frequencies.is_empty() {
        0.0
    } else {
        frequencies.iter().map(|f| (f - target_frequency).abs()).sum::<f64>() / frequencies.len() as f64
    };

    EnfStatistics {
        mean,
        std,
        min,
        max,
        range: max - min,
        target_deviation,
        stability_score: 1.0 / (1.0 + std),
    }
}
