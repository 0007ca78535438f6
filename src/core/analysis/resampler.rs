// src/core/analysis/resampler.rs
//
// Uniform-rate resampling of the per-frame track. Frame centres sit at
// (m * hop + window / 2) / fs, which never lands on whole seconds; reference
// ENF databases are sampled at 1 Hz from t = 0.

use serde::{Deserialize, Serialize};

use super::peak_tracker::EnfTrack;
use crate::error::{EnfError, Result};

/// Slack when deciding whether the last grid point still fits before the end
const GRID_EPSILON: f64 = 1e-9;

/// Track on the grid `0, step, 2 * step, ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformEnfTrack {
    pub time_stamps: Vec<f64>,
    pub frequencies: Vec<f64>,
    pub confidences: Vec<f64>,
    pub target_rate: f64,
}

impl UniformEnfTrack {
    pub fn len(&self) -> usize {
        self.time_stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_stamps.is_empty()
    }

    pub fn step(&self) -> f64 {
        1.0 / self.target_rate
    }
}

/// Output of [`resample`]
#[derive(Debug, Clone)]
pub struct Resampled {
    pub track: UniformEnfTrack,
    /// Interpolated confidences that had to be clamped into [0, 1]
    pub clamped_confidences: usize,
}

/// Resample a track onto a uniform grid by linear interpolation.
///
/// Grid points before the first frame or after the last are linearly
/// extrapolated from the two nearest points.
pub fn resample(track: &EnfTrack, target_rate: f64) -> Result<Resampled> {
    let points = track.points();

    if !target_rate.is_finite() || target_rate <= 0.0 {
        return Err(EnfError::Interpolation(format!(
            "target rate must be positive and finite, got {}",
            target_rate
        )));
    }
    if points.len() < 2 {
        return Err(EnfError::Interpolation(format!(
            "need at least 2 points to interpolate, got {}",
            points.len()
        )));
    }
    if let Some(i) = points.windows(2).position(|w| !(w[1].timestamp > w[0].timestamp)) {
        return Err(EnfError::Interpolation(format!(
            "timestamps not strictly increasing at index {}",
            i + 1
        )));
    }

    let step = 1.0 / target_rate;
    let last = points[points.len() - 1].timestamp;
    if last < 0.0 {
        return Err(EnfError::Interpolation("track ends before t = 0".into()));
    }
    let count = (last / step + GRID_EPSILON).floor() as usize + 1;

    let times: Vec<f64> = points.iter().map(|p| p.timestamp).collect();
    let mut time_stamps = Vec::with_capacity(count);
    let mut frequencies = Vec::with_capacity(count);
    let mut confidences = Vec::with_capacity(count);
    let mut clamped = 0;

    for i in 0..count {
        let t = i as f64 * step;
        let (a, b) = bracket(&times, t);
        let frac = (t - times[a]) / (times[b] - times[a]);
        let lerp = |ya: f64, yb: f64| ya + frac * (yb - ya);

        let confidence = lerp(points[a].confidence, points[b].confidence);
        let bounded = confidence.clamp(0.0, 1.0);
        if bounded != confidence {
            clamped += 1;
        }

        time_stamps.push(t);
        frequencies.push(lerp(points[a].frequency, points[b].frequency));
        confidences.push(bounded);
    }

    log::debug!(
        "Resampled {} frames to {} points at {} Hz",
        points.len(),
        count,
        target_rate
    );

    Ok(Resampled {
        track: UniformEnfTrack { time_stamps, frequencies, confidences, target_rate },
        clamped_confidences: clamped,
    })
}

/// Indices of the segment used for `t`; edge segments extend outwards
fn bracket(times: &[f64], t: f64) -> (usize, usize) {
    let upper = times.partition_point(|&x| x <= t);
    let b = upper.clamp(1, times.len() - 1);
    (b - 1, b)
}
