// src/core/signal.rs
//
// Input signal types. Audio hum and video flicker both end up as a uniformly
// sampled scalar series before entering the pipeline.

use serde::{Deserialize, Serialize};

/// Where a signal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Audio,
    VideoBrightness,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Audio => write!(f, "audio"),
            SourceKind::VideoBrightness => write!(f, "video_brightness"),
        }
    }
}

/// Decoded input before reduction to a [`RawSignal`]
#[derive(Debug, Clone)]
pub enum SourceSignal {
    /// Mono samples normalized to [-1.0, 1.0]
    Audio { samples: Vec<f32>, sample_rate: f64 },
    /// Mean luma per video frame (any scale, e.g. 0-255)
    VideoBrightness { luma: Vec<f32>, frame_rate: f64 },
}

impl SourceSignal {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceSignal::Audio { .. } => SourceKind::Audio,
            SourceSignal::VideoBrightness { .. } => SourceKind::VideoBrightness,
        }
    }

    /// Reduce to the common scalar signal.
    ///
    /// Brightness is mean-removed and peak-normalized so flicker sits in the
    /// same amplitude range as audio hum.
    pub fn into_raw(self) -> RawSignal {
        match self {
            SourceSignal::Audio { samples, sample_rate } => {
                RawSignal::new(samples, sample_rate, SourceKind::Audio)
            }
            SourceSignal::VideoBrightness { mut luma, frame_rate } => {
                if !luma.is_empty() {
                    let mean = luma.iter().map(|&v| v as f64).sum::<f64>() / luma.len() as f64;
                    let peak = luma
                        .iter()
                        .map(|&v| (v as f64 - mean).abs())
                        .fold(0.0f64, f64::max);
                    for v in luma.iter_mut() {
                        let centered = *v as f64 - mean;
                        *v = if peak > 0.0 { (centered / peak) as f32 } else { 0.0 };
                    }
                }
                RawSignal::new(luma, frame_rate, SourceKind::VideoBrightness)
            }
        }
    }
}

/// Uniformly sampled mono signal owned by one pipeline invocation
#[derive(Debug, Clone)]
pub struct RawSignal {
    samples: Vec<f32>,
    sample_rate: f64,
    source: SourceKind,
}

impl RawSignal {
    pub fn new(samples: Vec<f32>, sample_rate: f64, source: SourceKind) -> Self {
        Self { samples, sample_rate, source }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.samples.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    /// Hand the buffer to the next stage
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
