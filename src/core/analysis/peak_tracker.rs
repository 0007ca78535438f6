// src/core/analysis/peak_tracker.rs
//
// Spectral peak tracking: per STFT frame, the dominant frequency inside the
// mains band and how much of the frame's power it holds.
//
// At common audio rates the STFT bin spacing (fs / window) is far coarser than
// ENF variation. 44.1 kHz with a 1024-sample window gives 43 Hz bins and no bin
// at all between 45 and 55 Hz. Peak frequencies are therefore refined from the
// phase advance of the peak bin between consecutive frames.
//
// Down at bin 1 the tone's own negative-frequency image is only ~2 bins away
// and leaks into the peak bin. The bin value is modelled as tone plus conjugate
// image through the window's spectrum, and the tone phase is solved for before
// taking the phase advance.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::core::dsp::{window_response, SpectralFrame, Stft, WindowType};
use crate::error::{EnfError, Result};
use crate::result::{Diagnostic, Diagnostics};

/// Frequency interval searched for the ENF peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub target_hz: f64,
    pub tolerance_hz: f64,
}

impl FrequencyBand {
    pub fn new(target_hz: f64, tolerance_hz: f64) -> Self {
        Self { target_hz, tolerance_hz }
    }

    pub fn low_hz(&self) -> f64 {
        self.target_hz - self.tolerance_hz
    }

    pub fn high_hz(&self) -> f64 {
        self.target_hz + self.tolerance_hz
    }
}

/// How the frequency of the selected bin is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakRefinement {
    /// Instantaneous frequency from the inter-frame phase advance
    #[default]
    PhaseVocoder,
    /// Bin centre frequency
    None,
}

impl PeakRefinement {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "phase_vocoder" | "phase-vocoder" | "vocoder" => Some(PeakRefinement::PhaseVocoder),
            "none" | "off" | "bin" => Some(PeakRefinement::None),
            _ => None,
        }
    }
}

/// One tracked point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakEstimate {
    /// Frame centre in seconds
    pub timestamp: f64,
    /// Dominant frequency in Hz
    pub frequency: f64,
    /// Share of in-band power held by the peak bin (0.0-1.0)
    pub confidence: f64,
}

/// Per-frame peak estimates in time order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnfTrack {
    points: Vec<PeakEstimate>,
}

impl EnfTrack {
    pub fn from_estimates(points: Vec<PeakEstimate>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[PeakEstimate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn frequencies(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.frequency).collect()
    }

    pub fn confidences(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.confidence).collect()
    }
}

/// STFT parameters for the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    pub window_size: usize,
    pub hop_length: usize,
    pub window_type: WindowType,
    pub refinement: PeakRefinement,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            hop_length: 512,
            window_type: WindowType::Hann,
            refinement: PeakRefinement::PhaseVocoder,
        }
    }
}

/// Re-estimations of the offset with the image removed
const IMAGE_CORRECTION_PASSES: usize = 2;

/// Peak picked from one frame, before frequency refinement
#[derive(Debug, Clone, Copy)]
struct PeakPick {
    bin: usize,
    confidence: f64,
    silent: bool,
}

/// Short-time spectral peak tracker
pub struct SpectralPeakTracker {
    config: TrackerConfig,
}

impl Default for SpectralPeakTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl SpectralPeakTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Track the dominant in-band frequency of every STFT frame.
    ///
    /// Soft recoveries (band fallback, silent frames) are appended to
    /// `diagnostics`. Fails only when the signal cannot fill one window.
    pub fn track(
        &self,
        samples: &[f32],
        sample_rate: f64,
        band: FrequencyBand,
        diagnostics: &mut Diagnostics,
    ) -> Result<EnfTrack> {
        let stft = Stft::new(
            samples,
            sample_rate,
            self.config.window_size,
            self.config.hop_length,
            self.config.window_type,
        );

        let total_frames = stft.num_frames();
        if total_frames == 0 {
            return Err(EnfError::EmptySpectrum {
                samples: samples.len(),
                window: self.config.window_size,
            });
        }

        let bin_hz = stft.bin_hz();
        let hop_ratio = self.config.hop_length as f64 / self.config.window_size as f64;
        let bins = self.band_bins(&stft, band, sample_rate, diagnostics);

        log::debug!(
            "Tracking {} frames, bins {}..={} ({:.3} Hz spacing)",
            total_frames,
            bins.0,
            bins.1,
            bin_hz
        );

        let mut points = Vec::with_capacity(total_frames);
        let mut silent_frames = 0;
        let mut previous: Option<(SpectralFrame, PeakPick)> = None;

        for (index, frame) in stft.enumerate() {
            let pick = pick_peak(&frame, bins);
            if pick.silent {
                silent_frames += 1;
            }

            if let Some((prev_frame, prev_pick)) = previous.as_ref() {
                if index == 1 {
                    // First frame has no predecessor: use the forward difference
                    points.push(self.estimate(prev_frame, prev_pick, Some(&frame), band, bin_hz, hop_ratio));
                }
                points.push(self.estimate(&frame, &pick, Some(prev_frame), band, bin_hz, hop_ratio));
            }
            previous = Some((frame, pick));
        }

        if points.is_empty() {
            if let Some((frame, pick)) = previous.as_ref() {
                points.push(self.estimate(frame, pick, None, band, bin_hz, hop_ratio));
            }
        }

        if silent_frames > 0 {
            diagnostics.push(Diagnostic::ZeroPowerFrames { count: silent_frames, total_frames });
        }

        Ok(EnfTrack::from_estimates(points))
    }

    /// Inclusive bin range inside the band, or the full spectrum as fallback
    fn band_bins(
        &self,
        stft: &Stft<'_>,
        band: FrequencyBand,
        sample_rate: f64,
        diagnostics: &mut Diagnostics,
    ) -> (usize, usize) {
        let bin_hz = stft.bin_hz();
        let last_bin = stft.num_bins() - 1;
        let low = (band.low_hz() / bin_hz).ceil().max(0.0) as usize;
        let high = (band.high_hz() / bin_hz).floor();

        if high >= 0.0 && (high as usize).min(last_bin) >= low && low <= last_bin {
            return (low, (high as usize).min(last_bin));
        }

        diagnostics.push(Diagnostic::BandFallback {
            band_low_hz: band.low_hz(),
            band_high_hz: band.high_hz(),
            nyquist_hz: sample_rate / 2.0,
            bin_spacing_hz: bin_hz,
        });
        (0, last_bin)
    }

    fn estimate(
        &self,
        frame: &SpectralFrame,
        pick: &PeakPick,
        neighbour: Option<&SpectralFrame>,
        band: FrequencyBand,
        bin_hz: f64,
        hop_ratio: f64,
    ) -> PeakEstimate {
        if pick.silent {
            return PeakEstimate {
                timestamp: frame.time_secs,
                frequency: band.target_hz,
                confidence: 0.0,
            };
        }

        let offset = match (self.config.refinement, neighbour) {
            (PeakRefinement::PhaseVocoder, Some(other)) => {
                self.refined_offset(frame, other, pick.bin, hop_ratio).unwrap_or(0.0)
            }
            _ => 0.0,
        };

        PeakEstimate {
            timestamp: frame.time_secs,
            frequency: (pick.bin as f64 + offset) * bin_hz,
            confidence: pick.confidence,
        }
    }

    /// Phase-vocoder bin offset with the negative-frequency image removed
    fn refined_offset(
        &self,
        frame: &SpectralFrame,
        other: &SpectralFrame,
        bin: usize,
        hop_ratio: f64,
    ) -> Option<f64> {
        let (earlier, later) = in_time_order(frame, other);
        let mut offset = bin_offset(earlier, later, bin, hop_ratio)?;

        for _ in 0..IMAGE_CORRECTION_PASSES {
            let position = bin as f64 + offset;
            let (Some(first), Some(second)) = (
                self.tone_phase(earlier, bin, position),
                self.tone_phase(later, bin, position),
            ) else {
                break;
            };
            offset = phase_offset(second - first, bin, hop_ratio);
        }
        Some(offset)
    }

    /// Phase of the tone at `position` bins, solved from
    /// `X[bin] = a W(bin - position) + conj(a) W(bin + position)`.
    /// `None` when the tone and its image cannot be told apart (near DC).
    fn tone_phase(&self, frame: &SpectralFrame, bin: usize, position: f64) -> Option<f64> {
        let size = self.config.window_size;
        let window_type = self.config.window_type;

        let value = Complex64::from_polar(frame.power[bin].sqrt(), frame.phase[bin]);
        let direct = window_response(size, window_type, bin as f64 - position);
        let image = window_response(size, window_type, bin as f64 + position);

        let separation = direct.norm_sqr() - image.norm_sqr();
        if !(separation > 1e-6 * direct.norm_sqr()) {
            return None;
        }
        Some((value * direct.conj() - image * value.conj()).arg())
    }
}

/// Highest-power bin in `[low, high]`; ties go to the lowest index
fn pick_peak(frame: &SpectralFrame, (low, high): (usize, usize)) -> PeakPick {
    let considered = &frame.power[low..=high];
    let total: f64 = considered.iter().sum();

    let mut best = 0;
    for (i, &p) in considered.iter().enumerate() {
        if p > considered[best] {
            best = i;
        }
    }

    if total <= 0.0 || !total.is_finite() {
        return PeakPick { bin: low + best, confidence: 0.0, silent: true };
    }

    PeakPick {
        bin: low + best,
        confidence: (considered[best] / total).clamp(0.0, 1.0),
        silent: false,
    }
}

fn in_time_order<'a>(a: &'a SpectralFrame, b: &'a SpectralFrame) -> (&'a SpectralFrame, &'a SpectralFrame) {
    if b.time_secs < a.time_secs {
        (b, a)
    } else {
        (a, b)
    }
}

/// Fractional bin offset of the peak from the raw phase advance between two
/// adjacent frames. `None` when either frame has no energy in the bin.
fn bin_offset(earlier: &SpectralFrame, later: &SpectralFrame, bin: usize, hop_ratio: f64) -> Option<f64> {
    if earlier.power[bin] <= 0.0 || later.power[bin] <= 0.0 {
        return None;
    }
    Some(phase_offset(later.phase[bin] - earlier.phase[bin], bin, hop_ratio))
}

/// Offset from `bin` implied by a phase advance over one hop, within ±0.5 bin
fn phase_offset(advance: f64, bin: usize, hop_ratio: f64) -> f64 {
    let expected = 2.0 * PI * bin as f64 * hop_ratio;
    let deviation = wrap_phase(advance - expected);
    (deviation / (2.0 * PI * hop_ratio)).clamp(-0.5, 0.5)
}

/// Wrap to (-pi, pi]
fn wrap_phase(phase: f64) -> f64 {
    let wrapped = (phase + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}
