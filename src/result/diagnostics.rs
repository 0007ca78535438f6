//! Soft-recovery records attached to every extraction result

use serde::{Deserialize, Serialize};

/// A condition the pipeline recovered from locally instead of failing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No STFT bin fell inside the configured band; the full spectrum was used
    BandFallback {
        band_low_hz: f64,
        band_high_hz: f64,
        nyquist_hz: f64,
        bin_spacing_hz: f64,
    },
    /// Filter output contained NaN/inf values that were replaced
    NonFiniteClamped { count: usize },
    /// Frames with zero total power reported the target frequency at zero confidence
    ZeroPowerFrames { count: usize, total_frames: usize },
    /// Extrapolated confidence values fell outside [0, 1] and were clamped
    ConfidenceClamped { count: usize },
}

impl Diagnostic {
    pub fn describe(&self) -> String {
        match self {
            Diagnostic::BandFallback { band_low_hz, band_high_hz, nyquist_hz, bin_spacing_hz } => format!(
                "No spectral bin in {:.2}-{:.2} Hz (Nyquist {:.1} Hz, bin spacing {:.3} Hz); used full spectrum",
                band_low_hz, band_high_hz, nyquist_hz, bin_spacing_hz
            ),
            Diagnostic::NonFiniteClamped { count } => {
                format!("{} non-finite filter output samples clamped", count)
            }
            Diagnostic::ZeroPowerFrames { count, total_frames } => {
                format!("{} of {} frames had zero power", count, total_frames)
            }
            Diagnostic::ConfidenceClamped { count } => {
                format!("{} extrapolated confidence values clamped to [0, 1]", count)
            }
        }
    }
}

/// Ordered collection of diagnostics for one extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic.describe());
        self.0.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_band_fallback(&self) -> bool {
        self.0.iter().any(|d| matches!(d, Diagnostic::BandFallback { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag() {
        let d = Diagnostic::NonFiniteClamped { count: 3 };
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"kind":"non_finite_clamped","count":3}"#);
    }

    #[test]
    fn test_band_fallback_lookup() {
        let mut diags = Diagnostics::new();
        assert!(!diags.has_band_fallback());
        diags.push(Diagnostic::ZeroPowerFrames { count: 1, total_frames: 10 });
        diags.push(Diagnostic::BandFallback {
            band_low_hz: 45.0,
            band_high_hz: 55.0,
            nyquist_hz: 40.0,
            bin_spacing_hz: 0.078,
        });
        assert!(diags.has_band_fallback());
        assert_eq!(diags.len(), 2);
    }
}
