//! Extraction result record and its JSON form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diagnostics::Diagnostics;
use crate::config::ExtractionConfig;
use crate::core::analysis::{EnfStatistics, PeakRefinement, SmoothedEnfTrack};
use crate::core::signal::SourceKind;
use crate::error::RecordError;

/// Parameters an extraction ran with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionInfo {
    pub target_frequency: f64,
    pub tolerance: f64,
    pub sample_rate: f64,
    pub window_size: usize,
    pub hop_length: usize,
    pub filter_order: usize,
    pub target_rate: f64,
    pub smoothing_window: usize,
    pub peak_refinement: PeakRefinement,
    pub source_type: SourceKind,
    pub extracted_at: DateTime<Utc>,
    pub software_version: String,
}

impl ExtractionInfo {
    pub fn new(config: &ExtractionConfig, sample_rate: f64, source_type: SourceKind) -> Self {
        Self {
            target_frequency: config.target_frequency,
            tolerance: config.tolerance,
            sample_rate,
            window_size: config.window_size,
            hop_length: config.hop_length,
            filter_order: config.filter_order,
            target_rate: config.target_rate,
            smoothing_window: config.smoothing_window,
            peak_refinement: config.peak_refinement,
            source_type,
            extracted_at: Utc::now(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The ENF curve on its uniform grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnfData {
    pub frequencies: Vec<f64>,
    pub time_stamps: Vec<f64>,
    pub confidence_scores: Vec<f64>,
}

/// Human-readable summary of the processing chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingNotes {
    pub bandpass_filter: String,
    pub smoothing: String,
    pub resampling: String,
}

impl ProcessingNotes {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            bandpass_filter: format!(
                "{:.2}-{:.2} Hz, order {} Butterworth, zero-phase",
                config.target_frequency - config.tolerance,
                config.target_frequency + config.tolerance,
                config.filter_order
            ),
            smoothing: format!(
                "Median filter + Savitzky-Golay (window {})",
                config.smoothing_window
            ),
            resampling: format!("{} Hz target rate, linear interpolation", config.target_rate),
        }
    }
}

/// Complete output of one extraction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnfResult {
    extraction_info: ExtractionInfo,
    enf_data: EnfData,
    statistics: EnfStatistics,
    processing_notes: ProcessingNotes,
    diagnostics: Diagnostics,
}

impl EnfResult {
    pub(crate) fn new(
        extraction_info: ExtractionInfo,
        track: SmoothedEnfTrack,
        statistics: EnfStatistics,
        processing_notes: ProcessingNotes,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            extraction_info,
            enf_data: EnfData {
                frequencies: track.frequencies,
                time_stamps: track.time_stamps,
                confidence_scores: track.confidences,
            },
            statistics,
            processing_notes,
            diagnostics,
        }
    }

    pub fn extraction_info(&self) -> &ExtractionInfo {
        &self.extraction_info
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.enf_data.frequencies
    }

    pub fn time_stamps(&self) -> &[f64] {
        &self.enf_data.time_stamps
    }

    pub fn confidence_scores(&self) -> &[f64] {
        &self.enf_data.confidence_scores
    }

    pub fn statistics(&self) -> &EnfStatistics {
        &self.statistics
    }

    pub fn processing_notes(&self) -> &ProcessingNotes {
        &self.processing_notes
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.enf_data.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enf_data.frequencies.is_empty()
    }

    /// Mean of the per-point confidence scores
    pub fn mean_confidence(&self) -> f64 {
        crate::core::dsp::stats::mean(&self.enf_data.confidence_scores)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a record and check the curve invariants
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        let result: EnfResult = serde_json::from_str(text)?;
        result.check_consistency()?;
        Ok(result)
    }

    fn check_consistency(&self) -> Result<(), RecordError> {
        let data = &self.enf_data;
        let n = data.frequencies.len();

        if data.time_stamps.len() != n || data.confidence_scores.len() != n {
            return Err(RecordError::Inconsistent(format!(
                "enf_data arrays differ in length: {} frequencies, {} time stamps, {} confidence scores",
                n,
                data.time_stamps.len(),
                data.confidence_scores.len()
            )));
        }
        if let Some(i) = data.time_stamps.windows(2).position(|w| w[1] < w[0]) {
            return Err(RecordError::Inconsistent(format!(
                "time_stamps decrease at index {}",
                i + 1
            )));
        }
        if let Some(c) = data.confidence_scores.iter().find(|c| !(0.0..=1.0).contains(*c)) {
            return Err(RecordError::Inconsistent(format!(
                "confidence score {} outside [0, 1]",
                c
            )));
        }
        if data.frequencies.iter().any(|f| !f.is_finite()) {
            return Err(RecordError::Inconsistent("non-finite frequency".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::summarize;
    use crate::result::Diagnostic;

    fn sample_result() -> EnfResult {
        let config = ExtractionConfig::default();
        let track = SmoothedEnfTrack {
            time_stamps: vec![0.0, 1.0, 2.0],
            frequencies: vec![49.98, 50.0, 50.02],
            confidences: vec![0.6, 0.7, 0.8],
            window: 1,
        };
        let stats = summarize(&track.frequencies, 50.0);
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::ConfidenceClamped { count: 1 });

        EnfResult::new(
            ExtractionInfo::new(&config, 8000.0, SourceKind::Audio),
            track,
            stats,
            ProcessingNotes::new(&config),
            diags,
        )
    }

    #[test]
    fn test_json_sections() {
        let json = sample_result().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for section in ["extraction_info", "enf_data", "statistics", "processing_notes", "diagnostics"] {
            assert!(value.get(section).is_some(), "missing {}", section);
        }
        assert_eq!(value["extraction_info"]["source_type"], "audio");
        assert_eq!(value["extraction_info"]["peak_refinement"], "phase_vocoder");
        assert_eq!(value["enf_data"]["time_stamps"][2], 2.0);
        assert_eq!(value["diagnostics"][0]["kind"], "confidence_clamped");
        assert_eq!(value["processing_notes"]["bandpass_filter"], "45.00-55.00 Hz, order 4 Butterworth, zero-phase");
    }

    #[test]
    fn test_read_back() {
        let original = sample_result();
        let parsed = EnfResult::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.time_stamps(), original.time_stamps());
        assert_eq!(parsed.diagnostics(), original.diagnostics());
        assert_eq!(parsed.extraction_info().extracted_at, original.extraction_info().extracted_at);
        for (a, b) in parsed.frequencies().iter().zip(original.frequencies()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert!((parsed.mean_confidence() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_inconsistent_records() {
        let json = sample_result().to_json().unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["enf_data"]["confidence_scores"] = serde_json::json!([0.5, 0.5]);
        let err = EnfResult::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, RecordError::Inconsistent(_)));

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["enf_data"]["time_stamps"] = serde_json::json!([0.0, 2.0, 1.0]);
        assert!(EnfResult::from_json(&value.to_string()).is_err());

        assert!(matches!(EnfResult::from_json("{"), Err(RecordError::Json(_))));
    }
}
