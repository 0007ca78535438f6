// src/config/profiles.rs
//
// Extraction presets for the common mains grids, and a builder that layers
// preset -> JSON config file -> individual overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::analysis::{FrequencyBand, PeakRefinement, TrackerConfig};
use crate::core::dsp::{FilterSpec, WindowType};
use crate::error::EnfError;

/// Preset extraction profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPreset {
    /// 50 Hz grids (Europe, Asia, Africa, Australia), 50 ± 5 Hz
    Mains50,
    /// 60 Hz grids (North America, parts of South America and Asia), 60 ± 5 Hz
    Mains60,
    /// 50 Hz with a ±0.1 Hz band and a long STFT window
    Narrow50,
    /// 60 Hz with a ±0.1 Hz band and a long STFT window
    Narrow60,
    /// User-defined settings
    Custom,
}

impl ExtractionPreset {
    pub fn all() -> Vec<Self> {
        vec![Self::Mains50, Self::Mains60, Self::Narrow50, Self::Narrow60]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace('-', "_").as_str() {
            "mains50" | "mains_50" | "50" | "50hz" => Some(Self::Mains50),
            "mains60" | "mains_60" | "60" | "60hz" => Some(Self::Mains60),
            "narrow50" | "narrow_50" => Some(Self::Narrow50),
            "narrow60" | "narrow_60" => Some(Self::Narrow60),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mains50 => "mains50",
            Self::Mains60 => "mains60",
            Self::Narrow50 => "narrow50",
            Self::Narrow60 => "narrow60",
            Self::Custom => "custom",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Mains50 => "50 Hz grid, 45-55 Hz band",
            Self::Mains60 => "60 Hz grid, 55-65 Hz band",
            Self::Narrow50 => "50 Hz grid, 49.9-50.1 Hz band, 4096-sample window",
            Self::Narrow60 => "60 Hz grid, 59.9-60.1 Hz band, 4096-sample window",
            Self::Custom => "User-defined settings",
        }
    }
}

/// Every tunable of one extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Nominal mains frequency in Hz
    pub target_frequency: f64,
    /// Half-width of the search/filter band in Hz
    pub tolerance: f64,
    /// Butterworth order of the bandpass prototype
    pub filter_order: usize,
    /// STFT window length in samples
    pub window_size: usize,
    /// STFT hop in samples
    pub hop_length: usize,
    /// Output grid rate in Hz
    pub target_rate: f64,
    /// Median / Savitzky-Golay window in output points (odd)
    pub smoothing_window: usize,
    pub peak_refinement: PeakRefinement,
    pub window_type: WindowType,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::from_preset(ExtractionPreset::Mains50)
    }
}

impl ExtractionConfig {
    pub fn from_preset(preset: ExtractionPreset) -> Self {
        let base = Self {
            target_frequency: 50.0,
            tolerance: 5.0,
            filter_order: 4,
            window_size: 1024,
            hop_length: 512,
            target_rate: 1.0,
            smoothing_window: 5,
            peak_refinement: PeakRefinement::PhaseVocoder,
            window_type: WindowType::Hann,
        };

        match preset {
            ExtractionPreset::Mains50 | ExtractionPreset::Custom => base,
            ExtractionPreset::Mains60 => Self { target_frequency: 60.0, ..base },
            ExtractionPreset::Narrow50 => Self {
                tolerance: 0.1,
                window_size: 4096,
                hop_length: 1024,
                ..base
            },
            ExtractionPreset::Narrow60 => Self {
                target_frequency: 60.0,
                tolerance: 0.1,
                window_size: 4096,
                hop_length: 1024,
                ..base
            },
        }
    }

    /// Check the sample-rate independent constraints.
    ///
    /// The smoothing window depends on the track length and is checked by the
    /// smoother itself, where a bad window is a recoverable failure.
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |msg: String| Err(EnfError::InvalidParameters(msg));

        if !self.target_frequency.is_finite() || self.target_frequency <= 0.0 {
            return invalid(format!("target frequency must be positive, got {}", self.target_frequency));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return invalid(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.filter_order == 0 {
            return invalid("filter order must be at least 1".into());
        }
        if self.window_size < 2 {
            return invalid(format!("window size must be at least 2, got {}", self.window_size));
        }
        if self.hop_length == 0 {
            return invalid("hop length must be positive".into());
        }
        // Phase advance over a hop longer than the window is ambiguous
        if self.peak_refinement == PeakRefinement::PhaseVocoder && self.hop_length > self.window_size {
            return invalid(format!(
                "hop length {} exceeds window size {} with phase-vocoder refinement",
                self.hop_length, self.window_size
            ));
        }
        if !self.target_rate.is_finite() || self.target_rate <= 0.0 {
            return invalid(format!("target rate must be positive, got {}", self.target_rate));
        }
        Ok(())
    }

    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new(self.target_frequency, self.tolerance, self.filter_order)
    }

    pub fn band(&self) -> FrequencyBand {
        FrequencyBand::new(self.target_frequency, self.tolerance)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            window_size: self.window_size,
            hop_length: self.hop_length,
            window_type: self.window_type,
            refinement: self.peak_refinement,
        }
    }
}

/// Builder layering preset, config file and explicit overrides
#[derive(Debug, Clone)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
    preset: ExtractionPreset,
}

impl ExtractionConfigBuilder {
    pub fn new() -> Self {
        Self::from_preset(ExtractionPreset::Mains50)
    }

    pub fn from_preset(preset: ExtractionPreset) -> Self {
        Self {
            config: ExtractionConfig::from_preset(preset),
            preset,
        }
    }

    /// Overlay the fields present in a JSON config file
    pub fn config_file(self, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        self.config_json(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Overlay the fields present in a JSON object
    pub fn config_json(mut self, text: &str) -> Result<Self> {
        let overlay: serde_json::Value = serde_json::from_str(text).context("Malformed JSON")?;
        let serde_json::Value::Object(fields) = overlay else {
            anyhow::bail!("Config must be a JSON object");
        };

        let mut merged = serde_json::to_value(self.config)?;
        if let serde_json::Value::Object(base) = &mut merged {
            for (key, value) in fields {
                if !base.contains_key(&key) {
                    anyhow::bail!("Unknown config key '{}'", key);
                }
                base.insert(key, value);
            }
        }

        self.config = serde_json::from_value(merged).context("Config field has the wrong type")?;
        self.preset = ExtractionPreset::Custom;
        Ok(self)
    }

    pub fn target_frequency(mut self, hz: f64) -> Self {
        self.config.target_frequency = hz;
        self.preset = ExtractionPreset::Custom;
        self
    }

    pub fn tolerance(mut self, hz: f64) -> Self {
        self.config.tolerance = hz;
        self.preset = ExtractionPreset::Custom;
        self
    }

    pub fn filter_order(mut self, order: usize) -> Self {
        self.config.filter_order = order;
        self.preset = ExtractionPreset::Custom;
        self
    }

    pub fn window_size(mut self, samples: usize) -> Self {
        self.config.window_size = samples;
        self.preset = ExtractionPreset::Custom;
        self
    }

    pub fn hop_length(mut self, samples: usize) -> Self {
        self.config.hop_length = samples;
        self.preset = ExtractionPreset::Custom;
        self
    }

    pub fn target_rate(mut self, hz: f64) -> Self {
        self.config.target_rate = hz;
        self.preset = ExtractionPreset::Custom;
        self
    }

    pub fn smoothing_window(mut self, points: usize) -> Self {
        self.config.smoothing_window = points;
        self.preset = ExtractionPreset::Custom;
        self
    }

    pub fn peak_refinement(mut self, refinement: PeakRefinement) -> Self {
        self.config.peak_refinement = refinement;
        self.preset = ExtractionPreset::Custom;
        self
    }

    pub fn window_type(mut self, window_type: WindowType) -> Self {
        self.config.window_type = window_type;
        self.preset = ExtractionPreset::Custom;
        self
    }

    /// Preset the current settings still match (Custom once anything is overridden)
    pub fn preset(&self) -> ExtractionPreset {
        self.preset
    }

    pub fn build(self) -> crate::error::Result<ExtractionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ExtractionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.target_frequency, 50.0);
        assert_eq!(config.tolerance, 5.0);
        assert_eq!(config.filter_order, 4);
        assert_eq!(config.window_size, 1024);
        assert_eq!(config.hop_length, 512);
        assert_eq!(config.target_rate, 1.0);
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.peak_refinement, PeakRefinement::PhaseVocoder);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        for preset in ExtractionPreset::all() {
            assert_eq!(ExtractionPreset::from_name(preset.name()), Some(preset));
            assert!(ExtractionConfig::from_preset(preset).validate().is_ok());
        }
        let narrow = ExtractionConfig::from_preset(ExtractionPreset::Narrow60);
        assert_eq!(narrow.target_frequency, 60.0);
        assert_eq!(narrow.window_size, 4096);
        assert_eq!(ExtractionPreset::from_name("bogus"), None);
    }

    #[test]
    fn test_layering() {
        let builder = ExtractionConfigBuilder::from_preset(ExtractionPreset::Mains60)
            .config_json(r#"{ "smoothing_window": 7, "peak_refinement": "none" }"#)
            .unwrap()
            .tolerance(2.0);
        assert_eq!(builder.preset(), ExtractionPreset::Custom);

        let config = builder.build().unwrap();
        assert_eq!(config.target_frequency, 60.0); // from preset
        assert_eq!(config.smoothing_window, 7); // from file
        assert_eq!(config.peak_refinement, PeakRefinement::None);
        assert_eq!(config.tolerance, 2.0); // override
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_values() {
        assert!(ExtractionConfigBuilder::new().config_json(r#"{ "windw_size": 10 }"#).is_err());
        assert!(ExtractionConfigBuilder::new().config_json("[1, 2]").is_err());

        let err = ExtractionConfigBuilder::new().hop_length(0).build().unwrap_err();
        assert!(matches!(err, EnfError::InvalidParameters(_)));
        assert!(ExtractionConfigBuilder::new().target_rate(-1.0).build().is_err());

        // Left to the smoother, which knows the track length
        assert!(ExtractionConfigBuilder::new().smoothing_window(4).build().is_ok());
    }

    #[test]
    fn test_hop_longer_than_window() {
        let err = ExtractionConfigBuilder::new()
            .window_size(1024)
            .hop_length(3000)
            .build()
            .unwrap_err();
        assert!(matches!(err, EnfError::InvalidParameters(_)));

        // Bin centres do not depend on the phase advance
        let config = ExtractionConfigBuilder::new()
            .window_size(1024)
            .hop_length(3000)
            .peak_refinement(PeakRefinement::None)
            .build();
        assert!(config.is_ok());
        assert!(ExtractionConfigBuilder::new().hop_length(1024).build().is_ok());
    }
}
