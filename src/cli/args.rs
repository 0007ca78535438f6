//! CLI argument parsing with preset support

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ExtractionConfig, ExtractionConfigBuilder, ExtractionPreset};
use crate::core::analysis::PeakRefinement;
use crate::core::InputKind;

#[derive(Parser, Debug, Clone)]
#[command(name = "enftrack", version)]
#[command(about = "Extract Electric Network Frequency (ENF) curves from audio recordings and video brightness series")]
pub struct Args {
    /// Input files or directories
    #[arg(required_unless_present = "list_presets")]
    pub inputs: Vec<PathBuf>,

    /// Extraction preset
    #[arg(short, long, value_enum, default_value = "mains50")]
    pub preset: PresetArg,

    /// JSON config file layered over the preset
    #[arg(short, long, env = "ENFTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Nominal mains frequency in Hz
    #[arg(long)]
    pub target_frequency: Option<f64>,

    /// Half-width of the search band in Hz
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Butterworth filter order
    #[arg(long)]
    pub filter_order: Option<usize>,

    /// STFT window length in samples
    #[arg(long)]
    pub window_size: Option<usize>,

    /// STFT hop length in samples
    #[arg(long)]
    pub hop_length: Option<usize>,

    /// Output grid rate in Hz
    #[arg(long)]
    pub target_rate: Option<f64>,

    /// Smoothing window in output points (odd)
    #[arg(long)]
    pub smoothing_window: Option<usize>,

    /// Sub-bin frequency refinement
    #[arg(long, value_enum)]
    pub refinement: Option<RefinementArg>,

    /// Treat inputs as brightness series (one luma value per line) at this frame rate
    #[arg(long, value_name = "FPS")]
    pub brightness_fps: Option<f64>,

    /// Directory for `<stem>_enf_results.json` files
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Per-file time budget in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the JSON record instead of the summary
    #[arg(long)]
    pub json: bool,

    /// List available presets and exit
    #[arg(long)]
    pub list_presets: bool,

    /// Verbose output (debug logging, diagnostics detail)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum PresetArg {
    /// 50 Hz grid, 45-55 Hz band
    #[value(name = "mains50")]
    Mains50,
    /// 60 Hz grid, 55-65 Hz band
    #[value(name = "mains60")]
    Mains60,
    /// 50 Hz grid, ±0.1 Hz band, long window
    #[value(name = "narrow50")]
    Narrow50,
    /// 60 Hz grid, ±0.1 Hz band, long window
    #[value(name = "narrow60")]
    Narrow60,
}

impl From<PresetArg> for ExtractionPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Mains50 => ExtractionPreset::Mains50,
            PresetArg::Mains60 => ExtractionPreset::Mains60,
            PresetArg::Narrow50 => ExtractionPreset::Narrow50,
            PresetArg::Narrow60 => ExtractionPreset::Narrow60,
        }
    }
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum RefinementArg {
    /// Phase-vocoder instantaneous frequency
    PhaseVocoder,
    /// STFT bin centre frequency
    None,
}

impl From<RefinementArg> for PeakRefinement {
    fn from(arg: RefinementArg) -> Self {
        match arg {
            RefinementArg::PhaseVocoder => PeakRefinement::PhaseVocoder,
            RefinementArg::None => PeakRefinement::None,
        }
    }
}

impl Args {
    /// Preset, then config file, then individual flags
    pub fn extraction_config(&self) -> Result<ExtractionConfig> {
        let mut builder = ExtractionConfigBuilder::from_preset(self.preset.into());

        if let Some(path) = &self.config {
            builder = builder.config_file(path)?;
        }
        if let Some(v) = self.target_frequency {
            builder = builder.target_frequency(v);
        }
        if let Some(v) = self.tolerance {
            builder = builder.tolerance(v);
        }
        if let Some(v) = self.filter_order {
            builder = builder.filter_order(v);
        }
        if let Some(v) = self.window_size {
            builder = builder.window_size(v);
        }
        if let Some(v) = self.hop_length {
            builder = builder.hop_length(v);
        }
        if let Some(v) = self.target_rate {
            builder = builder.target_rate(v);
        }
        if let Some(v) = self.smoothing_window {
            builder = builder.smoothing_window(v);
        }
        if let Some(v) = self.refinement {
            builder = builder.peak_refinement(v.into());
        }

        builder.build().context("Invalid extraction settings")
    }

    pub fn input_kind(&self) -> InputKind {
        match self.brightness_fps {
            Some(frame_rate) => InputKind::Brightness { frame_rate },
            None => InputKind::Audio,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
