//! Output formatting for CLI results

use anyhow::{Context, Result};
use colorful::Colorful;
use std::path::{Path, PathBuf};

use crate::config::ExtractionPreset;
use crate::result::EnfResult;

/// Suffix of the per-input JSON record
pub const RESULT_SUFFIX: &str = "_enf_results.json";

/// `<output_dir>/<stem>_enf_results.json`
pub fn result_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    output_dir.join(format!("{}{}", stem, RESULT_SUFFIX))
}

/// Write the JSON record, creating the directory if needed
pub fn write_result(path: &Path, result: &EnfResult) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let json = result.to_json().context("Failed to serialize result")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Format an extraction result for terminal output
pub fn format_summary(input: &Path, result: &EnfResult, verbose: bool) -> String {
    let stats = result.statistics();
    let info = result.extraction_info();
    let confidence = result.mean_confidence();

    let mut output = String::new();
    output.push_str(&format!("{} {}\n", "✓".green(), input.display().to_string().bold()));
    output.push_str(&format!(
        "  Source: {} @ {} Hz | {} points over {:.0} s\n",
        info.source_type,
        info.sample_rate,
        result.len(),
        result.time_stamps().last().copied().unwrap_or(0.0)
    ));
    output.push_str(&format!(
        "  Mean: {:.4} Hz | Std: {:.4} Hz | Range: {:.4} Hz\n",
        stats.mean, stats.std, stats.range
    ));
    output.push_str(&format!(
        "  Deviation from {} Hz: {:.4} Hz | Stability: {:.3}\n",
        info.target_frequency, stats.target_deviation, stats.stability_score
    ));

    let confidence_text = format!("{:.0}%", confidence * 100.0);
    let confidence_text = if confidence >= 0.5 {
        confidence_text.green().to_string()
    } else if confidence >= 0.2 {
        confidence_text.yellow().to_string()
    } else {
        confidence_text.red().to_string()
    };
    output.push_str(&format!("  Mean confidence: {}\n", confidence_text));

    if !result.diagnostics().is_empty() {
        output.push_str(&format!("  {} diagnostic(s)\n", result.diagnostics().len()).yellow().to_string());
        if verbose {
            for d in result.diagnostics().iter() {
                output.push_str(&format!("    • {}\n", d.describe()));
            }
        }
    }

    if verbose {
        let notes = result.processing_notes();
        output.push_str(&format!("  Filter: {}\n", notes.bandpass_filter));
        output.push_str(&format!("  Smoothing: {}\n", notes.smoothing));
        output.push_str(&format!("  Resampling: {}\n", notes.resampling));
        output.push_str(&format!(
            "  STFT: window {} / hop {}, refinement {:?}\n",
            info.window_size, info.hop_length, info.peak_refinement
        ));
    }

    output
}

/// Format a failed input for terminal output
pub fn format_failure(input: &Path, error: &dyn std::fmt::Display) -> String {
    format!(
        "{} {}\n  {}\n",
        "✗".red(),
        input.display().to_string().bold(),
        error.to_string().red()
    )
}

/// List the built-in presets
pub fn format_presets() -> String {
    let mut output = String::from("Available presets:\n");
    for preset in ExtractionPreset::all() {
        output.push_str(&format!("  {:<10} {}\n", preset.name(), preset.description()));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_path() {
        let path = result_path(Path::new("out"), Path::new("/data/rec 01.flac"));
        assert_eq!(path, PathBuf::from("out/rec 01_enf_results.json"));
    }

    #[test]
    fn test_presets_listing() {
        let text = format_presets();
        assert!(text.contains("mains50"));
        assert!(text.contains("narrow60"));
    }
}
