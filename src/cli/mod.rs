// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{Args, PresetArg, RefinementArg};
pub use output::{
    format_failure, format_presets, format_summary, result_path, write_result, RESULT_SUFFIX,
};

use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::InputKind;

/// Audio extensions picked up when scanning directories
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg", "m4a", "aac", "aiff", "aif"];

/// Extensions treated as brightness series when scanning directories
pub const BRIGHTNESS_EXTENSIONS: &[&str] = &["txt", "csv"];

/// Expand files and directories into the list of inputs to process.
///
/// Explicit file arguments are always kept; directories are walked for files
/// with a matching extension. Output is sorted and deduplicated.
pub fn collect_inputs(paths: &[PathBuf], kind: InputKind) -> Result<Vec<PathBuf>> {
    let extensions = match kind {
        InputKind::Audio => AUDIO_EXTENSIONS,
        InputKind::Brightness { .. } => BRIGHTNESS_EXTENSIONS,
    };

    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if has_extension(entry.path(), extensions) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            anyhow::bail!("Input not found: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        assert!(has_extension(Path::new("a/b.WAV"), AUDIO_EXTENSIONS));
        assert!(has_extension(Path::new("luma.csv"), BRIGHTNESS_EXTENSIONS));
        assert!(!has_extension(Path::new("notes.md"), AUDIO_EXTENSIONS));
        assert!(!has_extension(Path::new("noext"), AUDIO_EXTENSIONS));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let missing = PathBuf::from("/definitely/not/here.wav");
        assert!(collect_inputs(&[missing], InputKind::Audio).is_err());
    }
}
