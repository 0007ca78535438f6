//! Configuration module for enftrack

mod profiles;

pub use profiles::{ExtractionConfig, ExtractionConfigBuilder, ExtractionPreset};
