//! Core extraction pipeline, DSP and ingestion

pub mod analysis;
pub mod batch;
pub mod decoder;
pub mod dsp;
pub mod extractor;
pub mod signal;

pub use batch::{BatchError, BatchOutcome, BatchRunner};
pub use decoder::{decode_audio, load_source, AudioData, InputKind};
pub use extractor::{CancellationToken, EnfExtractor, ExtractionControl};
pub use signal::{RawSignal, SourceKind, SourceSignal};
