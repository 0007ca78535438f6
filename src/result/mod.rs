//! Extraction result types

mod diagnostics;
mod enf_result;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use enf_result::{EnfData, EnfResult, ExtractionInfo, ProcessingNotes};
