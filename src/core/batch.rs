// src/core/batch.rs
//
// Parallel extraction over many inputs. Every item runs its own pipeline with
// private buffers; the filter cache inside the extractor is the only shared
// state. A failing item never affects its siblings.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::time::Duration;
use thiserror::Error;

use super::extractor::{CancellationToken, EnfExtractor, ExtractionControl};
use super::signal::SourceSignal;
use crate::error::PipelineError;
use crate::result::EnfResult;

/// Why a batch item produced no result
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("{0:#}")]
    Load(anyhow::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Outcome of one batch item, in input order
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub result: Result<EnfResult, BatchError>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs independent extractions on the rayon pool
pub struct BatchRunner {
    extractor: EnfExtractor,
    timeout: Option<Duration>,
    token: CancellationToken,
    progress: Option<ProgressBar>,
}

impl BatchRunner {
    pub fn new(extractor: EnfExtractor) -> Self {
        Self {
            extractor,
            timeout: None,
            token: CancellationToken::new(),
            progress: None,
        }
    }

    /// Per-item time budget, measured from when the item starts
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ticked once per finished item
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Token that cancels every item before its next stage
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn extractor(&self) -> &EnfExtractor {
        &self.extractor
    }

    /// Extract from already decoded sources
    pub fn run(&self, sources: Vec<SourceSignal>) -> Vec<BatchOutcome> {
        log::debug!("Batch of {} decoded sources", sources.len());
        sources
            .into_par_iter()
            .enumerate()
            .map(|(index, source)| self.finish(index, self.extract_one(source)))
            .collect()
    }

    /// Load and extract each input; loading runs on the pool too
    pub fn run_inputs<I, F>(&self, inputs: &[I], load: F) -> Vec<BatchOutcome>
    where
        I: Sync,
        F: Fn(&I) -> anyhow::Result<SourceSignal> + Sync,
    {
        log::debug!("Batch of {} inputs", inputs.len());
        inputs
            .par_iter()
            .enumerate()
            .map(|(index, input)| {
                let result = match load(input) {
                    Ok(source) => self.extract_one(source),
                    Err(e) => Err(BatchError::Load(e)),
                };
                self.finish(index, result)
            })
            .collect()
    }

    fn extract_one(&self, source: SourceSignal) -> Result<EnfResult, BatchError> {
        let mut control = ExtractionControl::new().with_token(self.token.clone());
        if let Some(timeout) = self.timeout {
            control = control.with_timeout(timeout);
        }
        Ok(self.extractor.extract_with(source, &control)?)
    }

    fn finish(&self, index: usize, result: Result<EnfResult, BatchError>) -> BatchOutcome {
        if let Err(e) = &result {
            log::warn!("Batch item {} failed: {}", index, e);
        }
        if let Some(bar) = &self.progress {
            bar.inc(1);
        }
        BatchOutcome { index, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EnfError, PipelineStage};
    use std::f64::consts::PI;

    fn hum(secs: f64) -> SourceSignal {
        let sample_rate = 4096.0;
        let samples = (0..(sample_rate * secs) as usize)
            .map(|i| (2.0 * PI * 50.0 * i as f64 / sample_rate).sin() as f32)
            .collect();
        SourceSignal::Audio { samples, sample_rate }
    }

    #[test]
    fn test_failures_are_isolated() {
        let runner = BatchRunner::new(EnfExtractor::default());
        let outcomes = runner.run(vec![hum(10.0), hum(0.05), hum(12.0)]);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().map(|o| o.index).eq(0..3));
        assert!(outcomes[0].is_ok());
        assert!(outcomes[2].is_ok());
        match &outcomes[1].result {
            Err(BatchError::Pipeline(e)) => {
                assert_eq!(e.stage, PipelineStage::SpectrallyTracked);
                assert!(matches!(e.kind, EnfError::EmptySpectrum { .. }));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_load_errors_are_reported() {
        let runner = BatchRunner::new(EnfExtractor::default());
        let inputs = [true, false];
        let outcomes = runner.run_inputs(&inputs, |&ok| {
            if ok {
                Ok(hum(10.0))
            } else {
                Err(anyhow::anyhow!("cannot open"))
            }
        });

        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1].result, Err(BatchError::Load(_))));
    }

    #[test]
    fn test_cancelled_batch() {
        let runner = BatchRunner::new(EnfExtractor::default());
        runner.cancellation_token().cancel();
        let outcomes = runner.run(vec![hum(10.0), hum(10.0)]);
        assert!(outcomes.iter().all(|o| matches!(
            &o.result,
            Err(BatchError::Pipeline(e)) if e.kind == EnfError::Cancelled
        )));
    }
}
