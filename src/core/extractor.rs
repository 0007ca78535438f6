// src/core/extractor.rs
//
// ENF extraction pipeline. One call walks the stages
//   Loaded -> Filtered -> SpectrallyTracked -> Resampled -> Smoothed -> Summarized -> Done
// and either publishes a complete EnfResult or fails with the stage it could
// not produce. Cancellation and deadlines are only honoured between stages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::analysis::{resample, smooth, summarize, SpectralPeakTracker};
use super::dsp::{filtfilt_in_place, FilterCache};
use super::signal::{RawSignal, SourceSignal};
use crate::config::ExtractionConfig;
use crate::error::{EnfError, PipelineError, PipelineStage};
use crate::result::{Diagnostic, Diagnostics, EnfResult, ExtractionInfo, ProcessingNotes};

/// Shared flag for aborting extractions from another thread
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Optional cancellation token and deadline for one extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractionControl {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl ExtractionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline measured from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn check(&self) -> Result<(), EnfError> {
        if self.token.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(EnfError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(EnfError::DeadlineExceeded);
        }
        Ok(())
    }
}

/// Tracks the current state of one run
struct StageTracker<'a> {
    /// Last state reached
    stage: PipelineStage,
    control: &'a ExtractionControl,
}

impl<'a> StageTracker<'a> {
    fn new(control: &'a ExtractionControl) -> Self {
        Self { stage: PipelineStage::Loaded, control }
    }

    /// Checkpoint before leaving the current state
    fn checkpoint(&self) -> Result<(), PipelineError> {
        self.control.check().map_err(|kind| self.fail(kind))
    }

    /// Failure while producing the next state
    fn fail(&self, kind: EnfError) -> PipelineError {
        let failed = self.stage.next();
        log::debug!("Extraction failed at '{}': {}", failed, kind);
        PipelineError::new(failed, kind)
    }

    fn advance(&mut self) {
        let next = self.stage.next();
        log::debug!("Pipeline transition: {} -> {}", self.stage, next);
        self.stage = next;
    }
}

/// ENF extractor: stateless between calls apart from the shared filter cache
#[derive(Debug, Clone)]
pub struct EnfExtractor {
    config: ExtractionConfig,
    filters: Arc<FilterCache>,
}

impl Default for EnfExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl EnfExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            filters: Arc::new(FilterCache::new()),
        }
    }

    /// Share designed filters with other extractors
    pub fn with_filter_cache(mut self, filters: Arc<FilterCache>) -> Self {
        self.filters = filters;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn filter_cache(&self) -> &Arc<FilterCache> {
        &self.filters
    }

    pub fn extract(&self, source: SourceSignal) -> Result<EnfResult, PipelineError> {
        self.extract_with(source, &ExtractionControl::default())
    }

    pub fn extract_with(
        &self,
        source: SourceSignal,
        control: &ExtractionControl,
    ) -> Result<EnfResult, PipelineError> {
        self.extract_raw(source.into_raw(), control)
    }

    /// Run the full pipeline over an already reduced signal
    pub fn extract_raw(
        &self,
        signal: RawSignal,
        control: &ExtractionControl,
    ) -> Result<EnfResult, PipelineError> {
        let config = &self.config;
        let mut run = StageTracker::new(control);
        let mut diagnostics = Diagnostics::new();
        let sample_rate = signal.sample_rate();
        let source = signal.source();

        log::debug!(
            "Loaded {} signal: {} samples at {} Hz ({:.1} s)",
            source,
            signal.len(),
            sample_rate,
            signal.duration_secs()
        );

        config
            .validate()
            .map_err(|e| PipelineError::new(PipelineStage::Loaded, e))?;

        run.checkpoint()?;
        let coeffs = self
            .filters
            .get_or_design(&config.filter_spec(), sample_rate)
            .map_err(|e| run.fail(e))?;

        let mut samples = signal.into_samples();
        let clamped = filtfilt_in_place(&coeffs, &mut samples);
        if clamped > 0 {
            diagnostics.push(Diagnostic::NonFiniteClamped { count: clamped });
        }
        run.advance();

        run.checkpoint()?;
        let tracker = SpectralPeakTracker::new(config.tracker_config());
        let track = tracker
            .track(&samples, sample_rate, config.band(), &mut diagnostics)
            .map_err(|e| run.fail(e))?;
        drop(samples);
        log::debug!("Tracked {} frames", track.len());
        run.advance();

        run.checkpoint()?;
        let resampled = resample(&track, config.target_rate).map_err(|e| run.fail(e))?;
        if resampled.clamped_confidences > 0 {
            diagnostics.push(Diagnostic::ConfidenceClamped { count: resampled.clamped_confidences });
        }
        run.advance();

        run.checkpoint()?;
        let smoothed = smooth(&resampled.track, config.smoothing_window).map_err(|e| run.fail(e))?;
        run.advance();

        run.checkpoint()?;
        if smoothed.is_empty() {
            return Err(run.fail(EnfError::EmptyTrack));
        }
        let statistics = summarize(&smoothed.frequencies, config.target_frequency);
        run.advance();

        let result = EnfResult::new(
            ExtractionInfo::new(config, sample_rate, source),
            smoothed,
            statistics,
            ProcessingNotes::new(config),
            diagnostics,
        );
        run.advance();

        log::info!(
            "Extracted {} ENF points: mean {:.4} Hz, std {:.4} Hz, {} diagnostic(s)",
            result.len(),
            statistics.mean,
            statistics.std,
            result.diagnostics().len()
        );

        Ok(result)
    }
}
