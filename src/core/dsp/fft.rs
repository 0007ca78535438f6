//! Short-time Fourier transform with windowing

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::windows::{create_window, WindowType};

/// One analysis frame of the STFT
#[derive(Debug, Clone)]
pub struct SpectralFrame {
    /// Frame centre in seconds from the start of the signal
    pub time_secs: f64,
    /// Magnitude-squared spectrum, bins 0..=N/2
    pub power: Vec<f64>,
    /// Phase per bin in radians
    pub phase: Vec<f64>,
}

impl SpectralFrame {
    pub fn total_power(&self) -> f64 {
        self.power.iter().sum()
    }
}

/// Lazily evaluated STFT over a borrowed signal.
///
/// Frames cover `[m * hop, m * hop + window)` with no padding of any kind, so a
/// signal shorter than one window yields no frames at all. Frames are produced
/// one at a time; nothing but the current buffer is held.
pub struct Stft<'a> {
    samples: &'a [f32],
    sample_rate: f64,
    window: Vec<f64>,
    hop_size: usize,
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    next_frame: usize,
    num_frames: usize,
}

impl<'a> Stft<'a> {
    pub fn new(
        samples: &'a [f32],
        sample_rate: f64,
        fft_size: usize,
        hop_size: usize,
        window_type: WindowType,
    ) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let num_frames = if hop_size == 0 || samples.len() < fft_size || fft_size == 0 {
            0
        } else {
            (samples.len() - fft_size) / hop_size + 1
        };

        Self {
            samples,
            sample_rate,
            window: create_window(fft_size, window_type),
            hop_size,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
            next_frame: 0,
            num_frames,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Bins 0..=N/2
    pub fn num_bins(&self) -> usize {
        self.fft_size() / 2 + 1
    }

    pub fn bin_hz(&self) -> f64 {
        self.sample_rate / self.fft_size() as f64
    }

    /// Centre time of frame `index` in seconds
    pub fn frame_time(&self, index: usize) -> f64 {
        (index * self.hop_size) as f64 / self.sample_rate + self.fft_size() as f64 / (2.0 * self.sample_rate)
    }
}

impl Iterator for Stft<'_> {
    type Item = SpectralFrame;

    fn next(&mut self) -> Option<SpectralFrame> {
        if self.next_frame >= self.num_frames {
            return None;
        }

        let index = self.next_frame;
        self.next_frame += 1;

        let start = index * self.hop_size;
        let frame = &self.samples[start..start + self.fft_size()];
        for ((slot, &s), &w) in self.buffer.iter_mut().zip(frame).zip(&self.window) {
            *slot = Complex::new(s as f64 * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let bins = &self.buffer[..self.num_bins()];
        Some(SpectralFrame {
            time_secs: self.frame_time(index),
            power: bins.iter().map(|c| c.norm_sqr()).collect(),
            phase: bins.iter().map(|c| c.arg()).collect(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_frames - self.next_frame;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Stft<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_frame_count_and_times() {
        let samples = vec![0.0f32; 4096];
        let stft = Stft::new(&samples, 1024.0, 1024, 512, WindowType::Hann);
        assert_eq!(stft.num_frames(), 7);
        assert_eq!(stft.num_bins(), 513);
        assert!((stft.frame_time(0) - 0.5).abs() < 1e-12);
        assert!((stft.frame_time(1) - 1.0).abs() < 1e-12);
        assert_eq!(stft.count(), 7);
    }

    #[test]
    fn test_short_signal_has_no_frames() {
        let samples = vec![0.1f32; 1023];
        let mut stft = Stft::new(&samples, 44100.0, 1024, 512, WindowType::Hann);
        assert_eq!(stft.len(), 0);
        assert!(stft.next().is_none());
    }

    #[test]
    fn test_tone_peak_bin() {
        let sample_rate = 1024.0;
        // 100 Hz falls exactly on bin 100 with 1 Hz bins
        let samples: Vec<f32> = (0..2048)
            .map(|i| (2.0 * PI * 100.0 * i as f64 / sample_rate).sin() as f32)
            .collect();
        let mut stft = Stft::new(&samples, sample_rate, 1024, 512, WindowType::Hann);
        let frame = stft.next().unwrap();
        let peak = frame
            .power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 100);
        assert_eq!(frame.phase.len(), frame.power.len());
    }
}
