//! Digital Signal Processing utilities

pub mod fft;
pub mod filters;
pub mod stats;
pub mod windows;

pub use fft::{SpectralFrame, Stft};
pub use filters::{design_bandpass, filtfilt_in_place, FilterCache, FilterCoefficients, FilterSpec};
pub use windows::{create_window, window_response, WindowType};
