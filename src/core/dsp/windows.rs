//! Window function implementations

use num_complex::Complex64;
use std::f64::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
    BlackmanHarris,
}

impl WindowType {
    /// Cosine-sum coefficients: `w[n] = sum_m a[m] cos(2 pi m n / N)`
    pub fn cosine_coefficients(&self) -> &'static [f64] {
        match self {
            WindowType::Hann => &[0.5, -0.5],
            WindowType::Hamming => &[0.54, -0.46],
            WindowType::BlackmanHarris => &[0.35875, -0.48829, 0.14128, -0.01168],
        }
    }
}

/// Create a periodic (DFT-even) window.
///
/// Periodic windows are what the phase-advance frequency refinement assumes;
/// the symmetric variants would bias it slightly.
pub fn create_window(size: usize, window_type: WindowType) -> Vec<f64> {
    let coeffs = window_type.cosine_coefficients();
    let n = size as f64;
    (0..size)
        .map(|i| {
            let x = 2.0 * PI * i as f64 / n;
            coeffs
                .iter()
                .enumerate()
                .map(|(m, a)| a * (m as f64 * x).cos())
                .sum::<f64>()
        })
        .collect()
}

/// DTFT of the periodic window at `x` bins: `sum_n w[n] exp(-2 pi i x n / N)`.
///
/// Closed form over the cosine-sum terms, so it costs O(terms) rather than
/// O(N). Used to separate a tone from its negative-frequency image.
pub fn window_response(size: usize, window_type: WindowType, x: f64) -> Complex64 {
    let coeffs = window_type.cosine_coefficients();
    let mut total = Complex64::new(0.0, 0.0);
    for (m, &a) in coeffs.iter().enumerate() {
        if m == 0 {
            total += a * dirichlet(size, x);
        } else {
            let m = m as f64;
            total += 0.5 * a * (dirichlet(size, x - m) + dirichlet(size, x + m));
        }
    }
    total
}

/// `sum_{n<N} exp(-2 pi i x n / N)`
fn dirichlet(size: usize, x: f64) -> Complex64 {
    let n = size as f64;
    let denominator = (PI * x / n).sin();
    if denominator.abs() < 1e-12 {
        return Complex64::new(n, 0.0);
    }
    let magnitude = (PI * x).sin() / denominator;
    Complex64::from_polar(1.0, -PI * x * (n - 1.0) / n) * magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = create_window(4, WindowType::Hann);
        assert!((window[0]).abs() < 1e-12); // ~0 at the leading edge
        assert!((window[2] - 1.0).abs() < 1e-12); // 1 at the centre
        assert!((window[1] - window[3]).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_hann_sums_to_half() {
        let window = create_window(1024, WindowType::Hann);
        let sum: f64 = window.iter().sum();
        assert!((sum - 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_response_matches_direct_sum() {
        for window_type in [WindowType::Hann, WindowType::Hamming, WindowType::BlackmanHarris] {
            let size = 64;
            let window = create_window(size, window_type);
            for &x in &[0.0, 0.3, 1.0, 1.16, -2.16, 5.5, 63.7] {
                let direct: Complex64 = window
                    .iter()
                    .enumerate()
                    .map(|(n, &w)| w * Complex64::from_polar(1.0, -2.0 * PI * x * n as f64 / size as f64))
                    .sum();
                let closed = window_response(size, window_type, x);
                assert!((direct - closed).norm() < 1e-9, "{:?} at {}: {} vs {}", window_type, x, direct, closed);
            }
        }
    }
}
