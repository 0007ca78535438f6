//! Statistical helpers and robust 1-D smoothing kernels

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by N)
pub fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let var = data.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

/// Compute median of a slice (reorders it)
pub fn median(data: &mut [f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = data.len() / 2;
    if data.len() % 2 == 0 {
        (data[mid - 1] + data[mid]) / 2.0
    } else {
        data[mid]
    }
}

/// Running median with an odd kernel.
///
/// Positions outside the data take the value of the nearest sample, so a
/// constant series passes through unchanged. Zero padding (as in `medfilt`)
/// would pull the end points of an ENF track toward 0 Hz.
pub fn median_filter(data: &[f64], window: usize) -> Vec<f64> {
    if data.is_empty() || window <= 1 {
        return data.to_vec();
    }

    let half = (window / 2) as isize;
    let last = data.len() as isize - 1;
    let mut scratch = vec![0.0; window];

    (0..data.len() as isize)
        .map(|i| {
            for (slot, offset) in scratch.iter_mut().zip(-half..=half) {
                *slot = data[(i + offset).clamp(0, last) as usize];
            }
            median(&mut scratch)
        })
        .collect()
}

/// Least-squares polynomial weights for one output point.
///
/// Returns `w` such that `sum(w[j] * y[j])` is the value at `eval_at` of the
/// degree-`degree` polynomial fitted to `y[0..window]`, with positions
/// `x_j = j - window / 2`.
pub fn savgol_weights(window: usize, degree: usize, eval_at: f64) -> Vec<f64> {
    let half = (window / 2) as f64;
    let terms = degree + 1;
    let xs: Vec<f64> = (0..window).map(|j| j as f64 - half).collect();

    // Normal equations G c = e(eval_at), G = A^T A
    let mut gram = vec![vec![0.0; terms]; terms];
    for &x in &xs {
        for (p, row) in gram.iter_mut().enumerate() {
            for (q, cell) in row.iter_mut().enumerate() {
                *cell += x.powi((p + q) as i32);
            }
        }
    }
    let rhs: Vec<f64> = (0..terms).map(|p| eval_at.powi(p as i32)).collect();
    let coeffs = solve_small(gram, rhs);

    xs.iter()
        .map(|&x| coeffs.iter().enumerate().map(|(p, c)| c * x.powi(p as i32)).sum())
        .collect()
}

/// Savitzky-Golay smoothing.
///
/// Interior points use the centred window. The first and last `window / 2`
/// points are evaluated from the polynomial fitted to the first and last full
/// window respectively. Requires an odd `window <= data.len()`.
pub fn savgol_filter(data: &[f64], window: usize, degree: usize) -> Vec<f64> {
    let n = data.len();
    if window <= 1 || n < window {
        return data.to_vec();
    }

    let half = window / 2;
    let centre = savgol_weights(window, degree, 0.0);
    let mut out = vec![0.0; n];

    for i in half..n - half {
        out[i] = dot(&centre, &data[i - half..=i + half]);
    }

    let head = &data[..window];
    let tail = &data[n - window..];
    for k in 0..half {
        let offset = k as f64 - half as f64;
        out[k] = dot(&savgol_weights(window, degree, offset), head);
        out[n - 1 - k] = dot(&savgol_weights(window, degree, -offset), tail);
    }

    out
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gaussian elimination with partial pivoting for tiny dense systems
fn solve_small(mut m: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Vec<f64> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| {
                m[a][col]
                    .abs()
                    .partial_cmp(&m[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        let diag = m[col][col];
        if diag.abs() < f64::EPSILON {
            continue;
        }
        for row in col + 1..n {
            let factor = m[row][col] / diag;
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let diag = m[row][row];
        if diag.abs() < f64::EPSILON {
            continue;
        }
        let tail: f64 = (row + 1..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (rhs[row] - tail) / diag;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&data) - 5.0).abs() < 1e-12);
        assert!((population_std(&data) - 2.0).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_median_filter_removes_spike() {
        let data = [50.0, 50.0, 58.0, 50.0, 50.0];
        let out = median_filter(&data, 3);
        assert_eq!(out, vec![50.0; 5]);
    }

    #[test]
    fn test_median_filter_replicates_edges() {
        let data = [1.0, 5.0, 2.0, 8.0];
        // edge windows: [1,1,5] and [2,8,8]
        let out = median_filter(&data, 3);
        assert_eq!(out, vec![1.0, 2.0, 5.0, 8.0]);
    }

    #[test]
    fn test_median_filter_keeps_track_ends() {
        let track = [50.02, 49.98, 50.01, 50.0, 49.99, 50.03];
        let out = median_filter(&track, 5);
        assert!(out.iter().all(|f| (f - 50.0).abs() < 0.05), "{:?}", out);
        assert_eq!(out[0], 50.02);
        assert_eq!(out[5], 50.03);
    }

    #[test]
    fn test_savgol_centre_weights() {
        let w = savgol_weights(5, 2, 0.0);
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0];
        for (a, e) in w.iter().zip(expected.iter()) {
            assert!((a - e / 35.0).abs() < 1e-12, "{:?}", w);
        }
    }

    #[test]
    fn test_savgol_preserves_quadratic() {
        let data: Vec<f64> = (0..12).map(|i| 0.5 * (i * i) as f64 - 3.0 * i as f64 + 1.0).collect();
        let out = savgol_filter(&data, 5, 2);
        for (a, b) in out.iter().zip(&data) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_savgol_window_one_is_identity() {
        let data = vec![1.0, 3.0, 2.0];
        assert_eq!(savgol_filter(&data, 1, 0), data);
    }
}
