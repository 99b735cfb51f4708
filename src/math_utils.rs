use rayon::prelude::*;
use statrs::function::erf;
use std::f64::consts::SQRT_2;

/// Number of elements folded per parallel chunk.
///
/// Partial results are collected in chunk order and combined sequentially, so
/// every reduction below is bit-identical for any rayon thread count.
pub const REDUCTION_CHUNK: usize = 4096;

pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf::erf(x / SQRT_2))
}

/// Deterministic parallel sum
pub fn chunked_sum(values: &[f64]) -> f64 {
    values
        .par_chunks(REDUCTION_CHUNK)
        .map(|chunk| chunk.iter().sum::<f64>())
        .collect::<Vec<f64>>()
        .into_iter()
        .sum()
}

/// Sample mean; zero for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    chunked_sum(values) / values.len() as f64
}

/// Unbiased sample covariance (ddof = 1) of two equally long samples
pub fn sample_covariance(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let sum = x[..n]
        .par_chunks(REDUCTION_CHUNK)
        .zip(y[..n].par_chunks(REDUCTION_CHUNK))
        .map(|(cx, cy)| {
            cx.iter()
                .zip(cy)
                .map(|(a, b)| (a - mx) * (b - my))
                .sum::<f64>()
        })
        .collect::<Vec<f64>>()
        .into_iter()
        .sum::<f64>();
    sum / (n as f64 - 1.0)
}

/// Unbiased sample variance (ddof = 1)
pub fn sample_variance(values: &[f64]) -> f64 {
    sample_covariance(values, values)
}

/// `(mean, std(ddof=1) / sqrt(n))`
pub fn mean_and_std_error(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    let m = mean(values);
    if n < 2 {
        return (m, 0.0);
    }
    (m, (sample_variance(values) / n as f64).sqrt())
}

pub struct Timer {
    start_time: std::time::Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            start_time: std::time::Instant::now(),
        }
    }

    pub fn start(&mut self) {
        self.start_time = std::time::Instant::now();
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }
}
