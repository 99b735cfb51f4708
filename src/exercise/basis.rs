//! Regression features and polynomial basis for continuation values
//!
//! The state at an exercise date is the vector of log-levels of all assets.
//! Features are standardised over the regression sample and expanded as
//! ```text
//! [1, z_a, z_a², z_a·z_b (a < b)]
//! ```
//! For the full basis, a per-coordinate affine change of variables leaves the
//! spanned function space unchanged, so standardising only improves the
//! conditioning of the fit.

use crate::math_utils::{mean, sample_variance};
use crate::mc::paths::PathEnsemble;
use bitflags::bitflags;
use rayon::prelude::*;

/// Floor applied before taking logs
pub const MIN_LEVEL: f64 = 1e-12;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BasisTerms: u8 {
        const CONSTANT  = 1 << 0;
        const LINEAR    = 1 << 1;
        const QUADRATIC = 1 << 2;
        const CROSS     = 1 << 3;
    }
}

impl Default for BasisTerms {
    fn default() -> Self {
        BasisTerms::all()
    }
}

impl BasisTerms {
    /// Number of basis functions for `n_features` state variables
    pub fn size(&self, n_features: usize) -> usize {
        let mut m = 0;
        if self.contains(BasisTerms::CONSTANT) {
            m += 1;
        }
        if self.contains(BasisTerms::LINEAR) {
            m += n_features;
        }
        if self.contains(BasisTerms::QUADRATIC) {
            m += n_features;
        }
        if self.contains(BasisTerms::CROSS) {
            m += n_features * n_features.saturating_sub(1) / 2;
        }
        m
    }

    /// Write the basis row for one feature vector into `out`
    pub fn expand(&self, z: &[f64], out: &mut [f64]) {
        let mut c = 0;
        if self.contains(BasisTerms::CONSTANT) {
            out[c] = 1.0;
            c += 1;
        }
        if self.contains(BasisTerms::LINEAR) {
            for &x in z {
                out[c] = x;
                c += 1;
            }
        }
        if self.contains(BasisTerms::QUADRATIC) {
            for &x in z {
                out[c] = x * x;
                c += 1;
            }
        }
        if self.contains(BasisTerms::CROSS) {
            for i in 0..z.len() {
                for j in (i + 1)..z.len() {
                    out[c] = z[i] * z[j];
                    c += 1;
                }
            }
        }
        debug_assert_eq!(c, out.len());
    }
}

/// Standardised log-level features of the sampled paths at `time_index`
///
/// Returned row-major, one row of `asset_count` values per entry of `sample`.
pub fn standardized_log_features(
    paths: &PathEnsemble,
    time_index: usize,
    sample: &[usize],
) -> Vec<f64> {
    let d = paths.asset_count();
    let mut features = vec![0.0; sample.len() * d];
    features
        .par_chunks_mut(d)
        .zip(sample.par_iter())
        .for_each(|(row, &p)| {
            for (a, x) in row.iter_mut().enumerate() {
                *x = paths.level(p, time_index, a).max(MIN_LEVEL).ln();
            }
        });

    for a in 0..d {
        let column: Vec<f64> = features.iter().skip(a).step_by(d).copied().collect();
        let centre = mean(&column);
        let sd = sample_variance(&column).sqrt();
        // a constant column stays constant; the pseudo-inverse absorbs it
        let scale = if sd > 1e-12 { sd } else { 1.0 };
        for x in features.iter_mut().skip(a).step_by(d) {
            *x = (*x - centre) / scale;
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mc::paths::TimeGrid;
    use ndarray::Array3;

    #[test]
    fn test_basis_sizes() {
        let full = BasisTerms::default();
        assert_eq!(full.size(1), 3);
        assert_eq!(full.size(2), 6);
        assert_eq!(full.size(3), 10);
        assert_eq!((BasisTerms::CONSTANT | BasisTerms::LINEAR).size(3), 4);
        assert_eq!(BasisTerms::empty().size(2), 0);
    }

    #[test]
    fn test_expand_two_features() {
        let mut row = vec![0.0; 6];
        BasisTerms::default().expand(&[2.0, 3.0], &mut row);
        assert_eq!(row, vec![1.0, 2.0, 3.0, 4.0, 9.0, 6.0]);

        let mut row = vec![0.0; 2];
        (BasisTerms::QUADRATIC).expand(&[2.0, 3.0], &mut row);
        assert_eq!(row, vec![4.0, 9.0]);
    }

    #[test]
    fn test_features_are_standardized_logs() {
        let grid = TimeGrid::uniform(1.0, 1).expect("valid grid");
        let mut levels = Array3::from_elem((4, 2, 2), 100.0);
        for (p, s) in [50.0, 100.0, 200.0, 0.0].iter().enumerate() {
            levels[[p, 1, 0]] = *s;
        }
        let paths = PathEnsemble::new(levels, grid).expect("valid ensemble");

        let f = standardized_log_features(&paths, 1, &[0, 1, 2]);
        assert_eq!(f.len(), 6);
        // ln 50, ln 100, ln 200 are equally spaced: standardised to -1, 0, 1
        assert!((f[0] + 1.0).abs() < 1e-12);
        assert!(f[2].abs() < 1e-12);
        assert!((f[4] - 1.0).abs() < 1e-12);
        // the constant second asset is centred but not scaled
        assert!(f[1].abs() < 1e-12 && f[5].abs() < 1e-12);

        // a zero level is floored rather than producing -inf
        let f = standardized_log_features(&paths, 1, &[3, 1]);
        assert!(f.iter().all(|x| x.is_finite()));
    }
}
