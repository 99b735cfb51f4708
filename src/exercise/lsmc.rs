// src/exercise/lsmc.rs
//! Least-Squares Monte Carlo for American and Bermudan exercise rights
//!
//! # Backward Induction
//!
//! For exercise dates `t_1 < ... < t_N` (grid indices, all after t = 0), each
//! path carries one running value `V`:
//!
//! 1. `V = max(h(t_N), 0)` at the last date
//! 2. For each earlier date `t_i` with next date `t_j`:
//!    - target `Y = P(t_i, t_j) · V` (exact curve discount factor)
//!    - immediate payoff `h = max(h(t_i), 0)`
//!    - regress `Y` on the basis of the in-the-money paths (`h > threshold`)
//!      to estimate the continuation value `C` of those paths; every other
//!      path uses `C = Y`
//!    - exercise where `h ≥ C`: `V = h` if exercised, else `V = Y`
//! 3. `V ← P(0, t_1) · V`; price = mean(V), SE = std(V, ddof=1) / √n
//!
//! Continuing paths carry the realised discounted cashflow `Y`, never the
//! regression estimate, so the fit only drives the exercise decision.
//!
//! # Degenerate Dates
//!
//! - no ITM paths: no regression, `C = Y` everywhere
//! - fewer ITM paths than basis functions: ITM paths use the ITM sample mean
//!   of `Y` as a constant continuation estimate
//!
//! # Cross-Fitting
//!
//! With `cross_fit = Some(seed)` the ITM sample of each date is shuffled by a
//! generator seeded from `(seed, time_index)` and split into halves A and B
//! (alternate positions). β is fitted on each half and every path is priced
//! with the coefficients of the other half:
//! ```text
//! C_A = X_A β_B,   C_B = X_B β_A
//! ```
//! so no path's exercise decision uses a fit that saw its own future. Both
//! halves need at least as many paths as basis functions, otherwise the date
//! falls back to the constant mean estimate.

use super::basis::{standardized_log_features, BasisTerms};
use super::spec::ExerciseSpec;
use crate::error::{validation::*, PricingError, PricingResult};
use crate::math_utils::{mean, mean_and_std_error, REDUCTION_CHUNK};
use crate::mc::mc_engine::check_finite;
use crate::mc::paths::PathEnsemble;
use crate::mc::payoffs::ImmediatePayoff;
use crate::models::model::PathModel;
use crate::rng::RngFactory;
use nalgebra::{DMatrix, DVector};
use rand::seq::SliceRandom;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LsmcConfig {
    /// Paths with immediate payoff strictly above this are in the money
    pub itm_threshold: f64,
    /// Regression basis in standardised log-levels
    pub basis: BasisTerms,
    /// Singular values below this fraction of the largest are dropped by the
    /// pseudo-inverse
    pub singular_value_tolerance: f64,
    /// Split seed for out-of-sample (cross-fitted) continuation estimates
    pub cross_fit: Option<u64>,
}

impl Default for LsmcConfig {
    fn default() -> Self {
        LsmcConfig {
            itm_threshold: 1e-12,
            basis: BasisTerms::default(),
            singular_value_tolerance: 1e-12,
            cross_fit: None,
        }
    }
}

impl LsmcConfig {
    pub fn validate(&self) -> PricingResult<()> {
        validate_finite("itm_threshold", self.itm_threshold)?;
        validate_non_negative("itm_threshold", self.itm_threshold)?;
        validate_finite("singular_value_tolerance", self.singular_value_tolerance)?;
        validate_non_negative("singular_value_tolerance", self.singular_value_tolerance)?;
        if self.basis.is_empty() {
            return Err(PricingError::InvalidConfiguration {
                field: "basis".to_string(),
                reason: "at least one basis term is required".to_string(),
            });
        }
        Ok(())
    }
}

/// How the continuation value was estimated on one exercise date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressionOutcome {
    /// Last exercise date: nothing to continue into
    Terminal,
    /// No path was in the money
    NoItmPaths,
    /// Too few ITM paths for the basis; constant mean estimate used
    UnderDetermined,
    /// Least-squares fit with this many coefficients
    Fitted { coefficients: usize },
    /// Two half-sample fits, each half priced with the other's coefficients
    CrossFitted { coefficients: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseDateReport {
    pub time_index: usize,
    pub time: f64,
    pub itm_paths: usize,
    pub exercised_paths: usize,
    pub outcome: RegressionOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LsmcReport {
    pub price: f64,
    pub std_error: f64,
    /// Per exercise date, in chronological order
    pub dates: Vec<ExerciseDateReport>,
}

pub struct ExerciseEngine<'a, M: PathModel + ?Sized> {
    model: &'a M,
    config: &'a LsmcConfig,
}

impl<'a, M: PathModel + ?Sized> ExerciseEngine<'a, M> {
    pub fn new(model: &'a M, config: &'a LsmcConfig) -> Self {
        ExerciseEngine { model, config }
    }

    /// Price the exercise right described by `spec` on `paths`
    ///
    /// # Errors
    ///
    /// Configuration errors for a bad config, schedule or payoff, and
    /// `NumericalInstability` when the pseudo-inverse or the final estimate
    /// fails.
    pub fn run<P: ImmediatePayoff>(
        &self,
        spec: &ExerciseSpec<P>,
        paths: &PathEnsemble,
    ) -> PricingResult<LsmcReport> {
        self.config.validate()?;
        validate_paths(paths.path_count())?;
        spec.validate(paths)?;

        let times = paths.grid().times();
        let indices = spec.indices();
        let threshold = self.config.itm_threshold;
        let mut dates = Vec::with_capacity(indices.len());

        let last = indices[indices.len() - 1];
        let mut value = spec.exercise_values(paths, last)?;
        let itm_last = value.iter().filter(|&&v| v > threshold).count();
        dates.push(ExerciseDateReport {
            time_index: last,
            time: times[last],
            itm_paths: itm_last,
            exercised_paths: itm_last,
            outcome: RegressionOutcome::Terminal,
        });

        for w in indices.windows(2).rev() {
            let (i, j) = (w[0], w[1]);
            let disc = self.model.discount_factor(times[i], times[j]);
            let target: Vec<f64> = value.iter().map(|v| disc * v).collect();
            let immediate = spec.exercise_values(paths, i)?;

            let itm: Vec<usize> = immediate
                .iter()
                .enumerate()
                .filter(|(_, &h)| h > threshold)
                .map(|(p, _)| p)
                .collect();

            let mut continuation = target.clone();
            let outcome = self.estimate_continuation(paths, i, &itm, &target, &mut continuation)?;

            let mut exercised = 0;
            for (p, v) in value.iter_mut().enumerate() {
                // ties favour exercise
                if immediate[p] >= continuation[p] {
                    *v = immediate[p];
                    if immediate[p] > threshold {
                        exercised += 1;
                    }
                } else {
                    *v = target[p];
                }
            }

            tracing::debug!(
                time_index = i,
                itm = itm.len(),
                exercised,
                ?outcome,
                "LSMC exercise date"
            );
            dates.push(ExerciseDateReport {
                time_index: i,
                time: times[i],
                itm_paths: itm.len(),
                exercised_paths: exercised,
                outcome,
            });
        }

        let first = indices[0];
        let to_today = self.model.discount_factor(0.0, times[first]);
        for v in value.iter_mut() {
            *v *= to_today;
        }

        let (price, std_error) = mean_and_std_error(&value);
        check_finite("LSMC", price, std_error)?;
        dates.reverse();

        tracing::debug!(
            paths = paths.path_count(),
            exercise_dates = indices.len(),
            price,
            std_error,
            "priced exercisable payoff"
        );
        Ok(LsmcReport {
            price,
            std_error,
            dates,
        })
    }

    /// Overwrite `continuation` on the ITM paths with the regression estimate
    fn estimate_continuation(
        &self,
        paths: &PathEnsemble,
        time_index: usize,
        itm: &[usize],
        target: &[f64],
        continuation: &mut [f64],
    ) -> PricingResult<RegressionOutcome> {
        if itm.is_empty() {
            return Ok(RegressionOutcome::NoItmPaths);
        }

        let m = self.config.basis.size(paths.asset_count());
        let y: Vec<f64> = itm.iter().map(|&p| target[p]).collect();

        let required = if self.config.cross_fit.is_some() { 2 * m } else { m };
        if itm.len() < required {
            let estimate = mean(&y);
            for &p in itm {
                continuation[p] = estimate;
            }
            tracing::debug!(
                time_index,
                itm = itm.len(),
                coefficients = m,
                "under-determined regression; using sample mean"
            );
            return Ok(RegressionOutcome::UnderDetermined);
        }

        let d = paths.asset_count();
        let features = standardized_log_features(paths, time_index, itm);

        let Some(seed) = self.config.cross_fit else {
            let beta = self.fit(&features, d, &y, m)?;
            let predictions = self.predict(&features, d, &beta, m);
            for (&p, c) in itm.iter().zip(predictions) {
                continuation[p] = c;
            }
            return Ok(RegressionOutcome::Fitted { coefficients: m });
        };

        let (half_a, half_b) = split_halves(itm.len(), seed, time_index);
        let (features_a, y_a) = gather(&features, &y, d, &half_a);
        let (features_b, y_b) = gather(&features, &y, d, &half_b);
        let beta_a = self.fit(&features_a, d, &y_a, m)?;
        let beta_b = self.fit(&features_b, d, &y_b, m)?;

        let predictions_a = self.predict(&features_a, d, &beta_b, m);
        let predictions_b = self.predict(&features_b, d, &beta_a, m);
        for (&k, c) in half_a.iter().zip(predictions_a) {
            continuation[itm[k]] = c;
        }
        for (&k, c) in half_b.iter().zip(predictions_b) {
            continuation[itm[k]] = c;
        }

        Ok(RegressionOutcome::CrossFitted { coefficients: m })
    }

    fn predict(&self, features: &[f64], d: usize, beta: &DVector<f64>, m: usize) -> Vec<f64> {
        let basis = self.config.basis;
        features
            .par_chunks(d)
            .map_init(
                || vec![0.0; m],
                |row, z| {
                    basis.expand(z, row);
                    row.iter().zip(beta.iter()).map(|(x, b)| x * b).sum::<f64>()
                },
            )
            .collect()
    }

    /// Least squares `β = pinv(XᵀX) Xᵀy`
    ///
    /// The Gram matrix is accumulated over fixed-size chunks of the whole
    /// sample and merged in order, so the fit sees every ITM path and does not
    /// depend on the thread count.
    fn fit(&self, features: &[f64], d: usize, y: &[f64], m: usize) -> PricingResult<DVector<f64>> {
        let basis = self.config.basis;
        let partials: Vec<(Vec<f64>, Vec<f64>)> = features
            .par_chunks(REDUCTION_CHUNK * d)
            .zip(y.par_chunks(REDUCTION_CHUNK))
            .map(|(fz, fy)| {
                let mut xtx = vec![0.0; m * m];
                let mut xty = vec![0.0; m];
                let mut row = vec![0.0; m];
                for (z, &target) in fz.chunks(d).zip(fy) {
                    basis.expand(z, &mut row);
                    for r in 0..m {
                        xty[r] += row[r] * target;
                        for c in 0..m {
                            xtx[r * m + c] += row[r] * row[c];
                        }
                    }
                }
                (xtx, xty)
            })
            .collect();

        let mut xtx = vec![0.0; m * m];
        let mut xty = vec![0.0; m];
        for (gram, rhs) in partials {
            for (acc, g) in xtx.iter_mut().zip(gram) {
                *acc += g;
            }
            for (acc, r) in xty.iter_mut().zip(rhs) {
                *acc += r;
            }
        }

        let gram = DMatrix::from_row_slice(m, m, &xtx);
        let svd = gram.svd(true, true);
        let eps = svd.singular_values.max() * self.config.singular_value_tolerance;
        let pinv = svd
            .pseudo_inverse(eps)
            .map_err(|reason| PricingError::NumericalInstability {
                method: "LSMC regression".to_string(),
                reason: reason.to_string(),
            })?;
        Ok(pinv * DVector::from_vec(xty))
    }
}

/// Shuffle `0..n` with the stream of `(seed, time_index)` and deal the
/// positions alternately into two halves
fn split_halves(n: usize, seed: u64, time_index: usize) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = RngFactory::new(seed).create_row_rng(time_index as u64);
    order.shuffle(&mut rng);
    let half_a = order.iter().step_by(2).copied().collect();
    let half_b = order.iter().skip(1).step_by(2).copied().collect();
    (half_a, half_b)
}

/// Feature rows and targets of the sample positions in `rows`
fn gather(features: &[f64], y: &[f64], d: usize, rows: &[usize]) -> (Vec<f64>, Vec<f64>) {
    let mut sub_features = Vec::with_capacity(rows.len() * d);
    let mut sub_y = Vec::with_capacity(rows.len());
    for &k in rows {
        sub_features.extend_from_slice(&features[k * d..(k + 1) * d]);
        sub_y.push(y[k]);
    }
    (sub_features, sub_y)
}
