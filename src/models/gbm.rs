// src/models/gbm.rs
//! Correlated multi-asset lognormal model (risk-neutral GBM)
//!
//! # Dynamics
//!
//! Each asset `a` follows
//! ```text
//! dS_a / S_a = (r(t) - q_a(t)) dt + σ_a(t) dW_a,     d⟨W_a, W_b⟩ = ρ_ab dt
//! ```
//! with `r` read from the discount curve and `q_a`, `σ_a` supplied as term
//! functions.
//!
//! # Discretisation
//!
//! Every grid interval `[t_k, t_{k+1}]` uses the exact lognormal step with
//! parameters frozen at the interval midpoint `t_m = (t_k + t_{k+1}) / 2`:
//! ```text
//! S_{k+1} = S_k * exp((r - q - σ²/2) Δt + σ √Δt · dW)
//! dW = L · Z,   L Lᵀ = ρ + 1e-12 · I
//! ```
//! where `Z` are independent standard normals. Antithetic rows replay the
//! draws of their partner row with the sign flipped.

use super::model::PathModel;
use super::term_function::TermFunction;
use crate::curves::DiscountCurve;
use crate::error::{validation::*, PricingError, PricingResult};
use crate::mc::paths::{PathEnsemble, TimeGrid};
use crate::rng::RngFactory;
use nalgebra::DMatrix;
use ndarray::Array3;
use rayon::prelude::*;

/// Diagonal jitter added before the Cholesky factorisation
pub const CHOLESKY_JITTER: f64 = 1e-12;

const CORRELATION_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct CorrelatedLognormalModel {
    curve: DiscountCurve,
    dividend_yields: Vec<TermFunction>,
    volatilities: Vec<TermFunction>,
    correlation: DMatrix<f64>,
    /// Lower Cholesky factor, row-major `dim × dim`
    cholesky: Vec<f64>,
}

impl CorrelatedLognormalModel {
    /// Build the model
    ///
    /// The dimension is the largest of the yield count, the volatility count
    /// and the correlation size. A single yield or volatility is broadcast to
    /// every asset; any other count mismatch is an error. A missing
    /// correlation matrix means independent assets.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` for inconsistent counts or a non-square matrix
    /// - `InvalidParameters` for a non-finite constant yield or volatility,
    ///   or a negative constant volatility (time-dependent functions are
    ///   checked when simulating)
    /// - `InvalidParameters` for entries outside `[-1, 1]`, a non-unit
    ///   diagonal or an asymmetric matrix
    /// - `NotPositiveSemiDefinite` when the jittered matrix has no Cholesky
    ///   factor
    pub fn new(
        curve: DiscountCurve,
        dividend_yields: Vec<TermFunction>,
        volatilities: Vec<TermFunction>,
        correlation: Option<DMatrix<f64>>,
    ) -> PricingResult<Self> {
        if dividend_yields.is_empty() || volatilities.is_empty() {
            return Err(PricingError::InvalidConfiguration {
                field: "model".to_string(),
                reason: "at least one dividend yield and one volatility are required"
                    .to_string(),
            });
        }

        let corr_dim = correlation.as_ref().map_or(0, |c| c.nrows());
        let dim = dividend_yields.len().max(volatilities.len()).max(corr_dim);

        let dividend_yields = broadcast("dividend_yields", dividend_yields, dim)?;
        let volatilities = broadcast("volatilities", volatilities, dim)?;
        validate_constant_parameters(&dividend_yields, &volatilities)?;

        let correlation = correlation.unwrap_or_else(|| DMatrix::identity(dim, dim));
        validate_correlation_matrix(&correlation, dim)?;

        let jittered = &correlation + DMatrix::<f64>::identity(dim, dim) * CHOLESKY_JITTER;
        let factor = jittered
            .cholesky()
            .ok_or(PricingError::NotPositiveSemiDefinite { dimension: dim })?
            .l();
        let mut cholesky = vec![0.0; dim * dim];
        for a in 0..dim {
            for b in 0..=a {
                cholesky[a * dim + b] = factor[(a, b)];
            }
        }

        Ok(CorrelatedLognormalModel {
            curve,
            dividend_yields,
            volatilities,
            correlation,
            cholesky,
        })
    }

    /// Single-asset model with constant yield and volatility
    pub fn single_asset(
        curve: DiscountCurve,
        dividend_yield: f64,
        volatility: f64,
    ) -> PricingResult<Self> {
        Self::new(curve, vec![dividend_yield.into()], vec![volatility.into()], None)
    }

    pub fn curve(&self) -> &DiscountCurve {
        &self.curve
    }

    pub fn correlation(&self) -> &DMatrix<f64> {
        &self.correlation
    }

    pub fn dividend_yield(&self, asset: usize, t: f64) -> f64 {
        self.dividend_yields[asset].value(t)
    }

    pub fn volatility(&self, asset: usize, t: f64) -> f64 {
        self.volatilities[asset].value(t)
    }

    /// Per-step `(drift, vol)` pairs, laid out `step * dim + asset`
    fn step_coefficients(&self, grid: &TimeGrid) -> PricingResult<(Vec<f64>, Vec<f64>)> {
        let dim = self.dimension();
        let steps = grid.steps();
        let mut drift = Vec::with_capacity(steps * dim);
        let mut vol = Vec::with_capacity(steps * dim);

        for w in grid.times().windows(2) {
            let dt = w[1] - w[0];
            let t_mid = 0.5 * (w[0] + w[1]);
            let r = self.curve.rate(t_mid);
            for a in 0..dim {
                let q = self.dividend_yields[a].value(t_mid);
                let sigma = self.volatilities[a].value(t_mid);
                validate_finite(&format!("dividend_yield[{}]({})", a, t_mid), q)?;
                validate_finite(&format!("volatility[{}]({})", a, t_mid), sigma)?;
                validate_non_negative(&format!("volatility[{}]({})", a, t_mid), sigma)?;
                drift.push((r - q - 0.5 * sigma * sigma) * dt);
                vol.push(sigma * dt.sqrt());
            }
        }
        Ok((drift, vol))
    }
}

impl PathModel for CorrelatedLognormalModel {
    fn dimension(&self) -> usize {
        self.volatilities.len()
    }

    fn discount_factor(&self, t0: f64, t1: f64) -> f64 {
        self.curve.discount_factor(t0, t1)
    }

    /// Simulate `path_count` joint paths on `grid`
    ///
    /// With `antithetic`, rows `0..ceil(n/2)` are drawn and rows
    /// `ceil(n/2)..n` are their negations, so every pair shares one draw.
    /// Row `i` always draws from stream `i` of the seed, which makes the
    /// result independent of the rayon thread count.
    fn simulate_paths(
        &self,
        initial_levels: &[f64],
        grid: &TimeGrid,
        path_count: usize,
        antithetic: bool,
        seed: u64,
    ) -> PricingResult<PathEnsemble> {
        let dim = self.dimension();
        if initial_levels.len() != dim {
            return Err(PricingError::ShapeMismatch {
                what: "initial_levels".to_string(),
                expected: dim.to_string(),
                actual: initial_levels.len().to_string(),
            });
        }
        for (a, &s0) in initial_levels.iter().enumerate() {
            validate_finite(&format!("initial_levels[{}]", a), s0)?;
            validate_positive(&format!("initial_levels[{}]", a), s0)?;
        }
        if path_count == 0 {
            return Err(PricingError::InvalidConfiguration {
                field: "path_count".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let steps = grid.steps();
        let (drift, vol) = self.step_coefficients(grid)?;
        let n_eff = if antithetic {
            (path_count + 1) / 2
        } else {
            path_count
        };
        let factory = RngFactory::new(seed);
        let chol = &self.cholesky;
        let row_len = (steps + 1) * dim;

        let mut data = vec![0.0; path_count * row_len];
        data.par_chunks_mut(row_len).enumerate().for_each_init(
            || vec![0.0; steps * dim],
            |z, (p, row)| {
                let (base, sign) = if p < n_eff {
                    (p, 1.0)
                } else {
                    (p - n_eff, -1.0)
                };
                factory.fill_row_normals(base as u64, z);

                row[..dim].copy_from_slice(initial_levels);
                for k in 0..steps {
                    let zk = &z[k * dim..(k + 1) * dim];
                    for a in 0..dim {
                        let mut dw = 0.0;
                        for b in 0..=a {
                            dw += zk[b] * chol[a * dim + b];
                        }
                        dw *= sign;
                        let c = k * dim + a;
                        row[(k + 1) * dim + a] = row[k * dim + a] * (drift[c] + vol[c] * dw).exp();
                    }
                }
            },
        );

        let levels = Array3::from_shape_vec((path_count, steps + 1, dim), data).map_err(|e| {
            PricingError::ShapeMismatch {
                what: "simulated paths".to_string(),
                expected: format!("({}, {}, {})", path_count, steps + 1, dim),
                actual: e.to_string(),
            }
        })?;

        tracing::debug!(
            paths = path_count,
            steps,
            assets = dim,
            antithetic,
            seed,
            "simulated correlated lognormal paths"
        );

        PathEnsemble::new(levels, grid.clone())
    }
}

fn broadcast(name: &str, funcs: Vec<TermFunction>, dim: usize) -> PricingResult<Vec<TermFunction>> {
    match funcs.len() {
        n if n == dim => Ok(funcs),
        1 => Ok(vec![funcs[0].clone(); dim]),
        n => Err(PricingError::ShapeMismatch {
            what: name.to_string(),
            expected: format!("1 or {}", dim),
            actual: n.to_string(),
        }),
    }
}

fn validate_constant_parameters(
    dividend_yields: &[TermFunction],
    volatilities: &[TermFunction],
) -> PricingResult<()> {
    for (a, q) in dividend_yields.iter().enumerate() {
        if let TermFunction::Constant(v) = q {
            validate_finite(&format!("dividend_yield[{}]", a), *v)?;
        }
    }
    for (a, sigma) in volatilities.iter().enumerate() {
        if let TermFunction::Constant(v) = sigma {
            let name = format!("volatility[{}]", a);
            validate_finite(&name, *v)?;
            validate_non_negative(&name, *v)?;
        }
    }
    Ok(())
}

fn validate_correlation_matrix(corr: &DMatrix<f64>, dim: usize) -> PricingResult<()> {
    if corr.nrows() != dim || corr.ncols() != dim {
        return Err(PricingError::ShapeMismatch {
            what: "correlation".to_string(),
            expected: format!("{}x{}", dim, dim),
            actual: format!("{}x{}", corr.nrows(), corr.ncols()),
        });
    }
    for i in 0..dim {
        for j in 0..dim {
            let name = format!("correlation[{}][{}]", i, j);
            validate_correlation(&name, corr[(i, j)])?;
            if i == j && (corr[(i, j)] - 1.0).abs() > CORRELATION_TOLERANCE {
                return Err(PricingError::InvalidParameters {
                    parameter: name,
                    value: corr[(i, j)],
                    constraint: "diagonal must be 1".to_string(),
                });
            }
            if (corr[(i, j)] - corr[(j, i)]).abs() > CORRELATION_TOLERANCE {
                return Err(PricingError::InvalidParameters {
                    parameter: name,
                    value: corr[(i, j)],
                    constraint: "matrix must be symmetric".to_string(),
                });
            }
        }
    }
    Ok(())
}
