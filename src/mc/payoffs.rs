//! Option Payoff Functions
//!
//! # Capabilities
//!
//! The engines only see two narrow interfaces:
//! - [`PayoffEvaluator`]: path ensemble → one cash amount per path, paid at
//!   the final grid time
//! - [`ImmediatePayoff`]: path ensemble + time index → non-negative exercise
//!   value per path
//!
//! Closures with the matching signature implement both, and the closed enums
//! [`Payoff`] and [`ExercisePayoff`] cover the standard contracts so nothing
//! downstream dispatches on strings.
//!
//! ## European Options
//! - **Call**: max(S_T - K, 0)
//! - **Put**: max(K - S_T, 0)
//! - **Digitals**: cash or asset delivered when S_T finishes beyond K
//!
//! ## Path-Dependent Options
//! - **Asian**: arithmetic average over a window of grid points
//! - **Barrier**: knocked in/out if the monitored path touches the barrier
//!
//! ## Multi-Asset Options
//! - **Basket**: weighted sum of terminal levels
//! - **Exchange**: max(S_i - S_j, 0)

use crate::error::{validation::*, PricingError, PricingResult};
use crate::mc::paths::PathEnsemble;
use rayon::prelude::*;

/// Terminal cashflow of a European (single payment) contract
pub trait PayoffEvaluator: Sync {
    fn evaluate(&self, paths: &PathEnsemble) -> Vec<f64>;

    /// Check the payoff against the ensemble shape before evaluation
    fn validate(&self, _paths: &PathEnsemble) -> PricingResult<()> {
        Ok(())
    }
}

impl<F> PayoffEvaluator for F
where
    F: Fn(&PathEnsemble) -> Vec<f64> + Sync,
{
    fn evaluate(&self, paths: &PathEnsemble) -> Vec<f64> {
        self(paths)
    }
}

/// Value of exercising at `time_index`
///
/// Implementations should return non-negative amounts; the exercise engine
/// floors them at zero regardless.
pub trait ImmediatePayoff: Sync {
    fn evaluate(&self, paths: &PathEnsemble, time_index: usize) -> Vec<f64>;

    fn validate(&self, _paths: &PathEnsemble) -> PricingResult<()> {
        Ok(())
    }
}

impl<F> ImmediatePayoff for F
where
    F: Fn(&PathEnsemble, usize) -> Vec<f64> + Sync,
{
    fn evaluate(&self, paths: &PathEnsemble, time_index: usize) -> Vec<f64> {
        self(paths, time_index)
    }
}

/// Enumeration of supported European payoff types
#[derive(Debug, Clone, PartialEq)]
pub enum Payoff {
    /// max(S_T - K, 0)
    EuropeanCall { asset: usize, k: f64 },

    /// max(K - S_T, 0)
    EuropeanPut { asset: usize, k: f64 },

    /// max(Avg(S_t) - K, 0) over grid indices `start..end` (`end = None` runs
    /// to the last point)
    AsianArithmeticCall {
        asset: usize,
        k: f64,
        start: usize,
        end: Option<usize>,
    },

    /// max(S_T - K, 0) if max(S_t) < H, else 0
    UpAndOutCall { asset: usize, k: f64, barrier: f64 },

    /// max(S_T - K, 0) if max(S_t) ≥ H, else 0
    UpAndInCall { asset: usize, k: f64, barrier: f64 },

    /// max(Σ w_a S_T^a - K, 0) over assets `0..weights.len()`
    BasketCall { weights: Vec<f64>, k: f64 },

    /// `cash` if S_T > K
    CashOrNothingCall { asset: usize, k: f64, cash: f64 },

    /// `cash` if S_T < K
    CashOrNothingPut { asset: usize, k: f64, cash: f64 },

    /// S_T if S_T > K
    AssetOrNothingCall { asset: usize, k: f64 },

    /// S_T if S_T < K
    AssetOrNothingPut { asset: usize, k: f64 },

    /// max(S_long - S_short, 0)
    ExchangeCall { long: usize, short: usize },
}

impl Payoff {
    /// Asian call averaging every point after t = 0
    pub fn asian_call(asset: usize, k: f64) -> Self {
        Payoff::AsianArithmeticCall {
            asset,
            k,
            start: 1,
            end: None,
        }
    }

    fn assets(&self) -> Vec<usize> {
        match self {
            Payoff::EuropeanCall { asset, .. }
            | Payoff::EuropeanPut { asset, .. }
            | Payoff::AsianArithmeticCall { asset, .. }
            | Payoff::UpAndOutCall { asset, .. }
            | Payoff::UpAndInCall { asset, .. }
            | Payoff::CashOrNothingCall { asset, .. }
            | Payoff::CashOrNothingPut { asset, .. }
            | Payoff::AssetOrNothingCall { asset, .. }
            | Payoff::AssetOrNothingPut { asset, .. } => vec![*asset],
            Payoff::BasketCall { weights, .. } => (0..weights.len()).collect(),
            Payoff::ExchangeCall { long, short } => vec![*long, *short],
        }
    }

    /// Payoff of a single path
    pub fn path_value(&self, paths: &PathEnsemble, p: usize) -> f64 {
        match self {
            Payoff::EuropeanCall { asset, k } => (paths.terminal(p, *asset) - k).max(0.0),

            Payoff::EuropeanPut { asset, k } => (k - paths.terminal(p, *asset)).max(0.0),

            Payoff::AsianArithmeticCall {
                asset,
                k,
                start,
                end,
            } => {
                let end = end.unwrap_or(paths.time_count());
                let window = (*start..end).map(|i| paths.level(p, i, *asset));
                let average = window.sum::<f64>() / (end - start) as f64;
                (average - k).max(0.0)
            }

            Payoff::UpAndOutCall { asset, k, barrier } => {
                // knocked out if the path touches or exceeds the barrier
                if paths.asset_path(p, *asset).iter().any(|&s| s >= *barrier) {
                    0.0
                } else {
                    (paths.terminal(p, *asset) - k).max(0.0)
                }
            }

            Payoff::UpAndInCall { asset, k, barrier } => {
                if paths.asset_path(p, *asset).iter().any(|&s| s >= *barrier) {
                    (paths.terminal(p, *asset) - k).max(0.0)
                } else {
                    0.0
                }
            }

            Payoff::BasketCall { weights, k } => {
                let basket: f64 = weights
                    .iter()
                    .enumerate()
                    .map(|(a, w)| w * paths.terminal(p, a))
                    .sum();
                (basket - k).max(0.0)
            }

            Payoff::CashOrNothingCall { asset, k, cash } => {
                if paths.terminal(p, *asset) > *k {
                    *cash
                } else {
                    0.0
                }
            }

            Payoff::CashOrNothingPut { asset, k, cash } => {
                if paths.terminal(p, *asset) < *k {
                    *cash
                } else {
                    0.0
                }
            }

            Payoff::AssetOrNothingCall { asset, k } => {
                let s = paths.terminal(p, *asset);
                if s > *k {
                    s
                } else {
                    0.0
                }
            }

            Payoff::AssetOrNothingPut { asset, k } => {
                let s = paths.terminal(p, *asset);
                if s < *k {
                    s
                } else {
                    0.0
                }
            }

            Payoff::ExchangeCall { long, short } => {
                (paths.terminal(p, *long) - paths.terminal(p, *short)).max(0.0)
            }
        }
    }
}

impl PayoffEvaluator for Payoff {
    fn evaluate(&self, paths: &PathEnsemble) -> Vec<f64> {
        (0..paths.path_count())
            .into_par_iter()
            .map(|p| self.path_value(paths, p))
            .collect()
    }

    fn validate(&self, paths: &PathEnsemble) -> PricingResult<()> {
        validate_assets(&self.assets(), paths.asset_count())?;
        match self {
            Payoff::EuropeanCall { k, .. }
            | Payoff::EuropeanPut { k, .. }
            | Payoff::AssetOrNothingCall { k, .. }
            | Payoff::AssetOrNothingPut { k, .. } => validate_finite("k", *k),
            Payoff::CashOrNothingCall { k, cash, .. } | Payoff::CashOrNothingPut { k, cash, .. } => {
                validate_finite("k", *k)?;
                validate_finite("cash", *cash)
            }
            Payoff::UpAndOutCall { k, barrier, .. } | Payoff::UpAndInCall { k, barrier, .. } => {
                validate_finite("k", *k)?;
                validate_positive("barrier", *barrier)
            }
            Payoff::AsianArithmeticCall { k, start, end, .. } => {
                validate_finite("k", *k)?;
                let end = end.unwrap_or(paths.time_count());
                if *start >= end || end > paths.time_count() {
                    return Err(PricingError::InvalidConfiguration {
                        field: "averaging window".to_string(),
                        reason: format!(
                            "{}..{} is empty or exceeds {} grid points",
                            start,
                            end,
                            paths.time_count()
                        ),
                    });
                }
                Ok(())
            }
            Payoff::BasketCall { weights, k } => {
                validate_finite("k", *k)?;
                if weights.is_empty() {
                    return Err(PricingError::InvalidConfiguration {
                        field: "weights".to_string(),
                        reason: "basket needs at least one weight".to_string(),
                    });
                }
                for w in weights {
                    validate_finite("weight", *w)?;
                }
                Ok(())
            }
            Payoff::ExchangeCall { .. } => Ok(()),
        }
    }
}

/// Exercise value of American/Bermudan rights
#[derive(Debug, Clone, PartialEq)]
pub enum ExercisePayoff {
    /// max(S_t - K, 0)
    Call { asset: usize, k: f64 },

    /// max(K - S_t, 0)
    Put { asset: usize, k: f64 },

    /// max(Σ w_a S_t^a - K, 0)
    BasketCall { weights: Vec<f64>, k: f64 },

    /// max(K - Σ w_a S_t^a, 0)
    BasketPut { weights: Vec<f64>, k: f64 },
}

impl ExercisePayoff {
    /// Early-exercise counterpart of a European payoff
    ///
    /// Returns `None` for contracts whose value is not a function of the
    /// current state alone (Asian, barrier, digital, exchange).
    pub fn from_payoff(payoff: &Payoff) -> Option<Self> {
        match payoff {
            Payoff::EuropeanCall { asset, k } => Some(ExercisePayoff::Call {
                asset: *asset,
                k: *k,
            }),
            Payoff::EuropeanPut { asset, k } => Some(ExercisePayoff::Put {
                asset: *asset,
                k: *k,
            }),
            Payoff::BasketCall { weights, k } => Some(ExercisePayoff::BasketCall {
                weights: weights.clone(),
                k: *k,
            }),
            _ => None,
        }
    }

    pub fn path_value(&self, paths: &PathEnsemble, p: usize, time_index: usize) -> f64 {
        let basket = |weights: &[f64]| -> f64 {
            weights
                .iter()
                .enumerate()
                .map(|(a, w)| w * paths.level(p, time_index, a))
                .sum()
        };
        match self {
            ExercisePayoff::Call { asset, k } => (paths.level(p, time_index, *asset) - k).max(0.0),
            ExercisePayoff::Put { asset, k } => (k - paths.level(p, time_index, *asset)).max(0.0),
            ExercisePayoff::BasketCall { weights, k } => (basket(weights) - k).max(0.0),
            ExercisePayoff::BasketPut { weights, k } => (k - basket(weights)).max(0.0),
        }
    }
}

impl ImmediatePayoff for ExercisePayoff {
    fn evaluate(&self, paths: &PathEnsemble, time_index: usize) -> Vec<f64> {
        (0..paths.path_count())
            .into_par_iter()
            .map(|p| self.path_value(paths, p, time_index))
            .collect()
    }

    fn validate(&self, paths: &PathEnsemble) -> PricingResult<()> {
        let (assets, k): (Vec<usize>, f64) = match self {
            ExercisePayoff::Call { asset, k } | ExercisePayoff::Put { asset, k } => {
                (vec![*asset], *k)
            }
            ExercisePayoff::BasketCall { weights, k } | ExercisePayoff::BasketPut { weights, k } => {
                if weights.is_empty() {
                    return Err(PricingError::InvalidConfiguration {
                        field: "weights".to_string(),
                        reason: "basket needs at least one weight".to_string(),
                    });
                }
                ((0..weights.len()).collect(), *k)
            }
        };
        validate_assets(&assets, paths.asset_count())?;
        validate_finite("k", k)
    }
}

fn validate_assets(assets: &[usize], asset_count: usize) -> PricingResult<()> {
    match assets.iter().find(|&&a| a >= asset_count) {
        Some(&a) => Err(PricingError::InvalidConfiguration {
            field: "asset".to_string(),
            reason: format!("index {} out of range for {} simulated assets", a, asset_count),
        }),
        None => Ok(()),
    }
}
