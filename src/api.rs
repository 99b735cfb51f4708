//! Function-style entry points
//!
//! Thin wrappers over the engine types for callers that route priced
//! products from the outside. Each call is independent; models are borrowed,
//! never mutated.

use crate::curves::DiscountCurve;
use crate::error::PricingResult;
use crate::exercise::lsmc::LsmcConfig;
use crate::exercise::spec::ExerciseSpec;
use crate::mc::mc_engine::{ControlVariate, McConfig, MonteCarloEngine};
use crate::mc::paths::{PathEnsemble, TimeGrid};
use crate::mc::payoffs::{ImmediatePayoff, PayoffEvaluator};
use crate::models::gbm::CorrelatedLognormalModel;
use crate::models::model::PathModel;
use crate::models::term_function::TermFunction;
use nalgebra::DMatrix;

/// Piecewise-constant short-rate curve from knots
pub fn build_curve(knot_times: &[f64], knot_rates: &[f64]) -> PricingResult<DiscountCurve> {
    DiscountCurve::new(knot_times.to_vec(), knot_rates.to_vec())
}

/// Correlated lognormal model; `None` correlation means independent assets
pub fn build_model(
    curve: DiscountCurve,
    yield_fns: Vec<TermFunction>,
    vol_fns: Vec<TermFunction>,
    correlation: Option<DMatrix<f64>>,
) -> PricingResult<CorrelatedLognormalModel> {
    CorrelatedLognormalModel::new(curve, yield_fns, vol_fns, correlation)
}

pub fn simulate<M: PathModel + ?Sized>(
    model: &M,
    initial_levels: &[f64],
    grid: &TimeGrid,
    path_count: usize,
    antithetic: bool,
    seed: u64,
) -> PricingResult<PathEnsemble> {
    model.simulate_paths(initial_levels, grid, path_count, antithetic, seed)
}

/// Simulate and price a European payoff; returns `(price, standard_error)`
pub fn price_european<M, P>(
    payoff: &P,
    model: &M,
    initial_levels: &[f64],
    grid: &TimeGrid,
    cfg: &McConfig,
    control: Option<ControlVariate<'_>>,
) -> PricingResult<(f64, f64)>
where
    M: PathModel + ?Sized,
    P: PayoffEvaluator + ?Sized,
{
    MonteCarloEngine::new(model).price(payoff, initial_levels, grid, cfg, control)
}

/// Price a European payoff on an ensemble the caller already simulated
pub fn price_european_paths<M, P>(
    payoff: &P,
    model: &M,
    paths: &PathEnsemble,
    control: Option<ControlVariate<'_>>,
) -> PricingResult<(f64, f64)>
where
    M: PathModel + ?Sized,
    P: PayoffEvaluator + ?Sized,
{
    MonteCarloEngine::new(model).price_paths(payoff, paths, control)
}

/// Simulate and price an American/Bermudan right by LSMC
pub fn price_exercisable<M, P>(
    spec: &ExerciseSpec<P>,
    model: &M,
    initial_levels: &[f64],
    grid: &TimeGrid,
    cfg: &McConfig,
    lsmc: &LsmcConfig,
) -> PricingResult<(f64, f64)>
where
    M: PathModel + ?Sized,
    P: ImmediatePayoff,
{
    MonteCarloEngine::new(model).price_exercisable(spec, initial_levels, grid, cfg, lsmc)
}
