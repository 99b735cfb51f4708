// src/mc/mc_engine.rs
use crate::error::{validation::*, PricingError, PricingResult};
use crate::exercise::lsmc::{ExerciseEngine, LsmcConfig};
use crate::exercise::spec::ExerciseSpec;
use crate::math_utils::{chunked_sum, mean_and_std_error, sample_covariance, sample_variance};
use crate::mc::paths::{PathEnsemble, TimeGrid};
use crate::mc::payoffs::{ImmediatePayoff, PayoffEvaluator};
use crate::models::model::PathModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McConfig {
    pub paths: usize,
    pub antithetic: bool,
    pub seed: u64,
}

impl McConfig {
    /// Validate the Monte Carlo configuration
    pub fn validate(&self) -> PricingResult<()> {
        validate_paths(self.paths)
    }
}

impl Default for McConfig {
    fn default() -> Self {
        McConfig {
            paths: 100_000,
            antithetic: true,
            seed: 12345,
        }
    }
}

/// Companion payoff with a known present value
///
/// `expected` is the discounted expectation of `payoff`, i.e. what the
/// engine's discounted control samples average to under the model.
#[derive(Clone, Copy)]
pub struct ControlVariate<'a> {
    pub payoff: &'a dyn PayoffEvaluator,
    pub expected: f64,
}

impl<'a> ControlVariate<'a> {
    pub fn new(payoff: &'a dyn PayoffEvaluator, expected: f64) -> Self {
        ControlVariate { payoff, expected }
    }
}

/// Monte Carlo pricing on a path model
///
/// # Estimator
///
/// Every payoff is a single cashflow at the last grid time `T`:
/// ```text
/// X_i = P(0, T) · payoff(path_i)
/// price = mean(X),   SE = std(X, ddof=1) / √n
/// ```
///
/// # Control Variates
///
/// With a control `Y_i = P(0, T) · control(path_i)` of known mean `μ_Y`:
/// ```text
/// β = Cov(X, Y) / Var(Y)
/// X_i ← X_i - β (Y_i - μ_Y)
/// ```
/// applied only when `Var(Y) > 0` beyond the rounding of `mean(Y²)`, so
/// rescaling the control leaves the estimate unchanged.
pub struct MonteCarloEngine<M: PathModel> {
    model: M,
}

impl<M: PathModel> MonteCarloEngine<M> {
    pub fn new(model: M) -> Self {
        MonteCarloEngine { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Simulate paths and price a European payoff
    ///
    /// # Returns
    ///
    /// `(price, standard_error)`
    ///
    /// # Errors
    ///
    /// Configuration errors from the config, the model or the payoff, and
    /// `NumericalInstability` if the estimate is not finite.
    pub fn price<P: PayoffEvaluator + ?Sized>(
        &self,
        payoff: &P,
        initial_levels: &[f64],
        grid: &TimeGrid,
        cfg: &McConfig,
        control: Option<ControlVariate<'_>>,
    ) -> PricingResult<(f64, f64)> {
        cfg.validate()?;
        let paths =
            self.model
                .simulate_paths(initial_levels, grid, cfg.paths, cfg.antithetic, cfg.seed)?;
        self.price_paths(payoff, &paths, control)
    }

    /// Price a European payoff on an existing ensemble
    pub fn price_paths<P: PayoffEvaluator + ?Sized>(
        &self,
        payoff: &P,
        paths: &PathEnsemble,
        control: Option<ControlVariate<'_>>,
    ) -> PricingResult<(f64, f64)> {
        validate_paths(paths.path_count())?;
        let discount = self.model.discount_factor(0.0, paths.grid().maturity());

        let mut samples = discounted_samples(payoff, paths, discount, "payoff")?;

        if let Some(cv) = control {
            validate_finite("control expected value", cv.expected)?;
            let controls = discounted_samples(cv.payoff, paths, discount, "control variate")?;
            let var_y = sample_variance(&controls);
            // rounding noise of a constant control, relative to its own scale
            let mean_sq = chunked_sum(&controls.iter().map(|y| y * y).collect::<Vec<f64>>())
                / controls.len() as f64;
            if var_y > f64::EPSILON * mean_sq {
                let beta = sample_covariance(&samples, &controls) / var_y;
                for (x, y) in samples.iter_mut().zip(&controls) {
                    *x -= beta * (y - cv.expected);
                }
                tracing::debug!(beta, "applied control variate");
            } else {
                tracing::warn!("control variate has zero sample variance; adjustment skipped");
            }
        }

        let (price, std_error) = mean_and_std_error(&samples);
        check_finite("Monte Carlo", price, std_error)?;

        tracing::debug!(
            paths = paths.path_count(),
            price,
            std_error,
            "priced European payoff"
        );
        Ok((price, std_error))
    }

    /// Simulate paths and price an American/Bermudan right by LSMC
    pub fn price_exercisable<P: ImmediatePayoff>(
        &self,
        spec: &ExerciseSpec<P>,
        initial_levels: &[f64],
        grid: &TimeGrid,
        cfg: &McConfig,
        lsmc: &LsmcConfig,
    ) -> PricingResult<(f64, f64)> {
        cfg.validate()?;
        let paths =
            self.model
                .simulate_paths(initial_levels, grid, cfg.paths, cfg.antithetic, cfg.seed)?;
        let report = ExerciseEngine::new(&self.model, lsmc).run(spec, &paths)?;
        Ok((report.price, report.std_error))
    }
}

fn discounted_samples<P: PayoffEvaluator + ?Sized>(
    payoff: &P,
    paths: &PathEnsemble,
    discount: f64,
    what: &str,
) -> PricingResult<Vec<f64>> {
    payoff.validate(paths)?;
    let mut values = payoff.evaluate(paths);
    if values.len() != paths.path_count() {
        return Err(PricingError::ShapeMismatch {
            what: what.to_string(),
            expected: paths.path_count().to_string(),
            actual: values.len().to_string(),
        });
    }
    for v in values.iter_mut() {
        *v *= discount;
    }
    Ok(values)
}

pub(crate) fn check_finite(method: &str, price: f64, std_error: f64) -> PricingResult<()> {
    if !price.is_finite() {
        return Err(PricingError::NumericalInstability {
            method: method.to_string(),
            reason: format!("Price estimate is not finite: {}", price),
        });
    }
    if !std_error.is_finite() {
        return Err(PricingError::NumericalInstability {
            method: method.to_string(),
            reason: format!("Standard error is not finite: {}", std_error),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::DiscountCurve;
    use crate::mc::payoffs::Payoff;
    use crate::models::gbm::CorrelatedLognormalModel;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    fn engine() -> MonteCarloEngine<CorrelatedLognormalModel> {
        let curve = DiscountCurve::flat(0.05).expect("valid curve");
        MonteCarloEngine::new(
            CorrelatedLognormalModel::single_asset(curve, 0.0, 0.2).expect("valid model"),
        )
    }

    #[test]
    fn test_price_paths_discounts_at_maturity() {
        let grid = TimeGrid::uniform(2.0, 1).expect("valid grid");
        let mut levels = Array3::zeros((4, 2, 1));
        for (p, s) in [90.0, 100.0, 110.0, 130.0].iter().enumerate() {
            levels[[p, 0, 0]] = 100.0;
            levels[[p, 1, 0]] = *s;
        }
        let paths = PathEnsemble::new(levels, grid).expect("valid ensemble");
        let call = Payoff::EuropeanCall { asset: 0, k: 100.0 };

        let (price, se) = engine().price_paths(&call, &paths, None).expect("price");
        let df = (-0.1_f64).exp();
        // payoffs 0, 0, 10, 30
        assert_relative_eq!(price, df * 10.0, epsilon = 1e-12);
        let var = (100.0 + 100.0 + 0.0 + 400.0) / 3.0;
        assert_relative_eq!(se, df * (var / 4.0_f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_perfect_control_removes_variance() {
        let grid = TimeGrid::uniform(1.0, 8).expect("valid grid");
        let cfg = McConfig {
            paths: 2_000,
            ..Default::default()
        };
        let call = Payoff::EuropeanCall { asset: 0, k: 100.0 };
        let cv = ControlVariate::new(&call, 10.0);
        let (price, se) = engine()
            .price(&call, &[100.0], &grid, &cfg, Some(cv))
            .expect("price");
        // X - β(X - μ) with β = 1 collapses to μ
        assert_relative_eq!(price, 10.0, epsilon = 1e-9);
        assert!(se < 1e-9);
    }

    #[test]
    fn test_zero_variance_control_is_skipped() {
        let grid = TimeGrid::uniform(1.0, 8).expect("valid grid");
        let cfg = McConfig {
            paths: 2_000,
            ..Default::default()
        };
        let call = Payoff::EuropeanCall { asset: 0, k: 100.0 };
        let constant = |ens: &PathEnsemble| vec![1.0; ens.path_count()];
        let plain = engine()
            .price(&call, &[100.0], &grid, &cfg, None)
            .expect("price");
        let with_cv = engine()
            .price(&call, &[100.0], &grid, &cfg, Some(ControlVariate::new(&constant, 0.5)))
            .expect("price");
        assert_eq!(plain, with_cv);
    }

    #[test]
    fn test_control_variate_is_scale_invariant() {
        let grid = TimeGrid::uniform(1.0, 16).expect("valid grid");
        let cfg = McConfig {
            paths: 4_000,
            seed: 21,
            ..Default::default()
        };
        let asian = Payoff::asian_call(0, 100.0);
        let call = Payoff::EuropeanCall { asset: 0, k: 100.0 };
        let tiny_call = |ens: &PathEnsemble| -> Vec<f64> {
            call.evaluate(ens).into_iter().map(|v| v * 1e-9).collect()
        };
        let expected = 10.450583572185565;

        let plain = engine()
            .price(&asian, &[100.0], &grid, &cfg, None)
            .expect("price");
        let unit = engine()
            .price(&asian, &[100.0], &grid, &cfg, Some(ControlVariate::new(&call, expected)))
            .expect("price");
        let scaled = engine()
            .price(
                &asian,
                &[100.0],
                &grid,
                &cfg,
                Some(ControlVariate::new(&tiny_call, expected * 1e-9)),
            )
            .expect("price");

        assert!(unit.1 < plain.1);
        assert_relative_eq!(scaled.0, unit.0, max_relative = 1e-9);
        assert_relative_eq!(scaled.1, unit.1, max_relative = 1e-6);
    }

    #[test]
    fn test_payoff_length_mismatch_is_an_error() {
        let grid = TimeGrid::uniform(1.0, 2).expect("valid grid");
        let cfg = McConfig {
            paths: 10,
            ..Default::default()
        };
        let short = |_: &PathEnsemble| vec![1.0; 3];
        let err = engine().price(&short, &[100.0], &grid, &cfg, None);
        assert!(matches!(err, Err(PricingError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_invalid_config() {
        let grid = TimeGrid::uniform(1.0, 2).expect("valid grid");
        let cfg = McConfig {
            paths: 1,
            ..Default::default()
        };
        let call = Payoff::EuropeanCall { asset: 0, k: 100.0 };
        assert!(engine().price(&call, &[100.0], &grid, &cfg, None).is_err());
        let cfg = McConfig::default();
        assert!(engine().price(&call, &[100.0, 1.0], &grid, &cfg, None).is_err());
    }
}
