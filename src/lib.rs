//! # fast-lsmc: Monte Carlo pricing with curve discounting and LSMC exercise
//!
//! Simulation-based valuation of European, path-dependent and early-exercise
//! contracts on correlated lognormal assets.
//!
//! ## Key Features
//!
//! - **Exact Discounting**: piecewise-constant short-rate curves with closed-form integrals
//! - **Correlated Assets**: exact lognormal steps with time-dependent yields and volatilities
//! - **Variance Reduction**: antithetic variates and control variates
//! - **Early Exercise**: Longstaff-Schwartz regression for American and Bermudan rights
//! - **Reproducible**: seeded per-path streams, identical results on any thread count
//!
//! ## Quick Start
//!
//! ```rust
//! use fast_lsmc::curves::DiscountCurve;
//! use fast_lsmc::mc::mc_engine::{McConfig, MonteCarloEngine};
//! use fast_lsmc::mc::paths::TimeGrid;
//! use fast_lsmc::mc::payoffs::Payoff;
//! use fast_lsmc::models::gbm::CorrelatedLognormalModel;
//!
//! let curve = DiscountCurve::flat(0.05).expect("valid curve");
//! let model = CorrelatedLognormalModel::single_asset(curve, 0.0, 0.2).expect("valid model");
//! let engine = MonteCarloEngine::new(model);
//!
//! let grid = TimeGrid::uniform(1.0, 64).expect("valid grid");
//! let cfg = McConfig {
//!     paths: 20_000,
//!     seed: 42,
//!     ..Default::default()
//! };
//! let call = Payoff::EuropeanCall { asset: 0, k: 100.0 };
//!
//! let (price, std_error) = engine
//!     .price(&call, &[100.0], &grid, &cfg, None)
//!     .expect("valid configuration");
//! println!("Call price: {:.4} ± {:.4}", price, std_error);
//! ```
//!
//! ## Mathematical Foundation
//!
//! Prices are discounted risk-neutral expectations estimated by averaging
//! over simulated paths. Early-exercise rights are valued by backward
//! induction, regressing discounted future cashflows on the current state to
//! decide when exercising beats continuing.

pub mod error;
pub mod rng;
pub mod math_utils;
pub mod curves;
pub mod models;
pub mod mc;
pub mod exercise;
pub mod analytics;
pub mod api;

pub use api::{
    build_curve, build_model, price_european, price_european_paths, price_exercisable, simulate,
};
pub use error::{PricingError, PricingResult};
