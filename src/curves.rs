// src/curves.rs
//! Continuously-compounded, piecewise-flat discount curve
//!
//! # Segments
//!
//! Knot times `T_0 < T_1 < ... < T_{n-1}` (with `T_0 > 0`) carry one rate
//! each. Segment `i` covers `(T_{i-1}, T_i]`; the first segment also covers
//! everything before `T_0` and the last one extends to infinity:
//! ```text
//! r(t) = r_0        t ≤ T_0
//!      = r_i        T_{i-1} < t ≤ T_i
//!      = r_{n-1}    t > T_{n-2}
//! ```
//!
//! # Discounting
//!
//! Because each segment is flat, the integral of the short rate is an exact
//! sum of per-segment contributions:
//! ```text
//! ∫_{t0}^{t1} r(s) ds = Σ_i r_i · |(lo_i, hi_i] ∩ [t0, t1]|
//! P(t0, t1) = exp(-∫_{t0}^{t1} r(s) ds)
//! ```
//! No quadrature is involved anywhere.

use crate::error::{validation::*, PricingError, PricingResult};

/// Immutable piecewise-flat term structure of continuously-compounded rates
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountCurve {
    times: Vec<f64>,
    rates: Vec<f64>,
}

impl DiscountCurve {
    /// Build a curve from knot times and one rate per segment
    ///
    /// # Errors
    ///
    /// `InvalidCurve` when the curve is empty, the lengths differ, the first
    /// knot is not positive or the knots are not strictly increasing.
    pub fn new(times: Vec<f64>, rates: Vec<f64>) -> PricingResult<Self> {
        if times.is_empty() {
            return Err(PricingError::InvalidCurve {
                reason: "at least one knot is required".to_string(),
            });
        }
        if times.len() != rates.len() {
            return Err(PricingError::InvalidCurve {
                reason: format!(
                    "{} knot times but {} rates",
                    times.len(),
                    rates.len()
                ),
            });
        }
        for (i, (&t, &r)) in times.iter().zip(&rates).enumerate() {
            validate_finite(&format!("times[{}]", i), t)?;
            validate_finite(&format!("rates[{}]", i), r)?;
        }
        if times[0] <= 0.0 {
            return Err(PricingError::InvalidCurve {
                reason: format!("first knot must be > 0, got {}", times[0]),
            });
        }
        if let Some(w) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(PricingError::InvalidCurve {
                reason: format!("knots must be strictly increasing ({} then {})", w[0], w[1]),
            });
        }

        Ok(DiscountCurve { times, rates })
    }

    /// Single-segment curve with a constant rate
    pub fn flat(rate: f64) -> PricingResult<Self> {
        Self::new(vec![1.0], vec![rate])
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Rate of the segment containing `t`
    pub fn rate(&self, t: f64) -> f64 {
        let idx = self.times.partition_point(|&knot| knot < t);
        self.rates[idx.min(self.rates.len() - 1)]
    }

    /// Exact integral of the rate function over `[t0, t1]`; zero if `t1 ≤ t0`
    pub fn integral(&self, t0: f64, t1: f64) -> f64 {
        if t1 <= t0 {
            return 0.0;
        }
        let last = self.rates.len() - 1;
        self.rates
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                let lo = if i == 0 { f64::NEG_INFINITY } else { self.times[i - 1] };
                let hi = if i == last { f64::INFINITY } else { self.times[i] };
                let overlap = (hi.min(t1) - lo.max(t0)).max(0.0);
                r * overlap
            })
            .sum()
    }

    /// Discount factor from `t1` back to `t0`
    pub fn discount_factor(&self, t0: f64, t1: f64) -> f64 {
        (-self.integral(t0, t1)).exp()
    }
}
