// src/analytics/bs_analytic.rs
//! Closed-form Black-Scholes prices with a continuous dividend yield
//!
//! Under the lognormal model with flat rate `r`, yield `q` and volatility σ:
//! ```text
//! d₁ = [ln(S/K) + (r - q + σ²/2)T] / (σ√T)
//! d₂ = d₁ - σ√T
//! C = S e^(-qT) Φ(d₁) - K e^(-rT) Φ(d₂)
//! P = K e^(-rT) Φ(-d₂) - S e^(-qT) Φ(-d₁)
//! ```
//!
//! Used as reference values and as control-variate expectations.

use crate::math_utils::norm_cdf;

fn d1_d2(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> (f64, f64) {
    let vol_sqrt_t = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

/// Intrinsic value of the forward when there is no optionality left
fn degenerate(s: f64, k: f64, r: f64, q: f64, t: f64, call: bool) -> Option<f64> {
    if t > 0.0 && s > 0.0 && k > 0.0 {
        return None;
    }
    let forward = s * (-q * t).exp() - k * (-r * t).exp();
    Some(if call { forward.max(0.0) } else { (-forward).max(0.0) })
}

/// European call price
///
/// # Parameters
/// - `s`: spot
/// - `k`: strike
/// - `r`: continuously compounded rate
/// - `q`: continuous dividend yield
/// - `sigma`: volatility
/// - `t`: time to expiry
pub fn bs_call_price(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> f64 {
    if let Some(v) = degenerate(s, k, r, q, t, true) {
        return v;
    }
    if sigma <= 0.0 {
        return (s * (-q * t).exp() - k * (-r * t).exp()).max(0.0);
    }
    let (d1, d2) = d1_d2(s, k, r, q, sigma, t);
    s * (-q * t).exp() * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2)
}

/// European put price
pub fn bs_put_price(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> f64 {
    if let Some(v) = degenerate(s, k, r, q, t, false) {
        return v;
    }
    if sigma <= 0.0 {
        return (k * (-r * t).exp() - s * (-q * t).exp()).max(0.0);
    }
    let (d1, d2) = d1_d2(s, k, r, q, sigma, t);
    k * (-r * t).exp() * norm_cdf(-d2) - s * (-q * t).exp() * norm_cdf(-d1)
}
