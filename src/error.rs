// src/error.rs
use thiserror::Error;

/// Error types for the fast-lsmc library
///
/// Only configuration problems are errors. Numerical degeneracy (an
/// under-determined regression, a control with zero variance) is handled
/// locally by the engines and statistical noise is reported as a standard
/// error, never as a failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// Invalid parameter values
    #[error("Invalid parameter '{parameter}' = {value}: {constraint}")]
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// Malformed discount curve knots or rates
    #[error("Invalid discount curve: {reason}")]
    InvalidCurve { reason: String },

    /// Correlation matrix failed the Cholesky factorisation even after jitter
    #[error("Correlation matrix of dimension {dimension} is not positive semi-definite")]
    NotPositiveSemiDefinite { dimension: usize },

    /// Array or vector with the wrong shape
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    /// An exercisable product was configured without exercise dates
    #[error("Exercise schedule is empty")]
    EmptyExerciseSchedule,

    /// Numerical instability or non-finite result
    #[error("Numerical instability in {method}: {reason}")]
    NumericalInstability { method: String, reason: String },
}

/// Result type alias for fast-lsmc operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Validation utilities
pub mod validation {
    use super::{PricingError, PricingResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> PricingResult<()> {
        if value <= 0.0 || value.is_nan() {
            Err(PricingError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> PricingResult<()> {
        if value < 0.0 || value.is_nan() {
            Err(PricingError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is within a range
    pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> PricingResult<()> {
        if !(min..=max).contains(&value) {
            Err(PricingError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: format!("must be in range [{}, {}]", min, max),
            })
        } else {
            Ok(())
        }
    }

    /// Validate correlation parameter
    pub fn validate_correlation(name: &str, rho: f64) -> PricingResult<()> {
        validate_range(name, rho, -1.0, 1.0)
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> PricingResult<()> {
        if !value.is_finite() {
            Err(PricingError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate paths count
    pub fn validate_paths(paths: usize) -> PricingResult<()> {
        if paths < 2 {
            Err(PricingError::InvalidConfiguration {
                field: "paths".to_string(),
                reason: "need at least 2 paths for a standard error".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate steps count
    pub fn validate_steps(steps: usize) -> PricingResult<()> {
        if steps == 0 {
            Err(PricingError::InvalidConfiguration {
                field: "steps".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
