use std::fmt;
use std::sync::Arc;

/// Time-dependent model parameter (dividend yield or volatility)
#[derive(Clone)]
pub enum TermFunction {
    Constant(f64),
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl TermFunction {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        TermFunction::Custom(Arc::new(f))
    }

    #[inline]
    pub fn value(&self, t: f64) -> f64 {
        match self {
            TermFunction::Constant(v) => *v,
            TermFunction::Custom(f) => f(t),
        }
    }
}

impl From<f64> for TermFunction {
    fn from(v: f64) -> Self {
        TermFunction::Constant(v)
    }
}

impl fmt::Debug for TermFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermFunction::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            TermFunction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
