use crate::error::PricingResult;
use crate::mc::paths::{PathEnsemble, TimeGrid};

/// A risk-neutral model that can generate joint asset paths and discount
/// cashflows on its own curve
pub trait PathModel: Sync {
    fn dimension(&self) -> usize;

    fn discount_factor(&self, t0: f64, t1: f64) -> f64;

    fn simulate_paths(
        &self,
        initial_levels: &[f64],
        grid: &TimeGrid,
        path_count: usize,
        antithetic: bool,
        seed: u64,
    ) -> PricingResult<PathEnsemble>;
}

impl<M: PathModel + ?Sized> PathModel for &M {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn discount_factor(&self, t0: f64, t1: f64) -> f64 {
        (**self).discount_factor(t0, t1)
    }

    fn simulate_paths(
        &self,
        initial_levels: &[f64],
        grid: &TimeGrid,
        path_count: usize,
        antithetic: bool,
        seed: u64,
    ) -> PricingResult<PathEnsemble> {
        (**self).simulate_paths(initial_levels, grid, path_count, antithetic, seed)
    }
}
