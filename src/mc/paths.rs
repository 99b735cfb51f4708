// src/mc/paths.rs
//! Time grids and simulated path ensembles
//!
//! A `PathEnsemble` is a dense `(path, time_step, asset)` tensor together with
//! the grid it was generated on. Shapes are checked once at construction so
//! payoffs and the exercise engine can index without re-validating.

use crate::error::{validation::*, PricingError, PricingResult};
use ndarray::{Array3, ArrayView1, Axis};

/// Strictly increasing simulation times starting at 0
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    pub fn new(times: Vec<f64>) -> PricingResult<Self> {
        if times.len() < 2 {
            return Err(PricingError::InvalidConfiguration {
                field: "time_grid".to_string(),
                reason: "needs at least two points".to_string(),
            });
        }
        for (i, &t) in times.iter().enumerate() {
            validate_finite(&format!("time_grid[{}]", i), t)?;
        }
        if times[0] != 0.0 {
            return Err(PricingError::InvalidConfiguration {
                field: "time_grid".to_string(),
                reason: format!("must start at 0, starts at {}", times[0]),
            });
        }
        if let Some(w) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(PricingError::InvalidConfiguration {
                field: "time_grid".to_string(),
                reason: format!("must be strictly increasing ({} then {})", w[0], w[1]),
            });
        }
        Ok(TimeGrid { times })
    }

    /// `steps + 1` equally spaced points on `[0, maturity]`
    pub fn uniform(maturity: f64, steps: usize) -> PricingResult<Self> {
        validate_positive("maturity", maturity)?;
        validate_steps(steps)?;
        let times = (0..=steps)
            .map(|i| maturity * (i as f64 / steps as f64))
            .collect();
        Self::new(times)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false: a grid has at least two points
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn steps(&self) -> usize {
        self.times.len() - 1
    }

    pub fn maturity(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn time(&self, index: usize) -> f64 {
        self.times[index]
    }

    /// Index of the grid point closest to `t` (ties resolve to the earlier point)
    pub fn nearest_index(&self, t: f64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, &g) in self.times.iter().enumerate() {
            let d = (g - t).abs();
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        best
    }
}

/// Simulated asset levels indexed by `(path, time_step, asset)`
#[derive(Debug, Clone)]
pub struct PathEnsemble {
    levels: Array3<f64>,
    grid: TimeGrid,
}

impl PathEnsemble {
    pub fn new(levels: Array3<f64>, grid: TimeGrid) -> PricingResult<Self> {
        let (paths, steps, assets) = levels.dim();
        if steps != grid.len() {
            return Err(PricingError::ShapeMismatch {
                what: "path ensemble time axis".to_string(),
                expected: grid.len().to_string(),
                actual: steps.to_string(),
            });
        }
        if paths == 0 || assets == 0 {
            return Err(PricingError::ShapeMismatch {
                what: "path ensemble".to_string(),
                expected: "at least one path and one asset".to_string(),
                actual: format!("{} paths x {} assets", paths, assets),
            });
        }
        Ok(PathEnsemble { levels, grid })
    }

    pub fn levels(&self) -> &Array3<f64> {
        &self.levels
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn path_count(&self) -> usize {
        self.levels.len_of(Axis(0))
    }

    pub fn time_count(&self) -> usize {
        self.levels.len_of(Axis(1))
    }

    pub fn asset_count(&self) -> usize {
        self.levels.len_of(Axis(2))
    }

    #[inline]
    pub fn level(&self, path: usize, time_index: usize, asset: usize) -> f64 {
        self.levels[[path, time_index, asset]]
    }

    /// Levels of one asset along one path
    pub fn asset_path(&self, path: usize, asset: usize) -> ArrayView1<'_, f64> {
        self.levels.index_axis(Axis(0), path).index_axis_move(Axis(1), asset)
    }

    /// Levels of all assets on one path at one time index
    pub fn state(&self, path: usize, time_index: usize) -> ArrayView1<'_, f64> {
        self.levels
            .index_axis(Axis(0), path)
            .index_axis_move(Axis(0), time_index)
    }

    /// Terminal level of `asset` on `path`
    #[inline]
    pub fn terminal(&self, path: usize, asset: usize) -> f64 {
        self.levels[[path, self.time_count() - 1, asset]]
    }
}
