use crate::error::{PricingError, PricingResult};
use crate::mc::paths::{PathEnsemble, TimeGrid};
use crate::mc::payoffs::ImmediatePayoff;

/// Exercise dates (as grid indices) and the value of exercising on them
#[derive(Debug, Clone)]
pub struct ExerciseSpec<P: ImmediatePayoff> {
    indices: Vec<usize>,
    payoff: P,
}

impl<P: ImmediatePayoff> ExerciseSpec<P> {
    /// # Errors
    ///
    /// `EmptyExerciseSchedule` for no dates, `InvalidConfiguration` if an
    /// index is 0 or the indices are not strictly increasing.
    pub fn new(indices: Vec<usize>, payoff: P) -> PricingResult<Self> {
        if indices.is_empty() {
            return Err(PricingError::EmptyExerciseSchedule);
        }
        if indices[0] == 0 {
            return Err(PricingError::InvalidConfiguration {
                field: "exercise_indices".to_string(),
                reason: "exercise at t = 0 is not allowed".to_string(),
            });
        }
        if let Some(w) = indices.windows(2).find(|w| w[1] <= w[0]) {
            return Err(PricingError::InvalidConfiguration {
                field: "exercise_indices".to_string(),
                reason: format!("must be strictly increasing ({} then {})", w[0], w[1]),
            });
        }
        Ok(ExerciseSpec { indices, payoff })
    }

    /// Exercise allowed on every grid point after t = 0
    pub fn american(grid: &TimeGrid, payoff: P) -> PricingResult<Self> {
        Self::new((1..grid.len()).collect(), payoff)
    }

    /// Exercise every `every` steps; the final grid point is always included
    pub fn bermudan_every(grid: &TimeGrid, every: usize, payoff: P) -> PricingResult<Self> {
        if every == 0 {
            return Err(PricingError::InvalidConfiguration {
                field: "exercise_every".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        let last = grid.steps();
        let mut indices: Vec<usize> = (every..=last).step_by(every).collect();
        if indices.last() != Some(&last) {
            indices.push(last);
        }
        Self::new(indices, payoff)
    }

    /// Exercise on the grid points nearest to `times`
    ///
    /// Times that snap to t = 0 are dropped and duplicates collapse.
    pub fn from_times(grid: &TimeGrid, times: &[f64], payoff: P) -> PricingResult<Self> {
        let mut indices: Vec<usize> = times
            .iter()
            .map(|&t| grid.nearest_index(t))
            .filter(|&i| i > 0)
            .collect();
        indices.sort_unstable();
        indices.dedup();
        Self::new(indices, payoff)
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn payoff(&self) -> &P {
        &self.payoff
    }

    /// Immediate payoff at `time_index`, floored at zero
    pub fn exercise_values(&self, paths: &PathEnsemble, time_index: usize) -> PricingResult<Vec<f64>> {
        let mut values = self.payoff.evaluate(paths, time_index);
        if values.len() != paths.path_count() {
            return Err(PricingError::ShapeMismatch {
                what: "immediate payoff".to_string(),
                expected: paths.path_count().to_string(),
                actual: values.len().to_string(),
            });
        }
        for v in values.iter_mut() {
            *v = v.max(0.0);
        }
        Ok(values)
    }

    /// Check the schedule and payoff against a simulated ensemble
    pub fn validate(&self, paths: &PathEnsemble) -> PricingResult<()> {
        let last = self.indices[self.indices.len() - 1];
        if last >= paths.time_count() {
            return Err(PricingError::InvalidConfiguration {
                field: "exercise_indices".to_string(),
                reason: format!(
                    "index {} beyond the {}-point time grid",
                    last,
                    paths.time_count()
                ),
            });
        }
        self.payoff.validate(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mc::payoffs::ExercisePayoff;

    fn put() -> ExercisePayoff {
        ExercisePayoff::Put { asset: 0, k: 100.0 }
    }

    #[test]
    fn test_schedule_builders() {
        let grid = TimeGrid::uniform(1.0, 10).expect("valid grid");

        let american = ExerciseSpec::american(&grid, put()).expect("valid spec");
        assert_eq!(american.indices(), (1..=10).collect::<Vec<_>>().as_slice());

        let every_4 = ExerciseSpec::bermudan_every(&grid, 4, put()).expect("valid spec");
        assert_eq!(every_4.indices(), &[4, 8, 10]);
        let every_5 = ExerciseSpec::bermudan_every(&grid, 5, put()).expect("valid spec");
        assert_eq!(every_5.indices(), &[5, 10]);

        let from_times =
            ExerciseSpec::from_times(&grid, &[0.52, 0.01, 0.5, 1.0, 0.26], put()).expect("valid spec");
        assert_eq!(from_times.indices(), &[3, 5, 10]);
    }

    #[test]
    fn test_invalid_schedules() {
        let grid = TimeGrid::uniform(1.0, 10).expect("valid grid");
        assert_eq!(
            ExerciseSpec::new(vec![], put()).err(),
            Some(PricingError::EmptyExerciseSchedule)
        );
        assert!(ExerciseSpec::new(vec![0, 5], put()).is_err());
        assert!(ExerciseSpec::new(vec![5, 3], put()).is_err());
        assert!(ExerciseSpec::new(vec![3, 3], put()).is_err());
        assert!(ExerciseSpec::bermudan_every(&grid, 0, put()).is_err());
        assert_eq!(
            ExerciseSpec::from_times(&grid, &[0.0, 0.01], put()).err(),
            Some(PricingError::EmptyExerciseSchedule)
        );
    }
}
