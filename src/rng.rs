//! Random Number Generation for Path Simulation
//!
//! # Design
//!
//! Path simulation needs standard normal draws that are:
//! 1. **Reproducible**: same seed → same paths, bit for bit
//! 2. **Partitioned**: every path row owns an independent stream, so rows can be
//!    generated by any number of threads in any order
//! 3. **Explicit**: no process-wide random state; the seed is threaded through
//!    every simulation call
//!
//! # Stream Construction
//!
//! Row `i` of a simulation seeded with `s` draws from a `StdRng` whose seed is
//! a splitmix64 finaliser applied to `s` and `i`:
//! ```text
//! z = s + (i + 1) * 0x9e3779b97f4a7c15
//! z = (z ⊕ (z >> 30)) * 0xbf58476d1ce4e5b9
//! z = (z ⊕ (z >> 27)) * 0x94d049bb133111eb
//! seed_i = z ⊕ (z >> 31)
//! ```
//! The golden-ratio stride keeps `(s, i + 1)` and `(s + 1, i)` on different
//! streams.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// splitmix64 output function
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// RNG factory for reproducible parallel simulations
#[derive(Debug, Clone, Copy)]
pub struct RngFactory {
    base_seed: u64,
}

impl RngFactory {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Seed of the independent stream owned by `row`
    pub fn row_seed(&self, row: u64) -> u64 {
        mix64(
            self.base_seed
                .wrapping_add(row.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA)),
        )
    }

    /// Create the generator for a specific path row
    pub fn create_row_rng(&self, row: u64) -> StdRng {
        StdRng::seed_from_u64(self.row_seed(row))
    }

    /// Fill `out` with standard normals from the stream of `row`
    ///
    /// Draw order is the order of `out`, so callers that lay out a row as
    /// `(step, asset)` get the same numbers regardless of threading.
    pub fn fill_row_normals(&self, row: u64, out: &mut [f64]) {
        let mut rng = self.create_row_rng(row);
        for z in out.iter_mut() {
            *z = get_normal_draw(&mut rng);
        }
    }
}

pub fn get_normal_draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}
