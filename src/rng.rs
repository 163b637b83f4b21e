use rand::prelude::*;
use rand_distr::StandardNormal;

/// Multiplier used to spread per-species stream seeds apart (2^64 / golden ratio).
const STREAM_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic, seedable source of uniform and Gaussian samples.
///
/// The same seed and the same sequence of calls always produce the same
/// values, which is what makes trajectory files byte-reproducible.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
    seed: u64,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Independent stream for the species at registry position `index`.
    ///
    /// Seed derivation: `seed + (index + 1) * 0x9E3779B97F4A7C15`, wrapping.
    pub fn for_species(seed: u64, index: usize) -> Self {
        Self::seeded(species_stream_seed(seed, index))
    }

    /// Resets the state as if freshly constructed with `seed`.
    pub fn reseed(&mut self, seed: u64) {
        *self = Self::seeded(seed);
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// One sample from the standard normal distribution.
    #[inline]
    pub fn next_gaussian(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// One sample uniformly distributed in `[0, 1)`.
    #[inline]
    pub fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Seed of the per-species stream at registry position `index`.
pub fn species_stream_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add((index as u64).wrapping_add(1).wrapping_mul(STREAM_SEED_STRIDE))
}
