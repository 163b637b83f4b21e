//! Brownian displacement of every particle by one time step.
//!
//! Draw order is part of the output contract: species in registry insertion
//! order, particles in list order (newest release first), and three Gaussian
//! draws per particle in x, y, z order. Species that do not move still
//! consume their draws.

use crate::rng::RandomSource;
use crate::species::{Species, SpeciesRegistry};
use diffusion_common::Vec3;
use log::trace;
use rayon::prelude::*;
use std::f64::consts::FRAC_1_SQRT_2;

/// Per-step spatial scale `sqrt(16e8 * D * dt)` for diffusion constant `D`
/// and time step `dt`. The constant folds in the unit conversion of the
/// physical model, so positions come out in the same length unit as release
/// sites.
#[inline]
pub fn step_scale(diffusion_constant: f64, dt: f64) -> f64 {
    (16.0 * 1.0e8 * diffusion_constant * dt).sqrt()
}

/// Moves one position by `scale * g * 1/sqrt(2)` on each axis.
#[inline]
fn displace(position: &mut Vec3, scale: f64, rng: &mut RandomSource) {
    let gx = rng.next_gaussian();
    let gy = rng.next_gaussian();
    let gz = rng.next_gaussian();
    position.x += scale * gx * FRAC_1_SQRT_2;
    position.y += scale * gy * FRAC_1_SQRT_2;
    position.z += scale * gz * FRAC_1_SQRT_2;
}

fn advance_species(species: &mut Species, dt: f64, rng: &mut RandomSource) {
    let scale = step_scale(species.diffusion_constant(), dt);
    trace!("Diffusing species '{}' with step scale {:e}", species.name(), scale);
    for particle in species.particles_mut() {
        displace(&mut particle.position, scale, rng);
    }
}

/// Advances all particles of all species by one time step.
#[derive(Debug, Clone, Copy)]
pub struct DiffusionIntegrator {
    dt: f64,
}

impl DiffusionIntegrator {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// One step using a single shared stream, species in insertion order.
    pub fn advance(&self, registry: &mut SpeciesRegistry, rng: &mut RandomSource) {
        for species in registry.species_mut() {
            advance_species(species, self.dt, rng);
        }
    }

    /// One step with one stream per species, species processed in parallel.
    ///
    /// `streams[i]` belongs to the species at registry position `i`; missing
    /// streams are created with [`RandomSource::for_species`] from `seed`.
    /// Output depends only on `seed`, never on thread scheduling.
    pub fn advance_per_species(
        &self,
        registry: &mut SpeciesRegistry,
        streams: &mut Vec<RandomSource>,
        seed: u64,
    ) {
        while streams.len() < registry.len() {
            let index = streams.len();
            streams.push(RandomSource::for_species(seed, index));
        }
        let dt = self.dt;
        registry
            .species_mut()
            .par_iter_mut()
            .zip(streams.par_iter_mut())
            .for_each(|(species, rng)| advance_species(species, dt, rng));
    }
}
