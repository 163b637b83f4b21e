//! Brownian particle diffusion with per-iteration binary trajectory snapshots.
//!
//! Species are registered in a [`species::SpeciesRegistry`], populated once by
//! [`release::release_all`], and then advanced by the
//! [`diffusion::DiffusionIntegrator`]. [`simulation::DiffusionSimulation`] drives
//! the snapshot-then-diffuse loop and writes files through
//! [`trajectory::TrajectoryWriter`].

pub mod diffusion;
pub mod error;
pub mod layout;
pub mod release;
pub mod rng;
pub mod simulation;
pub mod species;
pub mod trajectory;

pub use error::{Error, Result};
pub use simulation::{DiffusionSimulation, RunSummary};
