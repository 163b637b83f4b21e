use crate::config::RngStreams;
use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used frequently during the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Time
    pub iterations: u32, // Last iteration index; iterations + 1 snapshots are written
    pub dt: f64,         // Seconds per diffusion step

    // Randomness
    pub seed: u64,
    pub streams: RngStreams,

    // Output
    pub frame_digit_width: usize, // Zero-padding of the iteration in frame file names
    pub progress_every: u32,
}
