use crate::sim_params::SimParams;
use crate::snapshot::{frame_digit_width, MAX_NAME_LEN};
use crate::vecmath::Vec3;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Where the run writes its output
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProjectConfig {
    pub output_dir: PathBuf,
    /// Run index used for the `viz_data/seed_NNNNN` folder.
    #[serde(default = "default_seed_index")]
    pub seed_index: u32,
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    /// Number of diffusion steps; snapshots are written for iterations 0..=iterations.
    pub iterations: u32,
    /// Time step in seconds.
    pub time_step: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RngStreams {
    /// One stream shared by every species, drawn in registry order.
    #[default]
    Shared,
    /// One independently seeded stream per species; species diffuse in parallel.
    PerSpecies,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RngConfig {
    #[serde(default = "default_rng_seed")]
    pub seed: u64,
    #[serde(default)]
    pub streams: RngStreams,
}

impl Default for RngConfig {
    fn default() -> Self {
        RngConfig {
            seed: default_rng_seed(),
            streams: RngStreams::Shared,
        }
    }
}

/// One molecule species declaration.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SpeciesConfig {
    pub name: String,
    /// 0 for volume molecules, 1 for surface molecules.
    #[serde(default)]
    pub type_code: u8,
    pub diffusion_constant: f64,
}

/// One release site: `quantity` molecules of `species` placed at `location`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReleaseConfig {
    pub species: String,
    pub location: Vec3,
    pub quantity: u32,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    /// Write `<base_filename>_final_positions.csv` after the last iteration.
    #[serde(default)]
    pub save_final_positions: bool,
    /// Log a progress line every this many iterations (derived from the iteration count if unset).
    #[serde(default)]
    pub progress_every: Option<u32>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_final_positions: false,
            progress_every: None,
        }
    }
}

fn default_seed_index() -> u32 {
    1
}

fn default_rng_seed() -> u64 {
    12345
}

fn default_base_filename() -> String {
    "diffusion".to_string()
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub project: ProjectConfig,
    pub timing: TimingConfig,
    #[serde(default)]
    pub rng: RngConfig,
    #[serde(default)]
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub releases: Vec<ReleaseConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges. Duplicate or unknown species names are reported
    /// by the engine's registry, not here.
    pub fn validate(&self) -> Result<()> {
        if !self.timing.time_step.is_finite() || self.timing.time_step <= 0.0 {
            anyhow::bail!("time_step must be finite and > 0.");
        }
        for species in &self.species {
            if species.name.is_empty() || species.name.len() > MAX_NAME_LEN {
                anyhow::bail!(
                    "species name '{}' must be between 1 and {} bytes.",
                    species.name,
                    MAX_NAME_LEN
                );
            }
            if !species.diffusion_constant.is_finite() || species.diffusion_constant < 0.0 {
                anyhow::bail!(
                    "diffusion_constant for species '{}' must be finite and >= 0.",
                    species.name
                );
            }
        }
        for release in &self.releases {
            if !release.location.is_finite() {
                anyhow::bail!("release location for species '{}' must be finite.", release.species);
            }
        }
        if self.output.progress_every == Some(0) {
            anyhow::bail!("progress_every must be greater than 0.");
        }
        Ok(())
    }

    /// Converts the configuration into the parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let iterations = self.timing.iterations;
        SimParams {
            iterations,
            dt: self.timing.time_step,
            seed: self.rng.seed,
            streams: self.rng.streams,
            frame_digit_width: frame_digit_width(iterations),
            progress_every: self
                .output
                .progress_every
                .unwrap_or_else(|| default_progress_every(iterations)),
        }
    }
}

/// `10^floor(log10(iterations / 10))`, never below 1.
fn default_progress_every(iterations: u32) -> u32 {
    let mut every = 1;
    let tenth = iterations / 10;
    while every <= tenth / 10 {
        every *= 10;
    }
    every
}
