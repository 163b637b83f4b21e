use crate::diffusion::DiffusionIntegrator;
use crate::error::Result;
use crate::release::{release_all, ReleaseDirective};
use crate::rng::RandomSource;
use crate::species::SpeciesRegistry;
use crate::trajectory::TrajectoryWriter;
use diffusion_common::{RngStreams, SimParams, SimulationConfig, Vec3};
use log::{debug, info, trace};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of a completed [`DiffusionSimulation::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Number of snapshot files written (iterations 0..=N).
    pub frames_written: u32,
    /// Particles present in every snapshot.
    pub particles: u64,
    pub elapsed: Duration,
    /// Snapshot of the final iteration.
    pub last_frame: PathBuf,
}

/// One simulation session: the registry with its released particles, the
/// random state, and the loop position. Each session is independent; nothing
/// is shared between sessions.
pub struct DiffusionSimulation {
    config: SimulationConfig,
    params: SimParams,
    registry: SpeciesRegistry,
    integrator: DiffusionIntegrator,
    /// Stream used when `streams = "shared"`.
    rng: RandomSource,
    /// Streams used when `streams = "per_species"`, indexed like the registry.
    species_streams: Vec<RandomSource>,
    writer: TrajectoryWriter,
    /// Iteration whose snapshot is written next.
    current_iteration: u32,
    released: u64,
}

impl DiffusionSimulation {
    /// Registers the configured species and executes every release directive.
    /// Snapshots go to `frame_dir`, which must already exist when the run starts.
    pub fn new(config: SimulationConfig, frame_dir: impl Into<PathBuf>) -> Result<Self> {
        let params = config.get_sim_params();

        let mut registry = SpeciesRegistry::new();
        for species in &config.species {
            registry.add_species(&species.name, species.type_code, species.diffusion_constant)?;
            debug!(
                "Registered species '{}' (type {}, D = {:e})",
                species.name, species.type_code, species.diffusion_constant
            );
        }

        let directives: Vec<ReleaseDirective> = config.releases.iter().map(ReleaseDirective::from).collect();
        let released = release_all(&mut registry, &directives)?;

        let writer = TrajectoryWriter::new(frame_dir, params.frame_digit_width);
        info!("Snapshot files: {}", writer.frame_path(0).display());
        debug!("File names use {} digits.", writer.digit_width());

        Ok(Self {
            rng: RandomSource::seeded(params.seed),
            species_streams: Vec::new(),
            integrator: DiffusionIntegrator::new(params.dt),
            config,
            params,
            registry,
            writer,
            current_iteration: 0,
            released,
        })
    }

    /// Writes the snapshot for the current iteration.
    pub fn record_snapshot(&mut self) -> Result<PathBuf> {
        self.writer.write_snapshot(self.current_iteration, &self.registry)
    }

    /// Advances every particle by one time step and moves to the next iteration.
    pub fn step(&mut self) {
        match self.params.streams {
            RngStreams::Shared => self.integrator.advance(&mut self.registry, &mut self.rng),
            RngStreams::PerSpecies => {
                self.integrator
                    .advance_per_species(&mut self.registry, &mut self.species_streams, self.params.seed)
            }
        }
        self.current_iteration += 1;
    }

    /// Runs the snapshot-then-diffuse loop up to and including the last
    /// iteration. The first failed snapshot aborts the run; no later files
    /// are written.
    pub fn run(&mut self) -> Result<RunSummary> {
        let total = self.params.iterations;
        let every = self.params.progress_every.max(1);
        let start_time = Instant::now();
        let mut frames_written = 0u32;

        info!(
            "Begin simulation: {} iterations, dt = {:e} s, {} particles in {} species.",
            total,
            self.params.dt,
            self.released,
            self.registry.len()
        );

        let last_frame = loop {
            let iteration = self.current_iteration;
            let path = self.record_snapshot()?;
            frames_written += 1;

            if iteration % every == 0 || iteration == total {
                info!(
                    "Iteration [{}/{}] (t = {:e} s) | Particles: {} | Elapsed: {:.2} s | {}",
                    iteration,
                    total,
                    iteration as f64 * self.params.dt,
                    self.particle_count(),
                    start_time.elapsed().as_secs_f64(),
                    path.display()
                );
            } else {
                trace!("Iteration [{}/{}] written to {}", iteration, total, path.display());
            }

            if iteration >= total {
                break path;
            }
            self.step();
        };

        let elapsed = start_time.elapsed();
        info!("Simulation finished in {:.3} seconds.", elapsed.as_secs_f64());
        Ok(RunSummary {
            frames_written,
            particles: self.particle_count() as u64,
            elapsed,
            last_frame,
        })
    }

    /// Writes every particle's current position as `species,x,y,z` rows.
    pub fn save_final_positions<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref()).map_err(io::Error::from)?;
        writer
            .write_record(["species", "x", "y", "z"])
            .map_err(io::Error::from)?;
        for (name, position) in self.positions() {
            writer
                .write_record([
                    name.to_string(),
                    format!("{:.6}", position.x),
                    format!("{:.6}", position.y),
                    format!("{:.6}", position.z),
                ])
                .map_err(io::Error::from)?;
        }
        writer.flush()?;
        info!("Final positions saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Current positions, species in insertion order, particles in list order.
    pub fn positions(&self) -> impl Iterator<Item = (&str, Vec3)> + '_ {
        self.registry
            .iter()
            .flat_map(|s| s.particles().map(move |p| (s.name(), p.position)))
    }

    pub fn particle_count(&self) -> usize {
        self.registry.total_particles()
    }

    pub fn current_iteration(&self) -> u32 {
        self.current_iteration
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    /// Provides access to the simulation parameters.
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Provides access to the original simulation configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn frame_path(&self, iteration: u32) -> PathBuf {
        self.writer.frame_path(iteration)
    }
}
