use anyhow::Result;
use clap::Parser;
use diffusion_common::SimulationConfig;
use diffusion_engine::layout::OutputLayout;
use diffusion_engine::DiffusionSimulation;
use log::{debug, error, info};
use std::path::PathBuf;

/// Command-line arguments for the diffusion engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulation configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the project output directory from the config
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Override the RNG seed from the config
    #[arg(long)]
    seed: Option<u64>,

    /// Override the iteration count from the config
    #[arg(long)]
    iterations: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    let args = Args::parse();
    info!("Starting Diffusion Engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(dir) = args.output_dir {
        config.project.output_dir = dir;
    }
    if let Some(seed) = args.seed {
        config.rng.seed = seed;
    }
    if let Some(iterations) = args.iterations {
        config.timing.iterations = iterations;
    }
    debug!("Configuration: {:#?}", config);

    // --- Prepare Output Directories ---
    let layout = OutputLayout::new(&config.project.output_dir, config.project.seed_index);
    layout.prepare()?;

    // --- Initialize Simulation ---
    let save_final_positions = config.output.save_final_positions;
    let final_positions_path = layout
        .project_dir()
        .join(format!("{}_final_positions.csv", config.output.base_filename));

    let mut sim = match DiffusionSimulation::new(config, layout.viz_seed_dir()) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Error setting up simulation: {}", e);
            anyhow::bail!("Simulation setup failed.");
        }
    };
    info!(
        "Released {} particles in {} species (seed {}).",
        sim.particle_count(),
        sim.registry().len(),
        sim.params().seed
    );

    // --- Simulation Loop ---
    let summary = match sim.run() {
        Ok(summary) => summary,
        Err(e) => {
            error!("Error during simulation at iteration {}: {}", sim.current_iteration(), e);
            anyhow::bail!("Simulation aborted.");
        }
    };
    info!(
        "Wrote {} snapshot files to {}.",
        summary.frames_written,
        layout.viz_seed_dir().display()
    );

    // Save final positions if requested
    if save_final_positions {
        sim.save_final_positions(&final_positions_path)?;
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
