use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use diffusion_common::Snapshot;
use env_logger::Builder;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

mod stats;

use stats::{conservation_violations, discover_frames, frame_stats, SpeciesStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Csv,
    Json,
}

/// Command-line arguments for the inspector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding Scene.cellbin.<i>.dat files (e.g. viz_data/seed_00001)
    #[arg(short, long)]
    input: PathBuf,

    /// Report file; only a summary is logged if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Csv)]
    format: ReportFormat,
}

/// Everything the inspector learned about one trajectory.
#[derive(Debug)]
struct Inspection {
    frames: usize,
    rows: Vec<SpeciesStats>,
    violations: Vec<u32>,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();

    let inspection = run_with_args(args)?;
    info!(
        "Inspected {} frames ({} report rows, {} conservation violations).",
        inspection.frames,
        inspection.rows.len(),
        inspection.violations.len()
    );
    Ok(())
}

fn run_with_args(args: Args) -> Result<Inspection> {
    info!("Starting Trajectory Inspector...");
    info!("Input directory: {}", args.input.display());

    let frame_files = discover_frames(&args.input)?;
    if frame_files.is_empty() {
        warn!("No snapshot files found in {}.", args.input.display());
        return Ok(Inspection {
            frames: 0,
            rows: Vec::new(),
            violations: Vec::new(),
        });
    }
    info!("Found {} snapshot files.", frame_files.len());

    // Set up progress bar
    let progress_bar = ProgressBar::new(frame_files.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")?
            .progress_chars("#>-"),
    );

    // Decode in parallel, keep iteration order
    let frames: Vec<(u32, Snapshot)> = frame_files
        .par_iter()
        .progress_with(progress_bar.clone())
        .map(|f| Snapshot::read_from_path(&f.path).map(|s| (f.iteration, s)))
        .collect::<Result<_>>()?;
    progress_bar.finish_and_clear();

    let (_, reference) = &frames[0];
    let rows: Vec<SpeciesStats> = frames
        .iter()
        .flat_map(|(iteration, snapshot)| frame_stats(*iteration, snapshot, reference))
        .collect();

    let violations = conservation_violations(&frames);
    if violations.is_empty() {
        info!(
            "Particle count conserved: {} particles in every frame.",
            reference.total_particles()
        );
    } else {
        warn!(
            "Particle count changes in {} frames (first at iteration {}).",
            violations.len(),
            violations[0]
        );
    }

    if let Some((last_iteration, last)) = frames.last() {
        for row in frame_stats(*last_iteration, last, reference) {
            info!(
                "Iteration {} | {} (type {}) | count {} | centroid ({:.4}, {:.4}, {:.4}) | msd {}",
                row.iteration,
                row.species,
                row.type_code,
                row.count,
                row.centroid_x,
                row.centroid_y,
                row.centroid_z,
                row.msd.map_or_else(|| "-".to_string(), |m| format!("{:.6}", m))
            );
        }
    }

    if let Some(output) = &args.output {
        match args.format {
            ReportFormat::Csv => {
                let mut writer = csv::Writer::from_path(output)
                    .with_context(|| format!("Failed to create report: {}", output.display()))?;
                for row in &rows {
                    writer.serialize(row)?;
                }
                writer.flush()?;
            }
            ReportFormat::Json => {
                let file = File::create(output)
                    .with_context(|| format!("Failed to create report: {}", output.display()))?;
                serde_json::to_writer_pretty(BufWriter::new(file), &rows)?;
            }
        }
        info!("Report written to {}", output.display());
    }

    Ok(Inspection {
        frames: frames.len(),
        rows,
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_frame(dir: &Path, iteration: u32, values: &[f32]) -> Result<()> {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.push(1);
        bytes.extend_from_slice(b"a");
        bytes.push(0);
        bytes.extend_from_slice(&(values.len() as i32).to_le_bytes());
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        fs::write(dir.join(format!("Scene.cellbin.{:02}.dat", iteration)), bytes)?;
        Ok(())
    }

    #[test]
    fn inspects_directory_and_writes_csv() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_frame(dir.path(), 0, &[0.0, 0.0, 0.0])?;
        write_frame(dir.path(), 1, &[1.0, 0.0, 0.0])?;
        write_frame(dir.path(), 2, &[1.0, 2.0, 2.0])?;
        let report = dir.path().join("report.csv");

        let inspection = run_with_args(Args {
            input: dir.path().to_path_buf(),
            output: Some(report.clone()),
            format: ReportFormat::Csv,
        })?;
        assert_eq!(inspection.frames, 3);
        assert!(inspection.violations.is_empty());
        assert_eq!(inspection.rows.len(), 3);
        assert_eq!(inspection.rows[2].msd, Some(9.0));

        let text = fs::read_to_string(&report)?;
        assert!(text.starts_with("iteration,species,type_code,count"));
        assert_eq!(text.lines().count(), 4);
        Ok(())
    }

    #[test]
    fn json_report_and_conservation_warning() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_frame(dir.path(), 0, &[0.0, 0.0, 0.0])?;
        write_frame(dir.path(), 1, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0])?;
        let report = dir.path().join("report.json");

        let inspection = run_with_args(Args {
            input: dir.path().to_path_buf(),
            output: Some(report.clone()),
            format: ReportFormat::Json,
        })?;
        assert_eq!(inspection.violations, [1]);

        let rows: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
        assert_eq!(rows.as_array().map(Vec::len), Some(2));
        assert_eq!(rows[1]["count"], 2);
        assert!(rows[1]["msd"].is_null());
        Ok(())
    }

    #[test]
    fn empty_directory_is_not_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let inspection = run_with_args(Args {
            input: dir.path().to_path_buf(),
            output: None,
            format: ReportFormat::Csv,
        })?;
        assert_eq!(inspection.frames, 0);
        Ok(())
    }

    #[test]
    fn corrupt_frame_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_frame(dir.path(), 0, &[0.0, 0.0, 0.0])?;
        fs::write(dir.path().join("Scene.cellbin.01.dat"), 7i32.to_le_bytes())?;
        let err = run_with_args(Args {
            input: dir.path().to_path_buf(),
            output: None,
            format: ReportFormat::Csv,
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Scene.cellbin.01.dat"));
        Ok(())
    }
}
