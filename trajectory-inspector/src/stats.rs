use anyhow::{Context, Result};
use diffusion_common::{parse_frame_file_name, Snapshot, SpeciesBlock, Vec3};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A snapshot file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFile {
    pub iteration: u32,
    pub path: PathBuf,
}

/// Lists every `Scene.cellbin.<i>.dat` file in `dir`, sorted by iteration.
pub fn discover_frames(dir: &Path) -> Result<Vec<FrameFile>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list directory: {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(iteration) = name.to_str().and_then(parse_frame_file_name) {
            frames.push(FrameFile {
                iteration,
                path: entry.path(),
            });
        }
    }
    frames.sort_by_key(|f| f.iteration);
    Ok(frames)
}

/// One row of the report: a species in one frame.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpeciesStats {
    pub iteration: u32,
    pub species: String,
    pub type_code: u8,
    pub count: usize,
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub centroid_z: f64,
    /// Mean squared displacement from the first frame, matched by particle
    /// position in the list. Empty when the counts differ.
    pub msd: Option<f64>,
}

fn centroid(block: &SpeciesBlock) -> Vec3 {
    let count = block.particle_count();
    if count == 0 {
        return Vec3::zero();
    }
    let mut sum = Vec3::zero();
    for p in block.positions() {
        sum += p;
    }
    sum / count as f64
}

fn mean_squared_displacement(block: &SpeciesBlock, reference: &SpeciesBlock) -> Option<f64> {
    let count = block.particle_count();
    if count == 0 || count != reference.particle_count() {
        return None;
    }
    let total: f64 = block
        .positions()
        .zip(reference.positions())
        .map(|(p, p0)| p.distance_squared(p0))
        .sum();
    Some(total / count as f64)
}

/// Statistics for every species block of `snapshot`, compared against the
/// block of the same name in `reference` (normally iteration 0).
pub fn frame_stats(iteration: u32, snapshot: &Snapshot, reference: &Snapshot) -> Vec<SpeciesStats> {
    snapshot
        .blocks
        .iter()
        .map(|block| {
            let c = centroid(block);
            SpeciesStats {
                iteration,
                species: block.name.clone(),
                type_code: block.type_code,
                count: block.particle_count(),
                centroid_x: c.x,
                centroid_y: c.y,
                centroid_z: c.z,
                msd: reference
                    .block(&block.name)
                    .and_then(|r| mean_squared_displacement(block, r)),
            }
        })
        .collect()
}

/// Iterations whose total particle count differs from the first frame.
pub fn conservation_violations(frames: &[(u32, Snapshot)]) -> Vec<u32> {
    let Some((_, first)) = frames.first() else {
        return Vec::new();
    };
    let expected = first.total_particles();
    frames
        .iter()
        .filter(|(_, s)| s.total_particles() != expected)
        .map(|(i, _)| *i)
        .collect()
}
