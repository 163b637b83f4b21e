use crate::error::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout of one project run:
///
/// ```text
/// <project>/react_data/            reserved for reaction output
/// <project>/viz_data/seed_NNNNN/   one snapshot file per iteration
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    project_dir: PathBuf,
    seed_index: u32,
}

impl OutputLayout {
    pub fn new(project_dir: impl Into<PathBuf>, seed_index: u32) -> Self {
        Self {
            project_dir: project_dir.into(),
            seed_index,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn react_dir(&self) -> PathBuf {
        self.project_dir.join("react_data")
    }

    pub fn viz_dir(&self) -> PathBuf {
        self.project_dir.join("viz_data")
    }

    pub fn viz_seed_dir(&self) -> PathBuf {
        self.viz_dir().join(format!("seed_{:05}", self.seed_index))
    }

    /// Creates every directory of the layout. Existing directories are kept.
    pub fn prepare(&self) -> Result<()> {
        info!("Project path = \"{}\"", self.project_dir.display());
        info!("Creating directories ...");
        for dir in [self.react_dir(), self.viz_seed_dir()] {
            fs::create_dir_all(&dir)?;
            info!("  {}", dir.display());
        }
        Ok(())
    }
}
