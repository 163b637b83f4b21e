use crate::error::{Error, Result};
use crate::species::{SpeciesOrder, SpeciesRegistry};
use diffusion_common::snapshot::BINARY_MARKER;
use diffusion_common::frame_file_name;
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes the snapshot layout for the current registry state to `writer`:
/// the binary marker, then one block per species in insertion order.
pub fn encode_snapshot<W: Write>(writer: &mut W, registry: &SpeciesRegistry) -> io::Result<()> {
    writer.write_all(&BINARY_MARKER.to_le_bytes())?;
    for species in registry.for_each_species(SpeciesOrder::Insertion) {
        let name = species.name().as_bytes();
        let name_len = u8::try_from(name.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("species name '{}' longer than 255 bytes", species.name()),
            )
        })?;
        let total_values = species
            .particle_count()
            .checked_mul(3)
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "species '{}' has too many particles ({}) for one snapshot block",
                        species.name(),
                        species.particle_count()
                    ),
                )
            })?;

        writer.write_all(&[name_len])?;
        writer.write_all(name)?;
        writer.write_all(&[species.type_code()])?;
        writer.write_all(&total_values.to_le_bytes())?;
        for particle in species.particles() {
            for value in particle.position.to_f32_array() {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

/// Writes one `Scene.cellbin.<i>.dat` file per iteration into an existing directory.
#[derive(Debug, Clone)]
pub struct TrajectoryWriter {
    dir: PathBuf,
    digit_width: usize,
}

impl TrajectoryWriter {
    /// Every file name in the run pads the iteration to `digit_width` digits.
    pub fn new(dir: impl Into<PathBuf>, digit_width: usize) -> Self {
        Self {
            dir: dir.into(),
            digit_width,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn digit_width(&self) -> usize {
        self.digit_width
    }

    pub fn frame_path(&self, iteration: u32) -> PathBuf {
        self.dir.join(frame_file_name(iteration, self.digit_width))
    }

    /// Encodes the registry into the file for `iteration`. The file is
    /// flushed and closed before this returns, on success and on error.
    /// The directory is never created here.
    pub fn write_snapshot(&self, iteration: u32, registry: &SpeciesRegistry) -> Result<PathBuf> {
        let path = self.frame_path(iteration);
        let wrap = |source: io::Error| Error::TrajectoryIo {
            iteration,
            path: path.clone(),
            source,
        };

        let file = File::create(&path).map_err(wrap)?;
        let mut writer = BufWriter::new(file);
        encode_snapshot(&mut writer, registry).map_err(wrap)?;
        let file = writer.into_inner().map_err(|e| wrap(e.into_error()))?;
        drop(file);

        debug!("Wrote snapshot for iteration {} to {}", iteration, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{release_all, ReleaseDirective};
    use diffusion_common::{frame_digit_width, Snapshot, Vec3};

    fn registry() -> Result<SpeciesRegistry> {
        let mut registry = SpeciesRegistry::new();
        registry.add_species("vol", 0, 1e-6)?;
        registry.add_species("surf", 1, 0.0)?;
        release_all(
            &mut registry,
            &[
                ReleaseDirective::new("vol", Vec3::new(1.0, 2.0, 3.0), 1),
                ReleaseDirective::new("vol", Vec3::new(4.0, 5.0, 6.0), 1),
            ],
        )?;
        Ok(registry)
    }

    #[test]
    fn encodes_exact_byte_layout() -> Result<()> {
        let mut bytes = Vec::new();
        encode_snapshot(&mut bytes, &registry()?)?;

        let mut expected = 1i32.to_le_bytes().to_vec();
        expected.push(3);
        expected.extend_from_slice(b"vol");
        expected.push(0);
        expected.extend_from_slice(&6i32.to_le_bytes());
        // newest release first
        for v in [4.0f32, 5.0, 6.0, 1.0, 2.0, 3.0] {
            expected.extend_from_slice(&v.to_le_bytes());
        }
        expected.push(4);
        expected.extend_from_slice(b"surf");
        expected.push(1);
        expected.extend_from_slice(&0i32.to_le_bytes());

        assert_eq!(bytes, expected);
        Ok(())
    }

    #[test]
    fn encoded_snapshot_decodes() -> anyhow::Result<()> {
        let mut bytes = Vec::new();
        encode_snapshot(&mut bytes, &registry()?)?;
        let snapshot = Snapshot::decode(bytes.as_slice())?;
        assert_eq!(snapshot.total_particles(), 2);
        let names: Vec<&str> = snapshot.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["vol", "surf"]);
        Ok(())
    }

    #[test]
    fn writes_named_file_into_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let writer = TrajectoryWriter::new(dir.path(), frame_digit_width(1000));
        let path = writer.write_snapshot(7, &registry()?)?;
        assert_eq!(path, dir.path().join("Scene.cellbin.0007.dat"));
        assert_eq!(Snapshot::read_from_path(&path)?.total_particles(), 2);
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let writer = TrajectoryWriter::new(dir.path().join("not_created"), 2);
        let err = writer.write_snapshot(3, &registry()?).unwrap_err();
        match err {
            Error::TrajectoryIo { iteration, path, .. } => {
                assert_eq!(iteration, 3);
                assert!(path.ends_with("Scene.cellbin.03.dat"));
            }
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }
}
