//! The binary trajectory snapshot format shared by the engine (writer) and the
//! inspector (reader).
//!
//! One file per iteration, all integers and floats little-endian:
//!
//! ```text
//! file          := marker species_block*
//! marker        := i32 (always 1)
//! species_block := u8 name_len, name bytes, u8 type_code,
//!                  i32 total_values, f32 * total_values
//! ```
//!
//! `total_values` is three times the particle count; values are flattened
//! `(x, y, z)` triples.

use crate::vecmath::Vec3;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Marker written at the start of every binary snapshot file.
pub const BINARY_MARKER: i32 = 1;
/// Longest species name the one-byte length prefix can describe.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;
/// Type code for volume molecules.
pub const TYPE_VOLUME: u8 = 0;
/// Type code for surface molecules.
pub const TYPE_SURFACE: u8 = 1;

pub const FRAME_FILE_PREFIX: &str = "Scene.cellbin.";
pub const FRAME_FILE_SUFFIX: &str = ".dat";

/// Number of decimal digits needed to print the largest iteration index.
pub fn frame_digit_width(max_iteration: u32) -> usize {
    let mut width = 1;
    let mut rest = max_iteration / 10;
    while rest > 0 {
        width += 1;
        rest /= 10;
    }
    width
}

/// `Scene.cellbin.<iteration>.dat` with the iteration zero-padded to `width`.
pub fn frame_file_name(iteration: u32, width: usize) -> String {
    format!("{FRAME_FILE_PREFIX}{iteration:0width$}{FRAME_FILE_SUFFIX}")
}

/// Parses the iteration number back out of a frame file name.
/// Returns `None` for names that are not frame files.
pub fn parse_frame_file_name(name: &str) -> Option<u32> {
    let digits = name
        .strip_prefix(FRAME_FILE_PREFIX)?
        .strip_suffix(FRAME_FILE_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Positions of one species as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesBlock {
    pub name: String,
    pub type_code: u8,
    /// Flattened (x, y, z) triples in particle-list order.
    pub values: Vec<f32>,
}

impl SpeciesBlock {
    pub fn particle_count(&self) -> usize {
        self.values.len() / 3
    }

    /// Iterates the stored positions as vectors.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.values
            .chunks_exact(3)
            .map(|xyz| Vec3::from([xyz[0], xyz[1], xyz[2]]))
    }
}

/// A decoded trajectory snapshot: every species block of one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub blocks: Vec<SpeciesBlock>,
}

impl Snapshot {
    /// Decodes a snapshot from any reader. Reading stops cleanly at end of
    /// input between species blocks; a truncated block is an error.
    pub fn decode<R: Read>(mut reader: R) -> Result<Self> {
        let marker = read_i32(&mut reader).context("Failed to read binary marker")?;
        if marker != BINARY_MARKER {
            anyhow::bail!("Unsupported snapshot marker {} (expected {}).", marker, BINARY_MARKER);
        }

        let mut blocks = Vec::new();
        while let Some(name_len) = read_u8_or_eof(&mut reader)? {
            let mut name_bytes = vec![0u8; name_len as usize];
            reader
                .read_exact(&mut name_bytes)
                .context("Truncated species name")?;
            let name = String::from_utf8(name_bytes).context("Species name is not valid UTF-8")?;

            let mut type_code = [0u8; 1];
            reader
                .read_exact(&mut type_code)
                .with_context(|| format!("Truncated type code for species '{}'", name))?;

            let total_values = read_i32(&mut reader)
                .with_context(|| format!("Truncated value count for species '{}'", name))?;
            if total_values < 0 || total_values % 3 != 0 {
                anyhow::bail!(
                    "Invalid value count {} for species '{}' (must be a non-negative multiple of 3).",
                    total_values,
                    name
                );
            }

            // The count comes from the file; let the buffer grow with the bytes actually read.
            let expected_bytes = total_values as u64 * 4;
            let mut raw = Vec::new();
            reader
                .by_ref()
                .take(expected_bytes)
                .read_to_end(&mut raw)
                .with_context(|| format!("Failed to read positions for species '{}'", name))?;
            if (raw.len() as u64) < expected_bytes {
                anyhow::bail!(
                    "Truncated positions for species '{}': expected {} values, found {}.",
                    name,
                    total_values,
                    raw.len() / 4
                );
            }
            let values = raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();

            blocks.push(SpeciesBlock {
                name,
                type_code: type_code[0],
                values,
            });
        }

        Ok(Snapshot { blocks })
    }

    /// Opens and decodes one snapshot file.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)
            .with_context(|| format!("Failed to open snapshot file '{}'", path_ref.display()))?;
        Self::decode(BufReader::new(file))
            .with_context(|| format!("Failed to decode snapshot file '{}'", path_ref.display()))
    }

    pub fn total_particles(&self) -> usize {
        self.blocks.iter().map(SpeciesBlock::particle_count).sum()
    }

    pub fn block(&self, name: &str) -> Option<&SpeciesBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }
}

fn read_i32<R: Read>(reader: &mut R) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u8_or_eof<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Failed to read species block header"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_bytes(name: &str, type_code: u8, values: &[f32]) -> Vec<u8> {
        let mut out = vec![name.len() as u8];
        out.extend_from_slice(name.as_bytes());
        out.push(type_code);
        out.extend_from_slice(&(values.len() as i32).to_le_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn digit_width_fits_largest_index() {
        assert_eq!(frame_digit_width(0), 1);
        assert_eq!(frame_digit_width(9), 1);
        assert_eq!(frame_digit_width(10), 2);
        assert_eq!(frame_digit_width(999), 3);
        assert_eq!(frame_digit_width(1000), 4);
        assert_eq!(frame_digit_width(u32::MAX), 10);
    }

    #[test]
    fn frame_names_are_zero_padded() {
        assert_eq!(frame_file_name(7, 4), "Scene.cellbin.0007.dat");
        assert_eq!(frame_file_name(1000, 4), "Scene.cellbin.1000.dat");
        assert_eq!(parse_frame_file_name("Scene.cellbin.0007.dat"), Some(7));
        assert_eq!(parse_frame_file_name("Scene.cellbin..dat"), None);
        assert_eq!(parse_frame_file_name("Scene.cellbin.00a7.dat"), None);
        assert_eq!(parse_frame_file_name("notes.txt"), None);
    }

    #[test]
    fn decodes_blocks_including_empty_species() -> Result<()> {
        let mut bytes = BINARY_MARKER.to_le_bytes().to_vec();
        bytes.extend(block_bytes("a", TYPE_VOLUME, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        bytes.extend(block_bytes("empty", TYPE_SURFACE, &[]));

        let snapshot = Snapshot::decode(bytes.as_slice())?;
        assert_eq!(snapshot.blocks.len(), 2);
        assert_eq!(snapshot.total_particles(), 2);

        let a = snapshot.block("a").expect("block a present");
        assert_eq!(a.type_code, TYPE_VOLUME);
        let positions: Vec<Vec3> = a.positions().collect();
        assert_eq!(positions[1], Vec3::new(4.0, 5.0, 6.0));

        let empty = snapshot.block("empty").expect("empty block present");
        assert_eq!(empty.type_code, TYPE_SURFACE);
        assert_eq!(empty.particle_count(), 0);
        Ok(())
    }

    #[test]
    fn rejects_wrong_marker() {
        let bytes = 2i32.to_le_bytes().to_vec();
        let err = Snapshot::decode(bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("marker"));
    }

    #[test]
    fn rejects_truncated_positions() {
        let mut bytes = BINARY_MARKER.to_le_bytes().to_vec();
        let mut block = block_bytes("a", TYPE_VOLUME, &[1.0, 2.0, 3.0]);
        block.truncate(block.len() - 2);
        bytes.extend(block);
        assert!(Snapshot::decode(bytes.as_slice()).is_err());
    }

    #[test]
    fn oversized_value_count_is_an_error_not_an_allocation() {
        let mut bytes = BINARY_MARKER.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1, b'a', TYPE_VOLUME]);
        bytes.extend_from_slice(&(i32::MAX - 1).to_le_bytes());
        let err = Snapshot::decode(bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("Truncated positions"));
    }

    #[test]
    fn marker_only_file_has_no_blocks() -> Result<()> {
        let bytes = BINARY_MARKER.to_le_bytes();
        let snapshot = Snapshot::decode(&bytes[..])?;
        assert!(snapshot.blocks.is_empty());
        Ok(())
    }
}
