use crate::error::Result;
use crate::species::{SpeciesId, SpeciesRegistry};
use diffusion_common::{ReleaseConfig, Vec3};
use log::{debug, info};

/// Creates `quantity` particles of `species` at `location`, once, before the
/// first snapshot. Time-varying release patterns are not supported.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseDirective {
    pub species: String,
    pub location: Vec3,
    pub quantity: u32,
}

impl ReleaseDirective {
    pub fn new(species: impl Into<String>, location: Vec3, quantity: u32) -> Self {
        Self {
            species: species.into(),
            location,
            quantity,
        }
    }
}

impl From<&ReleaseConfig> for ReleaseDirective {
    fn from(config: &ReleaseConfig) -> Self {
        Self::new(config.species.clone(), config.location, config.quantity)
    }
}

/// Executes every directive against the registry and returns the number of
/// particles created.
///
/// All target species are resolved first, so an unknown species fails with
/// `Error::UnknownSpecies` before any particle exists.
pub fn release_all(registry: &mut SpeciesRegistry, directives: &[ReleaseDirective]) -> Result<u64> {
    let targets: Vec<SpeciesId> = directives
        .iter()
        .map(|d| registry.lookup_id(&d.species))
        .collect::<Result<_>>()?;

    let mut released = 0u64;
    for (site_idx, (directive, id)) in directives.iter().zip(targets).enumerate() {
        info!(
            "Release site {}: releasing {} molecules of species '{}' at ({}, {}, {})",
            site_idx,
            directive.quantity,
            directive.species,
            directive.location.x,
            directive.location.y,
            directive.location.z
        );
        let species = registry.release_into(id, directive.location, directive.quantity as usize);
        debug!("Species '{}' now has {} particles.", species.name(), species.particle_count());
        released += directive.quantity as u64;
    }
    Ok(released)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn releases_exact_quantity_at_point() -> Result<()> {
        let mut registry = SpeciesRegistry::new();
        registry.add_species("A", 0, 1e-6)?;
        let released = release_all(
            &mut registry,
            &[ReleaseDirective::new("A", Vec3::new(1.0, 2.0, 3.0), 5)],
        )?;
        assert_eq!(released, 5);

        let a = registry.lookup("A")?;
        assert_eq!(a.particle_count(), 5);
        assert!(a.particles().all(|p| p.position == Vec3::new(1.0, 2.0, 3.0)));
        Ok(())
    }

    #[test]
    fn directives_accumulate_newest_first() -> Result<()> {
        let mut registry = SpeciesRegistry::new();
        registry.add_species("A", 0, 1e-6)?;
        registry.add_species("B", 1, 0.0)?;
        release_all(
            &mut registry,
            &[
                ReleaseDirective::new("A", Vec3::new(0.0, 0.0, 0.0), 2),
                ReleaseDirective::new("B", Vec3::new(9.0, 9.0, 9.0), 1),
                ReleaseDirective::new("A", Vec3::new(1.0, 1.0, 1.0), 3),
            ],
        )?;
        let a = registry.lookup("A")?;
        assert_eq!(a.particle_count(), 5);
        let xs: Vec<f64> = a.particles().map(|p| p.position.x).collect();
        assert_eq!(xs, [1.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(registry.lookup("B")?.particle_count(), 1);
        assert_eq!(registry.total_particles(), 6);
        Ok(())
    }

    #[test]
    fn unknown_species_creates_nothing() -> Result<()> {
        let mut registry = SpeciesRegistry::new();
        registry.add_species("A", 0, 1e-6)?;
        let err = release_all(
            &mut registry,
            &[
                ReleaseDirective::new("A", Vec3::zero(), 4),
                ReleaseDirective::new("missing", Vec3::zero(), 1),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownSpecies(ref n) if n == "missing"));
        assert_eq!(registry.total_particles(), 0);
        Ok(())
    }

    #[test]
    fn zero_quantity_is_a_no_op() -> Result<()> {
        let mut registry = SpeciesRegistry::new();
        registry.add_species("A", 0, 1e-6)?;
        let released = release_all(&mut registry, &[ReleaseDirective::new("A", Vec3::zero(), 0)])?;
        assert_eq!(released, 0);
        assert_eq!(registry.lookup("A")?.particle_count(), 0);
        Ok(())
    }
}
