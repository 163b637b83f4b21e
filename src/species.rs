use crate::error::{Error, Result};
use diffusion_common::snapshot::MAX_NAME_LEN;
use diffusion_common::Vec3;
use std::collections::btree_map;
use std::collections::{BTreeMap, VecDeque};

/// Index of a species in the registry arena (its insertion position).
pub type SpeciesId = usize;

/// One simulated point molecule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    /// Owning species (non-owning back reference).
    pub species: SpeciesId,
}

/// A named molecule species and the particles it owns.
#[derive(Debug, Clone)]
pub struct Species {
    id: SpeciesId,
    name: String,
    type_code: u8,
    diffusion_constant: f64,
    /// Most recently released first.
    particles: VecDeque<Particle>,
}

impl Species {
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_code(&self) -> u8 {
        self.type_code
    }

    pub fn diffusion_constant(&self) -> f64 {
        self.diffusion_constant
    }

    /// Number of live particles; always equals the collection length.
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Particles in list order (most recently released first).
    pub fn particles(&self) -> impl ExactSizeIterator<Item = &Particle> + '_ {
        self.particles.iter()
    }

    pub(crate) fn particles_mut(&mut self) -> impl Iterator<Item = &mut Particle> + '_ {
        self.particles.iter_mut()
    }

    /// Adds `quantity` particles at `position` to the front of the list.
    pub(crate) fn release(&mut self, position: Vec3, quantity: usize) {
        self.particles.reserve(quantity);
        for _ in 0..quantity {
            self.particles.push_front(Particle {
                position,
                species: self.id,
            });
        }
    }
}

/// Order in which [`SpeciesRegistry::for_each_species`] yields species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeciesOrder {
    /// Registration order. Used for snapshot layout and diffusion.
    #[default]
    Insertion,
    /// Lexicographic by name.
    Name,
}

/// Owns every species and, through them, every particle.
#[derive(Debug, Default, Clone)]
pub struct SpeciesRegistry {
    species: Vec<Species>,
    by_name: BTreeMap<String, SpeciesId>,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new species.
    ///
    /// Errors:
    /// - `Error::DuplicateSpecies` if `name` is already registered.
    /// - `Error::InvalidParam` if `name` is empty or longer than 255 bytes, or
    ///   `diffusion_constant` is negative or not finite.
    pub fn add_species(
        &mut self,
        name: &str,
        type_code: u8,
        diffusion_constant: f64,
    ) -> Result<SpeciesId> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidParam(format!(
                "species name '{}' must be between 1 and {} bytes",
                name, MAX_NAME_LEN
            )));
        }
        if !diffusion_constant.is_finite() || diffusion_constant < 0.0 {
            return Err(Error::InvalidParam(format!(
                "diffusion constant for species '{}' must be finite and >= 0",
                name
            )));
        }
        let id = self.species.len();
        match self.by_name.entry(name.to_string()) {
            btree_map::Entry::Occupied(_) => return Err(Error::DuplicateSpecies(name.to_string())),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        self.species.push(Species {
            id,
            name: name.to_string(),
            type_code,
            diffusion_constant,
            particles: VecDeque::new(),
        });
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Result<&Species> {
        self.lookup_id(name).map(|id| &self.species[id])
    }

    pub fn lookup_id(&self, name: &str) -> Result<SpeciesId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownSpecies(name.to_string()))
    }

    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id)
    }

    /// Adds `quantity` particles at `position` to a species resolved by
    /// [`lookup_id`](Self::lookup_id) on this registry.
    pub(crate) fn release_into(&mut self, id: SpeciesId, position: Vec3, quantity: usize) -> &Species {
        let species = &mut self.species[id];
        species.release(position, quantity);
        species
    }

    /// Lazily yields every species in the requested order. The iterator
    /// borrows the registry, so calling again restarts from the beginning.
    pub fn for_each_species(&self, order: SpeciesOrder) -> SpeciesIter<'_> {
        match order {
            SpeciesOrder::Insertion => SpeciesIter::Insertion(self.species.iter()),
            SpeciesOrder::Name => SpeciesIter::Name {
                ids: self.by_name.values(),
                species: &self.species,
            },
        }
    }

    /// Species in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Species> {
        self.species.iter()
    }

    pub(crate) fn species_mut(&mut self) -> &mut [Species] {
        &mut self.species
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn total_particles(&self) -> usize {
        self.species.iter().map(Species::particle_count).sum()
    }
}

/// Iterator returned by [`SpeciesRegistry::for_each_species`].
pub enum SpeciesIter<'a> {
    Insertion(std::slice::Iter<'a, Species>),
    Name {
        ids: btree_map::Values<'a, String, SpeciesId>,
        species: &'a [Species],
    },
}

impl<'a> Iterator for SpeciesIter<'a> {
    type Item = &'a Species;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SpeciesIter::Insertion(iter) => iter.next(),
            SpeciesIter::Name { ids, species } => {
                let species: &'a [Species] = *species;
                ids.next().map(|&id| &species[id])
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            SpeciesIter::Insertion(iter) => iter.size_hint(),
            SpeciesIter::Name { ids, .. } => ids.size_hint(),
        }
    }
}

impl ExactSizeIterator for SpeciesIter<'_> {}
