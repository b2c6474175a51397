// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use comm::{CommError, Communicator, ReduceOp};
use common::{ids::AtomId, Boundary, Vector};
use rustc_hash::FxHashMap;

use crate::{Atom, AtomHandle, Domain, StorageError};

const CARTESIAN: &str = "Cartesian";
const GENERALIZED: &str = "generalized";

/// The local and ghost atoms of one rank.
///
/// Local atoms are kept densely packed; removing one moves the last local atom into its slot.
/// Ghosts are appended in arrival order and only ever cleared all at once, so ghost handles stay
/// valid from one exchange to the next. The same id may appear several times among the ghosts
/// (different periodic images), and may also be local.
#[derive(Debug)]
pub struct AtomStorage {
    atoms: Vec<Atom>,
    ghosts: Vec<Atom>,
    atom_map: FxHashMap<AtomId, usize>,
    ghost_map: FxHashMap<AtomId, usize>,
    atom_capacity: usize,
    ghost_capacity: usize,
    is_cartesian: bool,
    snapshot: Option<Vec<Vector>>,
}

impl AtomStorage {
    /// Creates an empty storage in Cartesian mode.
    pub fn new(atom_capacity: usize, ghost_capacity: usize) -> Self {
        Self {
            atoms: Vec::with_capacity(atom_capacity),
            ghosts: Vec::with_capacity(ghost_capacity),
            atom_map: FxHashMap::default(),
            ghost_map: FxHashMap::default(),
            atom_capacity,
            ghost_capacity,
            is_cartesian: true,
            snapshot: None,
        }
    }

    /// Adds a local atom.
    pub fn add_atom(&mut self, mut atom: Atom) -> Result<AtomHandle, StorageError> {
        if self.atoms.len() == self.atom_capacity {
            return Err(StorageError::CapacityExceeded {
                what: "local atom",
                capacity: self.atom_capacity,
            });
        }
        if self.atom_map.contains_key(&atom.id) {
            return Err(StorageError::DuplicateAtom(atom.id));
        }
        atom.is_ghost = false;
        let index = self.atoms.len();
        self.atom_map.insert(atom.id, index);
        self.atoms.push(atom);
        Ok(AtomHandle::Local(index))
    }

    /// Adds a ghost atom. Ghost ids need not be unique.
    pub fn add_ghost(&mut self, mut atom: Atom) -> Result<AtomHandle, StorageError> {
        if self.ghosts.len() == self.ghost_capacity {
            return Err(StorageError::CapacityExceeded {
                what: "ghost atom",
                capacity: self.ghost_capacity,
            });
        }
        atom.is_ghost = true;
        atom.force = Vector::ZERO;
        let index = self.ghosts.len();
        self.ghost_map.entry(atom.id).or_insert(index);
        self.ghosts.push(atom);
        Ok(AtomHandle::Ghost(index))
    }

    /// Removes and returns the local atom `id`.
    pub fn remove_atom(&mut self, id: AtomId) -> Result<Atom, StorageError> {
        let index = self
            .atom_map
            .remove(&id)
            .ok_or(StorageError::UnknownAtom(id))?;
        let atom = self.atoms.swap_remove(index);
        if let Some(moved) = self.atoms.get(index) {
            self.atom_map.insert(moved.id, index);
        }
        Ok(atom)
    }

    pub fn clear_ghosts(&mut self) {
        self.ghosts.clear();
        self.ghost_map.clear();
    }

    /// Handle of the local atom `id`.
    pub fn find_atom(&self, id: AtomId) -> Option<AtomHandle> {
        self.atom_map.get(&id).map(|&i| AtomHandle::Local(i))
    }

    /// Handle of the first ghost copy of `id` received. When an atom is ghosted across several
    /// faces this is any one of its periodic images, not necessarily the nearest.
    pub fn find_ghost(&self, id: AtomId) -> Option<AtomHandle> {
        self.ghost_map.get(&id).map(|&i| AtomHandle::Ghost(i))
    }

    /// Handle of `id`, preferring the local atom over any ghost copy.
    pub fn find(&self, id: AtomId) -> Option<AtomHandle> {
        self.find_atom(id).or_else(|| self.find_ghost(id))
    }

    pub fn get(&self, handle: AtomHandle) -> &Atom {
        match handle {
            AtomHandle::Local(i) => &self.atoms[i],
            AtomHandle::Ghost(i) => &self.ghosts[i],
        }
    }

    pub fn get_mut(&mut self, handle: AtomHandle) -> &mut Atom {
        match handle {
            AtomHandle::Local(i) => &mut self.atoms[i],
            AtomHandle::Ghost(i) => &mut self.ghosts[i],
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn ghosts(&self) -> &[Atom] {
        &self.ghosts
    }

    pub fn ghosts_mut(&mut self) -> &mut [Atom] {
        &mut self.ghosts
    }

    /// Handles of every local atom followed by every ghost.
    pub fn handles(&self) -> impl Iterator<Item = AtomHandle> {
        (0..self.atoms.len())
            .map(AtomHandle::Local)
            .chain((0..self.ghosts.len()).map(AtomHandle::Ghost))
    }

    pub fn n_atom(&self) -> usize {
        self.atoms.len()
    }

    pub fn n_ghost(&self) -> usize {
        self.ghosts.len()
    }

    pub fn atom_capacity(&self) -> usize {
        self.atom_capacity
    }

    pub fn ghost_capacity(&self) -> usize {
        self.ghost_capacity
    }

    /// Total number of local atoms over all ranks.
    pub fn n_atom_total(&self, comm: &dyn Communicator) -> Result<usize, CommError> {
        comm.all_reduce_u64(self.atoms.len() as u64, ReduceOp::Sum)
            .map(|n| n as usize)
    }

    pub fn zero_forces(&mut self) {
        for atom in self.atoms.iter_mut().chain(self.ghosts.iter_mut()) {
            atom.force = Vector::ZERO;
        }
    }

    pub fn is_cartesian(&self) -> bool {
        self.is_cartesian
    }

    fn coordinate_name(&self) -> &'static str {
        if self.is_cartesian {
            CARTESIAN
        } else {
            GENERALIZED
        }
    }

    /// Fails unless the storage holds Cartesian coordinates.
    pub fn require_cartesian(&self) -> Result<(), StorageError> {
        if self.is_cartesian {
            Ok(())
        } else {
            Err(StorageError::WrongCoordinates {
                actual: GENERALIZED,
                required: CARTESIAN,
            })
        }
    }

    /// Fails unless the storage holds generalized coordinates.
    pub fn require_generalized(&self) -> Result<(), StorageError> {
        if self.is_cartesian {
            Err(StorageError::WrongCoordinates {
                actual: CARTESIAN,
                required: GENERALIZED,
            })
        } else {
            Ok(())
        }
    }

    /// Converts every local and ghost position from generalized to Cartesian coordinates.
    pub fn transform_gen_to_cart(&mut self, boundary: &Boundary) -> Result<(), StorageError> {
        self.require_generalized()?;
        for atom in self.atoms.iter_mut().chain(self.ghosts.iter_mut()) {
            atom.position = boundary.transform_gen_to_cart(atom.position);
        }
        self.is_cartesian = true;
        Ok(())
    }

    /// Converts every local and ghost position from Cartesian to generalized coordinates.
    pub fn transform_cart_to_gen(&mut self, boundary: &Boundary) -> Result<(), StorageError> {
        self.require_cartesian()?;
        for atom in self.atoms.iter_mut().chain(self.ghosts.iter_mut()) {
            atom.position = boundary.transform_cart_to_gen(atom.position);
        }
        self.is_cartesian = false;
        Ok(())
    }

    /// Records the current local positions as the reference for
    /// [`AtomStorage::max_sq_displacement`].
    pub fn make_snapshot(&mut self) -> Result<(), StorageError> {
        self.require_cartesian()?;
        self.snapshot = Some(self.atoms.iter().map(|a| a.position).collect());
        Ok(())
    }

    pub fn clear_snapshot(&mut self) {
        self.snapshot = None;
    }

    /// Largest squared displacement of any local atom since the last snapshot, on this rank.
    pub fn max_sq_displacement(&self) -> Result<f64, StorageError> {
        self.require_cartesian()?;
        let snapshot = match &self.snapshot {
            Some(s) if s.len() == self.atoms.len() => s,
            _ => return Err(StorageError::NoSnapshot),
        };
        Ok(self
            .atoms
            .iter()
            .zip(snapshot)
            .map(|(atom, old)| atom.position.distance_squared(*old))
            .fold(0.0, f64::max))
    }

    /// Checks id maps, ghost flags, and that local atoms lie inside `domain` while ghosts lie
    /// outside it.
    pub fn is_valid(&self, domain: &Domain) -> Result<(), StorageError> {
        if self.atom_map.len() != self.atoms.len() {
            return Err(StorageError::Invalid(format!(
                "{} local atoms but {} ids in map",
                self.atoms.len(),
                self.atom_map.len()
            )));
        }
        let to_gen = |r: Vector| {
            if self.is_cartesian {
                domain.boundary().transform_cart_to_gen(r)
            } else {
                r
            }
        };
        for (index, atom) in self.atoms.iter().enumerate() {
            if self.atom_map.get(&atom.id) != Some(&index) {
                return Err(StorageError::Invalid(format!(
                    "local atom {} is not mapped to slot {index}",
                    atom.id
                )));
            }
            if atom.is_ghost {
                return Err(StorageError::Invalid(format!(
                    "local atom {} is flagged as ghost",
                    atom.id
                )));
            }
            if !domain.is_in_domain(to_gen(atom.position)) {
                return Err(StorageError::Invalid(format!(
                    "local atom {} at {} ({} coordinates) is outside the domain",
                    atom.id,
                    atom.position,
                    self.coordinate_name()
                )));
            }
        }
        for (&id, &index) in &self.ghost_map {
            if self.ghosts.get(index).map(|g| g.id) != Some(id) {
                return Err(StorageError::Invalid(format!(
                    "ghost map entry {id} points at slot {index}"
                )));
            }
        }
        for ghost in &self.ghosts {
            if !ghost.is_ghost {
                return Err(StorageError::Invalid(format!(
                    "ghost atom {} is not flagged as ghost",
                    ghost.id
                )));
            }
            if domain.is_in_domain(to_gen(ghost.position)) {
                return Err(StorageError::Invalid(format!(
                    "ghost atom {} at {} is inside the domain",
                    ghost.id, ghost.position
                )));
            }
        }
        Ok(())
    }
}


// End of File
