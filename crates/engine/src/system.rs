// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use comm::{Communicator, ReduceOp};
use common::{Boundary, Vector};
use log::info;

use crate::{
    Angle, Atom, AtomDistributor, AtomStorage, Bond, CellList, Dihedral, Domain, ExchangeError,
    ExchangeReport, Exchanger, Group, GroupDistributor, GroupError, GroupExchanger, GroupKind,
    GroupStorage, StorageError,
};

/// Sizing and interaction range of one rank's [`System`].
#[derive(Debug, Clone)]
pub struct SystemConfig {
    /// Processes along each axis. Their product must equal the communicator size.
    pub grid: [usize; 3],
    /// Maximum number of local atoms per rank.
    pub atom_capacity: usize,
    /// Maximum number of ghost atoms per rank.
    pub ghost_capacity: usize,
    pub bond_capacity: usize,
    pub angle_capacity: usize,
    pub dihedral_capacity: usize,
    /// Maximum size in bytes of a single exchange or distribution message.
    pub buffer_capacity: usize,
    /// Items per broadcast batch while distributing the initial configuration.
    pub cache_capacity: usize,
    /// Largest pair interaction cutoff.
    pub cutoff: f64,
    /// Extra distance atoms may travel between exchanges. Ghosts and cells cover
    /// `cutoff + skin`.
    pub skin: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            grid: [1, 1, 1],
            atom_capacity: 10_000,
            ghost_capacity: 10_000,
            bond_capacity: 10_000,
            angle_capacity: 10_000,
            dihedral_capacity: 10_000,
            buffer_capacity: 1 << 24,
            cache_capacity: 1000,
            cutoff: 1.0,
            skin: 0.4,
        }
    }
}

impl SystemConfig {
    /// Range of ghosts and minimum cell length.
    pub fn pair_cutoff(&self) -> f64 {
        self.cutoff + self.skin
    }
}

/// Borrowed view of a [`System`] for force evaluation.
///
/// A bond member may be a local atom wrapped into the box or one of several ghost images, so
/// bonded separations must go through [`Boundary::separation`].
pub struct ForceParts<'a> {
    pub boundary: &'a Boundary,
    pub atoms: &'a mut AtomStorage,
    pub cell_list: &'a CellList,
    pub bonds: &'a GroupStorage<2>,
}

/// Everything one rank knows about the simulated system.
///
/// Atoms move in Cartesian coordinates between exchanges. [`System::exchange`] switches to
/// generalized coordinates for the duration of the exchange, rebuilds the cell list and takes a
/// new displacement snapshot. [`System::update`] only refreshes ghost positions.
pub struct System<'c> {
    comm: &'c dyn Communicator,
    config: SystemConfig,
    domain: Domain,
    atoms: AtomStorage,
    bonds: GroupStorage<2>,
    angles: GroupStorage<3>,
    dihedrals: GroupStorage<4>,
    group_kinds: Vec<GroupKind>,
    cell_list: CellList,
    exchanger: Exchanger,
    n_exchange: usize,
}

impl<'c> System<'c> {
    pub fn new(
        comm: &'c dyn Communicator,
        boundary: Boundary,
        config: SystemConfig,
    ) -> Result<Self, ExchangeError> {
        let domain = Domain::new(boundary, config.grid, comm.rank(), comm.size())?;
        let mut exchanger = Exchanger::new();
        exchanger.set_pair_cutoff(config.pair_cutoff());
        exchanger.allocate(&domain, config.buffer_capacity)?;

        let bounds = domain.cartesian_bounds();
        let mut cell_list = CellList::new();
        cell_list.allocate(
            config.atom_capacity + config.ghost_capacity,
            bounds.min,
            bounds.max,
            Vector::splat(config.pair_cutoff()),
        )?;

        Ok(Self {
            comm,
            domain,
            atoms: AtomStorage::new(config.atom_capacity, config.ghost_capacity),
            bonds: GroupStorage::new(GroupKind::Bond, config.bond_capacity),
            angles: GroupStorage::new(GroupKind::Angle, config.angle_capacity),
            dihedrals: GroupStorage::new(GroupKind::Dihedral, config.dihedral_capacity),
            group_kinds: Vec::new(),
            cell_list,
            exchanger,
            n_exchange: 0,
            config,
        })
    }

    /// Makes groups of `kind` travel with their atoms on every exchange.
    pub fn add_group_exchanger(&mut self, kind: GroupKind) {
        if !self.group_kinds.contains(&kind) {
            self.group_kinds.push(kind);
        }
    }

    pub fn comm(&self) -> &'c dyn Communicator {
        self.comm
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn boundary(&self) -> &Boundary {
        self.domain.boundary()
    }

    pub fn atoms(&self) -> &AtomStorage {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut AtomStorage {
        &mut self.atoms
    }

    pub fn bonds(&self) -> &GroupStorage<2> {
        &self.bonds
    }

    pub fn angles(&self) -> &GroupStorage<3> {
        &self.angles
    }

    pub fn dihedrals(&self) -> &GroupStorage<4> {
        &self.dihedrals
    }

    pub fn cell_list(&self) -> &CellList {
        &self.cell_list
    }

    pub fn exchanger(&self) -> &Exchanger {
        &self.exchanger
    }

    /// Mutable atoms alongside the read-only structures used to compute forces on them.
    pub fn force_parts(&mut self) -> ForceParts<'_> {
        ForceParts {
            boundary: self.domain.boundary(),
            atoms: &mut self.atoms,
            cell_list: &self.cell_list,
            bonds: &self.bonds,
        }
    }

    /// Number of completed exchanges.
    pub fn n_exchange(&self) -> usize {
        self.n_exchange
    }

    /// Distributes the initial atoms from the master. The master passes every atom; other ranks
    /// pass nothing. Returns the number of atoms over all ranks.
    pub fn distribute_atoms<I>(&mut self, atoms: I) -> Result<usize, ExchangeError>
    where
        I: IntoIterator<Item = Atom>,
    {
        let n_sent = if self.comm.is_master() {
            let mut distributor = AtomDistributor::new(
                self.comm,
                &self.domain,
                self.config.cache_capacity,
                self.config.buffer_capacity,
            );
            for atom in atoms {
                distributor.add(atom, &mut self.atoms)?;
            }
            distributor.send()?
        } else {
            AtomDistributor::receive(self.comm, &self.domain, &mut self.atoms)?;
            0
        };
        let n_total = self.atoms.n_atom_total(self.comm)?;
        if self.comm.is_master() && n_total != n_sent {
            return Err(ExchangeError::Storage(StorageError::Invalid(format!(
                "distributed {n_sent} atoms but ranks kept {n_total}"
            ))));
        }
        info!("rank {} holds {} of {} atoms", self.comm.rank(), self.atoms.n_atom(), n_total);
        Ok(n_total)
    }

    /// Distributes the initial bonds from the master, like [`System::distribute_atoms`].
    pub fn distribute_bonds<I>(&mut self, bonds: I) -> Result<usize, GroupError>
    where
        I: IntoIterator<Item = Bond>,
    {
        distribute_groups(self.comm, &self.config, &mut self.bonds, &self.atoms, bonds)
    }

    pub fn distribute_angles<I>(&mut self, angles: I) -> Result<usize, GroupError>
    where
        I: IntoIterator<Item = Angle>,
    {
        distribute_groups(self.comm, &self.config, &mut self.angles, &self.atoms, angles)
    }

    pub fn distribute_dihedrals<I>(&mut self, dihedrals: I) -> Result<usize, GroupError>
    where
        I: IntoIterator<Item = Dihedral>,
    {
        distribute_groups(
            self.comm,
            &self.config,
            &mut self.dihedrals,
            &self.atoms,
            dihedrals,
        )
    }

    /// Migrates atoms and groups, rebuilds ghosts and the cell list, and takes a fresh
    /// displacement snapshot. Atoms must be in Cartesian coordinates and stay so.
    pub fn exchange(&mut self) -> Result<ExchangeReport, ExchangeError> {
        let boundary = *self.domain.boundary();
        self.atoms.clear_snapshot();
        self.atoms.transform_cart_to_gen(&boundary)?;

        let mut groups: Vec<&mut dyn GroupExchanger> = Vec::with_capacity(self.group_kinds.len());
        let mut bonds = Some(&mut self.bonds);
        let mut angles = Some(&mut self.angles);
        let mut dihedrals = Some(&mut self.dihedrals);
        for kind in &self.group_kinds {
            let exchanger: Option<&mut dyn GroupExchanger> = match kind {
                GroupKind::Bond => bonds.take().map(|g| g as &mut dyn GroupExchanger),
                GroupKind::Angle => angles.take().map(|g| g as &mut dyn GroupExchanger),
                GroupKind::Dihedral => dihedrals.take().map(|g| g as &mut dyn GroupExchanger),
            };
            groups.extend(exchanger);
        }

        let report =
            self.exchanger
                .exchange(&self.domain, &mut self.atoms, &mut groups, self.comm)?;
        drop(groups);

        self.atoms.transform_gen_to_cart(&boundary)?;
        self.build_cell_list()?;
        self.atoms.make_snapshot()?;
        self.n_exchange += 1;
        Ok(report)
    }

    /// Refreshes ghost positions from their owners.
    pub fn update(&mut self) -> Result<(), ExchangeError> {
        self.exchanger.update(&self.domain, &mut self.atoms, self.comm)
    }

    /// True if any atom on any rank has moved more than half the skin since the last exchange.
    /// Must be called on every rank.
    pub fn needs_exchange(&self) -> Result<bool, ExchangeError> {
        let local = self.atoms.max_sq_displacement()?.sqrt();
        let max = self.comm.all_reduce_f64(local, ReduceOp::Max)?;
        Ok(max > 0.5 * self.config.skin)
    }

    /// Re-bins every local and ghost atom.
    pub fn build_cell_list(&mut self) -> Result<(), ExchangeError> {
        self.cell_list.clear();
        for handle in self.atoms.handles() {
            self.cell_list
                .place_atom(handle, self.atoms.get(handle).position)?;
        }
        self.cell_list.build();
        Ok(())
    }

    /// Checks atoms, every registered group kind and the cell list. Must be called on every
    /// rank.
    pub fn is_valid(&self) -> Result<(), ExchangeError> {
        let has_ghosts = self.exchanger.has_plan();
        let atoms = self.atoms.is_valid(&self.domain);
        let mut groups = Ok(());
        for kind in &self.group_kinds {
            let result = match kind {
                GroupKind::Bond => self.bonds.is_valid(&self.atoms, self.comm, has_ghosts),
                GroupKind::Angle => self.angles.is_valid(&self.atoms, self.comm, has_ghosts),
                GroupKind::Dihedral => self.dihedrals.is_valid(&self.atoms, self.comm, has_ghosts),
            };
            if groups.is_ok() {
                groups = result;
            }
        }
        atoms?;
        groups?;
        self.cell_list.is_valid()?;
        Ok(())
    }
}

fn distribute_groups<const N: usize, I>(
    comm: &dyn Communicator,
    config: &SystemConfig,
    storage: &mut GroupStorage<N>,
    atoms: &AtomStorage,
    groups: I,
) -> Result<usize, GroupError>
where
    I: IntoIterator<Item = Group<N>>,
{
    if comm.is_master() {
        let mut distributor =
            GroupDistributor::new(comm, config.cache_capacity, config.buffer_capacity);
        for group in groups {
            *distributor.new_ptr() = group;
            distributor.add(storage, atoms)?;
        }
        distributor.send()
    } else {
        GroupDistributor::receive(comm, storage, atoms)?;
        Ok(0)
    }
}

// End of File
