// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use std::ops::Range;

use comm::{BlockDataType, Communicator, RecvBuffer, SendBuffer};
use common::{ids::AtomId, Vector, DIMENSION};
use log::debug;
use rustc_hash::FxHashSet;

use crate::{Atom, AtomHandle, AtomStorage, Direction, Domain, ExchangeError, GroupExchanger};

/// What one rank sends across one face during ghost construction, recorded so
/// [`Exchanger::update`] can resend fresh positions in the same order.
#[derive(Clone, Debug, Default)]
struct GhostPlan {
    /// Local atoms and earlier ghosts sent across this face.
    handles: Vec<AtomHandle>,
    /// Periodic shift applied along the axis, in box lengths.
    shift: f64,
    /// Ghost slots filled by the matching receive.
    received: Range<usize>,
}

/// Counters from one call to [`Exchanger::exchange`], for this rank.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeReport {
    /// Atoms that left this rank.
    pub n_sent: usize,
    /// Atoms that arrived on this rank.
    pub n_received: usize,
    /// Groups packed alongside departing atoms.
    pub n_group_sent: usize,
    /// Ghosts present after the exchange.
    pub n_ghost: usize,
    /// Groups with a member that is neither local nor ghost.
    pub n_incomplete: usize,
}

/// Keeps atom ownership, ghosts and bonded groups consistent with the domain decomposition.
///
/// [`Exchanger::exchange`] runs with generalized coordinates. It first moves every atom that
/// has left this rank's sub-domain to the face neighbor in that direction, one axis at a time,
/// so an atom crossing an edge or corner reaches its owner through successive axes within the
/// same call. It then rebuilds ghosts: along each axis in turn, atoms within the pair cutoff of
/// a face (including ghosts received along earlier axes) are copied to the neighbor across
/// it. The send lists are kept so that [`Exchanger::update`], which runs with Cartesian
/// coordinates, can refresh ghost positions without rebuilding them.
///
/// Every rank visits axes in the order x, y, z and faces in the order down, up, and every send
/// is matched by a receive from the opposite neighbor, so no step can deadlock.
#[derive(Debug, Default)]
pub struct Exchanger {
    pair_cutoff: f64,
    buffer_capacity: usize,
    plans: [[GhostPlan; 2]; DIMENSION],
    is_allocated: bool,
    has_plan: bool,
}

impl Exchanger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ghost range: the largest pair cutoff plus the neighbor skin.
    pub fn set_pair_cutoff(&mut self, pair_cutoff: f64) {
        self.pair_cutoff = pair_cutoff;
        self.is_allocated = false;
    }

    pub fn pair_cutoff(&self) -> f64 {
        self.pair_cutoff
    }

    /// Checks the cutoff against the decomposition and sets the size limit of each message.
    pub fn allocate(&mut self, domain: &Domain, buffer_capacity: usize) -> Result<(), ExchangeError> {
        domain.check_cutoff(self.pair_cutoff)?;
        self.buffer_capacity = buffer_capacity;
        self.is_allocated = true;
        Ok(())
    }

    /// True once an exchange has recorded the ghost send plan.
    pub fn has_plan(&self) -> bool {
        self.has_plan
    }

    /// Migrates atoms and groups to their owners and rebuilds all ghosts. `atoms` must hold
    /// generalized coordinates. Must be called on every rank.
    pub fn exchange(
        &mut self,
        domain: &Domain,
        atoms: &mut AtomStorage,
        groups: &mut [&mut dyn GroupExchanger],
        comm: &dyn Communicator,
    ) -> Result<ExchangeReport, ExchangeError> {
        if !self.is_allocated {
            return Err(ExchangeError::NotAllocated);
        }
        atoms.require_generalized()?;
        atoms.clear_ghosts();
        self.has_plan = false;

        let mut report = ExchangeReport::default();
        self.migrate(domain, atoms, groups, comm, &mut report)?;
        if let Some(atom) = atoms.atoms().iter().find(|a| !domain.is_in_domain(a.position)) {
            return Err(ExchangeError::AtomOutsideDomain {
                id: atom.id,
                position: atom.position,
                rank: domain.rank(),
            });
        }

        self.make_ghosts(domain, atoms, comm)?;
        report.n_ghost = atoms.n_ghost();
        for group in groups.iter_mut() {
            report.n_incomplete += group.finish_exchange(atoms);
        }
        self.has_plan = true;

        debug!(
            "exchange: {} atoms out, {} in, {} groups out, {} local, {} ghosts, {} incomplete groups",
            report.n_sent,
            report.n_received,
            report.n_group_sent,
            atoms.n_atom(),
            report.n_ghost,
            report.n_incomplete
        );
        Ok(report)
    }

    fn migrate(
        &self,
        domain: &Domain,
        atoms: &mut AtomStorage,
        groups: &mut [&mut dyn GroupExchanger],
        comm: &dyn Communicator,
        report: &mut ExchangeReport,
    ) -> Result<(), ExchangeError> {
        let boundary = *domain.boundary();
        for axis in 0..DIMENSION {
            // A single process along this axis owns the whole periodic extent.
            if domain.grid_dimension(axis) == 1 {
                for atom in atoms.atoms_mut() {
                    boundary.shift_gen_axis(&mut atom.position, axis);
                }
                continue;
            }
            let my_index = domain.grid_index()[axis];
            for direction in Direction::ALL {
                let leaving: Vec<AtomId> = atoms
                    .atoms()
                    .iter()
                    .filter(|a| {
                        let index = domain.grid_coordinate(a.position, axis);
                        match direction {
                            Direction::Down => index < my_index,
                            Direction::Up => index > my_index,
                        }
                    })
                    .map(|a| a.id)
                    .collect();
                let mut outgoing = Vec::with_capacity(leaving.len());
                for &id in &leaving {
                    outgoing.push(atoms.remove_atom(id)?);
                }
                let leaving: FxHashSet<AtomId> = leaving.into_iter().collect();

                let mut buffer = SendBuffer::new(self.buffer_capacity);
                buffer.pack(BlockDataType::Atom, &outgoing)?;
                for group in groups.iter() {
                    report.n_group_sent += group.pack_groups(&leaving, &mut buffer)?;
                }
                report.n_sent += outgoing.len();

                let bytes = comm.send_recv(
                    domain.neighbor_rank(axis, direction),
                    buffer.into_bytes(),
                    domain.neighbor_rank(axis, direction.opposite()),
                )?;
                let mut buffer = RecvBuffer::new(bytes);
                let incoming: Vec<Atom> = buffer.unpack(BlockDataType::Atom)?;
                for group in groups.iter_mut() {
                    group.unpack_groups(&mut buffer)?;
                }
                buffer.finish()?;

                report.n_received += incoming.len();
                for mut atom in incoming {
                    boundary.shift_gen_axis(&mut atom.position, axis);
                    atoms.add_atom(atom)?;
                }
            }
        }
        Ok(())
    }

    fn make_ghosts(
        &mut self,
        domain: &Domain,
        atoms: &mut AtomStorage,
        comm: &dyn Communicator,
    ) -> Result<(), ExchangeError> {
        let bounds = domain.bounds();
        for axis in 0..DIMENSION {
            let cutoff = self.pair_cutoff / domain.boundary().length(axis);
            let last_index = domain.grid_dimension(axis) as i32 - 1;
            let my_index = domain.grid_index()[axis];
            // Ghosts received along this axis are not forwarded along it.
            let n_ghost_prior = atoms.n_ghost();
            for direction in Direction::ALL {
                let handles: Vec<AtomHandle> = (0..atoms.n_atom())
                    .map(AtomHandle::Local)
                    .chain((0..n_ghost_prior).map(AtomHandle::Ghost))
                    .filter(|&h| {
                        let x = atoms.get(h).position[axis];
                        match direction {
                            Direction::Down => x < bounds.min[axis] + cutoff,
                            Direction::Up => x >= bounds.max[axis] - cutoff,
                        }
                    })
                    .collect();
                let shift = match direction {
                    Direction::Down if my_index == 0 => 1.0,
                    Direction::Up if my_index == last_index => -1.0,
                    _ => 0.0,
                };
                let outgoing: Vec<Atom> = handles
                    .iter()
                    .map(|&h| {
                        let mut atom = atoms.get(h).clone();
                        atom.position[axis] += shift;
                        atom
                    })
                    .collect();

                let mut buffer = SendBuffer::new(self.buffer_capacity);
                buffer.pack(BlockDataType::Ghost, &outgoing)?;
                let bytes = comm.send_recv(
                    domain.neighbor_rank(axis, direction),
                    buffer.into_bytes(),
                    domain.neighbor_rank(axis, direction.opposite()),
                )?;
                let mut buffer = RecvBuffer::new(bytes);
                let incoming: Vec<Atom> = buffer.unpack(BlockDataType::Ghost)?;
                buffer.finish()?;

                let begin = atoms.n_ghost();
                for ghost in incoming {
                    atoms.add_ghost(ghost)?;
                }
                self.plans[axis][direction.index()] = GhostPlan {
                    handles,
                    shift,
                    received: begin..atoms.n_ghost(),
                };
            }
        }
        Ok(())
    }

    /// Refreshes every ghost position from its owner, using the send plan of the last exchange.
    /// `atoms` must hold Cartesian coordinates. Must be called on every rank.
    pub fn update(
        &self,
        domain: &Domain,
        atoms: &mut AtomStorage,
        comm: &dyn Communicator,
    ) -> Result<(), ExchangeError> {
        if !self.has_plan {
            return Err(ExchangeError::NoPlan);
        }
        atoms.require_cartesian()?;
        for axis in 0..DIMENSION {
            let length = domain.boundary().length(axis);
            for direction in Direction::ALL {
                let plan = &self.plans[axis][direction.index()];
                let shift = plan.shift * length;
                let positions: Vec<Vector> = plan
                    .handles
                    .iter()
                    .map(|&h| {
                        let mut position = atoms.get(h).position;
                        position[axis] += shift;
                        position
                    })
                    .collect();

                let mut buffer = SendBuffer::new(self.buffer_capacity);
                buffer.pack(BlockDataType::Update, &positions)?;
                let source = domain.neighbor_rank(axis, direction.opposite());
                let bytes =
                    comm.send_recv(domain.neighbor_rank(axis, direction), buffer.into_bytes(), source)?;
                let mut buffer = RecvBuffer::new(bytes);
                let incoming: Vec<Vector> = buffer.unpack(BlockDataType::Update)?;
                buffer.finish()?;

                if incoming.len() != plan.received.len() {
                    return Err(ExchangeError::GhostCountMismatch {
                        source_rank: source,
                        expected: plan.received.len(),
                        received: incoming.len(),
                    });
                }
                let ghosts = &mut atoms.ghosts_mut()[plan.received.clone()];
                for (ghost, position) in ghosts.iter_mut().zip(incoming) {
                    ghost.position = position;
                }
            }
        }
        Ok(())
    }
}

// End of File
