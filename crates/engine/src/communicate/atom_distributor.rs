// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use comm::{receive_batches, BatchSender, BlockDataType, Communicator, MASTER};

use crate::{Atom, AtomStorage, Domain, ExchangeError};

/// Master-side loader that streams the initial atoms to every rank. Each rank keeps the atoms
/// whose position falls in its sub-domain. Positions are Cartesian and are wrapped into the
/// primary cell first.
pub struct AtomDistributor<'c> {
    sender: BatchSender<'c, Atom>,
    domain: &'c Domain,
}

impl<'c> AtomDistributor<'c> {
    pub fn new(
        comm: &'c dyn Communicator,
        domain: &'c Domain,
        cache_capacity: usize,
        buffer_capacity: usize,
    ) -> Self {
        Self {
            sender: BatchSender::new(
                comm,
                BlockDataType::Distribution,
                cache_capacity,
                buffer_capacity,
            ),
            domain,
        }
    }

    /// Queues `atom` for distribution, keeping it on the master if the master owns it.
    pub fn add(&mut self, mut atom: Atom, atoms: &mut AtomStorage) -> Result<(), ExchangeError> {
        atoms.require_cartesian()?;
        self.domain.boundary().shift(&mut atom.position);
        if is_owned(self.domain, &atom) {
            atoms.add_atom(atom.clone())?;
        }
        self.sender.push(atom)?;
        Ok(())
    }

    /// Flushes the cache and ends the stream. Returns the number of atoms distributed.
    pub fn send(self) -> Result<usize, ExchangeError> {
        Ok(self.sender.finish()?)
    }

    /// Receives the master's stream on any other rank, keeping the atoms this rank owns.
    /// Returns the number of atoms kept.
    pub fn receive(
        comm: &dyn Communicator,
        domain: &Domain,
        atoms: &mut AtomStorage,
    ) -> Result<usize, ExchangeError> {
        atoms.require_cartesian()?;
        let mut n_kept = 0;
        receive_batches(comm, MASTER, BlockDataType::Distribution, |batch: Vec<Atom>| {
            for atom in batch {
                if is_owned(domain, &atom) {
                    atoms.add_atom(atom)?;
                    n_kept += 1;
                }
            }
            Ok::<_, ExchangeError>(())
        })?;
        Ok(n_kept)
    }
}

fn is_owned(domain: &Domain, atom: &Atom) -> bool {
    domain.owner_rank(domain.boundary().transform_cart_to_gen(atom.position)) == domain.rank()
}

// End of File
