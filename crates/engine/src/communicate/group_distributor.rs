// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use comm::{receive_batches, BatchSender, BlockDataType, Communicator, MASTER};

use crate::{AtomStorage, Group, GroupError, GroupStorage};

/// Master-side loader that streams the initial bonded groups of one kind to every rank.
///
/// Atoms must have been distributed first: each rank, the master included, keeps exactly the
/// groups with at least one member that is local to it.
///
/// ```ignore
/// let mut distributor = GroupDistributor::new(comm, cache_capacity, buffer_capacity);
/// for (id, pair) in pairs.iter().enumerate() {
///     *distributor.new_ptr() = Bond::new(id, 0, *pair);
///     distributor.add(&mut bonds, &atoms)?;
/// }
/// let n_total = distributor.send()?;
/// ```
pub struct GroupDistributor<'c, const N: usize> {
    sender: BatchSender<'c, Group<N>>,
    pending: Option<Group<N>>,
}

impl<'c, const N: usize> GroupDistributor<'c, N> {
    /// Creates a distributor that broadcasts whenever `cache_capacity` groups are pending.
    pub fn new(comm: &'c dyn Communicator, cache_capacity: usize, buffer_capacity: usize) -> Self {
        Self {
            sender: BatchSender::new(
                comm,
                BlockDataType::Distribution,
                cache_capacity,
                buffer_capacity,
            ),
            pending: None,
        }
    }

    /// A fresh group slot to fill in before calling [`GroupDistributor::add`].
    pub fn new_ptr(&mut self) -> &mut Group<N> {
        self.pending.insert(Group::default())
    }

    /// Commits the group filled in through [`GroupDistributor::new_ptr`]: the master keeps it if
    /// one of its members is local here, and queues it for the other ranks.
    pub fn add(&mut self, storage: &mut GroupStorage<N>, atoms: &AtomStorage) -> Result<(), GroupError> {
        let Some(group) = self.pending.take() else {
            return Err(GroupError::Invalid {
                kind: storage.kind(),
                message: "add called without new_ptr".to_string(),
            });
        };
        if has_local_member(&group, atoms) {
            storage.add(group)?;
        }
        self.sender.push(group)?;
        Ok(())
    }

    /// Flushes the cache and ends the stream. Returns the number of groups distributed.
    pub fn send(self) -> Result<usize, GroupError> {
        Ok(self.sender.finish()?)
    }

    /// Receives the master's stream on any other rank, keeping groups with a local member.
    /// Returns the number of groups kept.
    pub fn receive(
        comm: &dyn Communicator,
        storage: &mut GroupStorage<N>,
        atoms: &AtomStorage,
    ) -> Result<usize, GroupError> {
        let mut n_kept = 0;
        receive_batches(comm, MASTER, BlockDataType::Distribution, |batch: Vec<Group<N>>| {
            for group in batch {
                if has_local_member(&group, atoms) {
                    storage.add(group)?;
                    n_kept += 1;
                }
            }
            Ok::<_, GroupError>(())
        })?;
        Ok(n_kept)
    }
}

fn has_local_member<const N: usize>(group: &Group<N>, atoms: &AtomStorage) -> bool {
    group.atom_ids.iter().any(|&id| atoms.find_atom(id).is_some())
}

// End of File
