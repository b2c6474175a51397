// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use comm::{BlockDataType, RecvBuffer, SendBuffer};
use common::ids::AtomId;
use rustc_hash::FxHashSet;

use crate::{AtomStorage, Group, GroupError, GroupKind, GroupStorage};

/// A bonded group storage that takes part in atom migration.
///
/// During an exchange, every group containing a migrating atom is packed into the same message
/// as the atom, and the receiver stores each group it does not already hold. Once all atoms
/// have settled and ghosts are in place, groups without a local member are dropped and member
/// handles are re-resolved.
pub trait GroupExchanger {
    fn kind(&self) -> GroupKind;

    /// Packs one block with every stored group that contains an atom in `atom_ids`. Returns the
    /// number of groups packed.
    fn pack_groups(
        &self,
        atom_ids: &FxHashSet<AtomId>,
        buffer: &mut SendBuffer,
    ) -> Result<usize, GroupError>;

    /// Unpacks the block written by [`GroupExchanger::pack_groups`] on the sending rank.
    /// Returns the number of groups that were new to this rank.
    fn unpack_groups(&mut self, buffer: &mut RecvBuffer) -> Result<usize, GroupError>;

    /// Drops groups with no local member and repairs member handles. Returns the number of
    /// incomplete groups.
    fn finish_exchange(&mut self, atoms: &AtomStorage) -> usize;
}

impl<const N: usize> GroupExchanger for GroupStorage<N> {
    fn kind(&self) -> GroupKind {
        GroupStorage::kind(self)
    }

    fn pack_groups(
        &self,
        atom_ids: &FxHashSet<AtomId>,
        buffer: &mut SendBuffer,
    ) -> Result<usize, GroupError> {
        let groups = self.groups_containing(atom_ids);
        buffer.pack(BlockDataType::Group(self.kind().block_tag()), &groups)?;
        Ok(groups.len())
    }

    fn unpack_groups(&mut self, buffer: &mut RecvBuffer) -> Result<usize, GroupError> {
        let groups: Vec<Group<N>> = buffer.unpack(BlockDataType::Group(self.kind().block_tag()))?;
        let mut n_new = 0;
        for group in groups {
            if self.insert_if_absent(group)? {
                n_new += 1;
            }
        }
        Ok(n_new)
    }

    fn finish_exchange(&mut self, atoms: &AtomStorage) -> usize {
        self.remove_nonlocal(atoms);
        self.repair_handles(atoms)
    }
}

// End of File
