// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use comm::{Communicator, ReduceOp};
use common::ids::{AtomId, GroupId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{AtomHandle, AtomStorage, Group, GroupError, GroupKind};

/// The bonded groups of one kind that involve at least one local atom of this rank.
///
/// Each group carries a cached handle per member, resolved against the [`AtomStorage`] by
/// [`GroupStorage::repair_handles`] after every exchange. A member that is neither local nor a
/// ghost has no handle and makes its group incomplete.
#[derive(Debug)]
pub struct GroupStorage<const N: usize> {
    kind: GroupKind,
    groups: Vec<Group<N>>,
    handles: Vec<[Option<AtomHandle>; N]>,
    map: FxHashMap<GroupId, usize>,
    capacity: usize,
    n_incomplete: usize,
}

impl<const N: usize> GroupStorage<N> {
    pub fn new(kind: GroupKind, capacity: usize) -> Self {
        debug_assert_eq!(kind.n_atom(), N);
        Self {
            kind,
            groups: Vec::with_capacity(capacity),
            handles: Vec::with_capacity(capacity),
            map: FxHashMap::default(),
            capacity,
            n_incomplete: 0,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups with at least one member that did not resolve at the last repair.
    pub fn n_incomplete(&self) -> usize {
        self.n_incomplete
    }

    /// Adds `group` with unresolved handles.
    pub fn add(&mut self, group: Group<N>) -> Result<(), GroupError> {
        if self.map.contains_key(&group.id) {
            return Err(GroupError::Duplicate {
                kind: self.kind,
                id: group.id,
            });
        }
        if self.groups.len() == self.capacity {
            return Err(GroupError::CapacityExceeded {
                kind: self.kind,
                capacity: self.capacity,
            });
        }
        self.map.insert(group.id, self.groups.len());
        self.groups.push(group);
        self.handles.push([None; N]);
        Ok(())
    }

    /// Adds `group` unless a group with the same id is already stored. Returns true if it was
    /// added.
    pub fn insert_if_absent(&mut self, group: Group<N>) -> Result<bool, GroupError> {
        if self.map.contains_key(&group.id) {
            return Ok(false);
        }
        self.add(group).map(|()| true)
    }

    pub fn remove(&mut self, id: GroupId) -> Option<Group<N>> {
        let index = self.map.remove(&id)?;
        let group = self.groups.swap_remove(index);
        self.handles.swap_remove(index);
        if let Some(moved) = self.groups.get(index) {
            self.map.insert(moved.id, index);
        }
        Some(group)
    }

    pub fn find(&self, id: GroupId) -> Option<&Group<N>> {
        self.map.get(&id).map(|&i| &self.groups[i])
    }

    pub fn groups(&self) -> &[Group<N>] {
        &self.groups
    }

    /// Groups paired with their cached member handles.
    pub fn iter(&self) -> impl Iterator<Item = (&Group<N>, &[Option<AtomHandle>; N])> {
        self.groups.iter().zip(self.handles.iter())
    }

    /// Copies of every group with at least one member in `ids`.
    pub fn groups_containing(&self, ids: &FxHashSet<AtomId>) -> Vec<Group<N>> {
        self.groups
            .iter()
            .filter(|g| g.atom_ids.iter().any(|id| ids.contains(id)))
            .copied()
            .collect()
    }

    /// Drops every group none of whose members is local. Returns the number dropped.
    pub fn remove_nonlocal(&mut self, atoms: &AtomStorage) -> usize {
        let before = self.groups.len();
        let mut index = 0;
        while index < self.groups.len() {
            if n_local(&self.groups[index], atoms) == 0 {
                let id = self.groups[index].id;
                self.remove(id);
            } else {
                index += 1;
            }
        }
        before - self.groups.len()
    }

    /// Resolves every member handle, local atoms first, then ghosts. Returns the number of
    /// incomplete groups.
    ///
    /// A resolved member is some periodic image of the atom, so geometry computed from the
    /// handles must use minimum-image separations.
    pub fn repair_handles(&mut self, atoms: &AtomStorage) -> usize {
        self.n_incomplete = 0;
        for (group, handles) in self.groups.iter().zip(self.handles.iter_mut()) {
            let mut complete = true;
            for (handle, &id) in handles.iter_mut().zip(group.atom_ids.iter()) {
                *handle = atoms.find(id);
                complete &= handle.is_some();
            }
            if !complete {
                self.n_incomplete += 1;
            }
        }
        self.n_incomplete
    }

    /// Total number of distinct groups over all ranks. Each group is counted on the rank that
    /// owns its first member, which always stores it.
    pub fn n_total(&self, atoms: &AtomStorage, comm: &dyn Communicator) -> Result<usize, GroupError> {
        let n_owned = self
            .groups
            .iter()
            .filter(|g| atoms.find_atom(g.atom_ids[0]).is_some())
            .count();
        Ok(comm.all_reduce_u64(n_owned as u64, ReduceOp::Sum)? as usize)
    }

    /// Checks this rank's groups, then the global invariant that each group is stored
    /// everywhere one of its members is local.
    ///
    /// Locally, every group must have a local member and consistent cached handles; with
    /// `has_ghosts`, every member must also resolve. Globally, the local member counts summed
    /// over all groups and ranks must equal `N` times the number of distinct groups. Must be
    /// called on every rank.
    pub fn is_valid(
        &self,
        atoms: &AtomStorage,
        comm: &dyn Communicator,
        has_ghosts: bool,
    ) -> Result<(), GroupError> {
        let local = self.check_local(atoms, has_ghosts);
        let n_local_members: usize = self.groups.iter().map(|g| n_local(g, atoms)).sum();
        let n_members = comm.all_reduce_u64(n_local_members as u64, ReduceOp::Sum)? as usize;
        let n_total = self.n_total(atoms, comm)?;
        local?;
        if n_members != N * n_total {
            return Err(self.invalid(format!(
                "{} local members over all ranks, expected {} x {}",
                n_members, N, n_total
            )));
        }
        Ok(())
    }

    fn check_local(&self, atoms: &AtomStorage, has_ghosts: bool) -> Result<(), GroupError> {
        if self.map.len() != self.groups.len() {
            return Err(self.invalid(format!(
                "{} groups but {} ids in map",
                self.groups.len(),
                self.map.len()
            )));
        }
        for (group, handles) in self.iter() {
            if n_local(group, atoms) == 0 {
                return Err(self.invalid(format!("group {} has no local member", group.id)));
            }
            for (&id, &handle) in group.atom_ids.iter().zip(handles.iter()) {
                let found = atoms.find(id);
                if has_ghosts && found.is_none() {
                    return Err(self.invalid(format!(
                        "atom {id} of group {} is neither local nor ghost",
                        group.id
                    )));
                }
                if handle.is_some() && handle != found {
                    return Err(self.invalid(format!(
                        "stale handle for atom {id} of group {}",
                        group.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn invalid(&self, message: String) -> GroupError {
        GroupError::Invalid {
            kind: self.kind,
            message,
        }
    }
}

fn n_local<const N: usize>(group: &Group<N>, atoms: &AtomStorage) -> usize {
    group
        .atom_ids
        .iter()
        .filter(|&&id| atoms.find_atom(id).is_some())
        .count()
}


// End of File
