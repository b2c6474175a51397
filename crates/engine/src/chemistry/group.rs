// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use common::ids::{AtomId, GroupId, TypeId};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// A bonded interaction between `N` atoms, addressed by global atom ids so it stays meaningful
/// on any rank.
#[serde_as]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group<const N: usize> {
    pub id: GroupId,
    pub type_id: TypeId,
    #[serde_as(as = "[_; N]")]
    pub atom_ids: [AtomId; N],
}

impl<const N: usize> Group<N> {
    pub fn new(id: GroupId, type_id: TypeId, atom_ids: [AtomId; N]) -> Self {
        Self {
            id,
            type_id,
            atom_ids,
        }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atom_ids.contains(&atom_id)
    }
}

impl<const N: usize> Default for Group<N> {
    fn default() -> Self {
        Self {
            id: 0,
            type_id: 0,
            atom_ids: [0; N],
        }
    }
}

pub type Bond = Group<2>;
pub type Angle = Group<3>;
pub type Dihedral = Group<4>;

/// The kinds of bonded groups a system can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    Bond,
    Angle,
    Dihedral,
}

impl GroupKind {
    pub const ALL: [GroupKind; 3] = [GroupKind::Bond, GroupKind::Angle, GroupKind::Dihedral];

    /// Number of atoms per group.
    pub fn n_atom(self) -> usize {
        match self {
            GroupKind::Bond => 2,
            GroupKind::Angle => 3,
            GroupKind::Dihedral => 4,
        }
    }

    /// Tag distinguishing the blocks of this kind inside an exchange message.
    pub fn block_tag(self) -> u8 {
        self as u8
    }
}

// End of File
