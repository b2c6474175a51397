// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use common::{
    ids::{AtomId, TypeId},
    Vector,
};
use serde::{Deserialize, Serialize};

/// A point particle.
///
/// Whether `position` is Cartesian or generalized is a property of the storage holding the atom,
/// not of the atom. Forces are per-rank scratch data and never travel with the atom.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: AtomId,
    pub type_id: TypeId,
    pub position: Vector,
    pub velocity: Vector,
    #[serde(skip)]
    pub force: Vector,
    #[serde(skip)]
    pub is_ghost: bool,
}

impl Atom {
    pub fn new(id: AtomId, type_id: TypeId, position: Vector) -> Self {
        Self {
            id,
            type_id,
            position,
            ..Default::default()
        }
    }
}

/// Index of an atom inside one rank's [`AtomStorage`](crate::AtomStorage).
///
/// Handles are only meaningful until the next exchange, which reorders local atoms and
/// replaces every ghost. Anything caching handles across an exchange must re-resolve them
/// by atom id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtomHandle {
    Local(usize),
    Ghost(usize),
}

impl AtomHandle {
    pub fn is_ghost(self) -> bool {
        matches!(self, AtomHandle::Ghost(_))
    }
}

// End of File
