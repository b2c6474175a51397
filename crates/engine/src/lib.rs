// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! # Spatial decomposition core
//!
//! The simulation box is split into a regular `P0 x P1 x P2` grid of sub-domains, one per rank.
//! Each rank owns the atoms inside its sub-domain ("local" atoms) and holds read-only copies of
//! atoms within one interaction range outside it ("ghost" atoms), so short-range forces can be
//! evaluated without further communication.
//!
//! * [`Domain`] maps positions to owning ranks and ranks to face neighbors.
//! * [`AtomStorage`] holds local and ghost atoms of one rank, addressed by [`AtomHandle`].
//! * [`GroupStorage`] holds bonds, angles and dihedrals with at least one local member.
//! * [`CellList`] bins local and ghost atoms for pair enumeration.
//! * [`Exchanger`] migrates atoms and their groups to new owners, rebuilds ghosts, and refreshes
//!   ghost positions between rebuilds.
//! * [`System`] ties all of the above together for one rank.

pub mod chemistry;
pub mod communicate;
mod domain;
mod error;
pub mod neighbor;
pub mod storage;
mod system;

pub use chemistry::{Angle, Atom, AtomHandle, Bond, Dihedral, Group, GroupKind};
pub use communicate::{
    AtomDistributor, ExchangeReport, Exchanger, GroupDistributor, GroupExchanger,
};
pub use domain::{Direction, Domain};
pub use error::{CellListError, DomainError, ExchangeError, GroupError, StorageError};
pub use neighbor::CellList;
pub use storage::{AtomStorage, GroupStorage};
pub use system::{ForceParts, System, SystemConfig};

// End of File
