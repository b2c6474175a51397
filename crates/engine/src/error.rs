// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use comm::{BufferError, CommError};
use common::{
    ids::{AtomId, GroupId, Rank},
    Vector,
};
use thiserror::Error;

use crate::GroupKind;

/// Invalid decomposition settings. Raised once, at setup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Every axis needs at least one process.
    #[error("process grid {grid:?} has an empty axis")]
    EmptyGrid { grid: [usize; 3] },

    /// The communicator does not have one rank per sub-domain.
    #[error("process grid {grid:?} needs {expected} ranks, communicator has {size}")]
    SizeMismatch {
        grid: [usize; 3],
        expected: usize,
        size: usize,
    },

    /// A sub-domain is narrower than the interaction range, so ghosts would have to come from
    /// beyond the nearest neighbor.
    #[error("sub-domain width {width} along axis {axis} is smaller than the cutoff {cutoff}")]
    CutoffTooLarge { axis: usize, width: f64, cutoff: f64 },

    /// The pair cutoff must be strictly positive.
    #[error("invalid pair cutoff {0}")]
    InvalidCutoff(f64),
}

/// Failures of local or ghost atom storage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// More atoms of one kind than the storage was sized for.
    #[error("{what} capacity of {capacity} exceeded")]
    CapacityExceeded { what: &'static str, capacity: usize },

    /// An atom id was added twice as a local atom.
    #[error("atom {0} is already stored as a local atom")]
    DuplicateAtom(AtomId),

    /// The requested local atom does not exist.
    #[error("atom {0} is not a local atom")]
    UnknownAtom(AtomId),

    /// An operation required the other coordinate system.
    #[error("atom coordinates are {actual}, operation requires {required}")]
    WrongCoordinates {
        actual: &'static str,
        required: &'static str,
    },

    /// [`AtomStorage::max_sq_displacement`](crate::AtomStorage::max_sq_displacement) was called
    /// without a matching snapshot.
    #[error("no valid position snapshot")]
    NoSnapshot,

    /// A consistency check failed.
    #[error("invalid atom storage: {0}")]
    Invalid(String),
}

/// Failures of the cell list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellListError {
    /// The region is thinner than one cell along some axis.
    #[error("cell list region of width {width} along axis {axis} is smaller than the cutoff {cutoff}")]
    RegionTooSmall { axis: usize, width: f64, cutoff: f64 },

    /// More atoms placed than the list was allocated for.
    #[error("cell list capacity of {0} atoms exceeded")]
    CapacityExceeded(usize),

    /// Pairs or cells were requested before [`CellList::build`](crate::CellList::build).
    #[error("cell list has not been built")]
    NotBuilt,

    /// A consistency check failed.
    #[error("invalid cell list: {0}")]
    Invalid(String),
}

/// Failures of bonded group storage and distribution.
#[derive(Error, Debug)]
pub enum GroupError {
    /// More groups than the storage was sized for.
    #[error("{kind:?} storage capacity of {capacity} exceeded")]
    CapacityExceeded { kind: GroupKind, capacity: usize },

    /// A group id was added twice.
    #[error("{kind:?} {id} is already stored")]
    Duplicate { kind: GroupKind, id: GroupId },

    /// A consistency check failed.
    #[error("invalid {kind:?} storage: {message}")]
    Invalid { kind: GroupKind, message: String },

    #[error(transparent)]
    Comm(#[from] CommError),
}

/// Fatal failures of the exchange and update protocols.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// An atom could not be placed on its owner within one exchange. It has moved more than
    /// one sub-domain since the previous exchange.
    #[error("atom {id} at {position} is outside the domain of rank {rank} after exchange")]
    AtomOutsideDomain {
        id: AtomId,
        position: Vector,
        rank: Rank,
    },

    /// A neighbor sent a different number of ghost positions than it sent ghosts at the last
    /// exchange.
    #[error("ghost update from rank {source_rank} carried {received} positions, expected {expected}")]
    GhostCountMismatch {
        source_rank: Rank,
        expected: usize,
        received: usize,
    },

    /// [`Exchanger::update`](crate::Exchanger::update) was called before any exchange.
    #[error("ghost update requested before the first exchange")]
    NoPlan,

    /// [`Exchanger::exchange`](crate::Exchanger::exchange) was called before
    /// [`Exchanger::allocate`](crate::Exchanger::allocate).
    #[error("exchanger used before allocation")]
    NotAllocated,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error(transparent)]
    CellList(#[from] CellListError),

    #[error(transparent)]
    Comm(#[from] CommError),
}

impl From<BufferError> for ExchangeError {
    fn from(err: BufferError) -> Self {
        ExchangeError::Comm(CommError::Buffer(err))
    }
}

impl From<BufferError> for GroupError {
    fn from(err: BufferError) -> Self {
        GroupError::Comm(CommError::Buffer(err))
    }
}

// End of File
