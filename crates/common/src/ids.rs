// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

/// Global identifier of an atom. Unique across the whole system, never reused.
pub type AtomId = usize;

/// Global identifier of a bonded group (bond, angle or dihedral), unique within its kind.
pub type GroupId = usize;

/// Index into the atom or interaction type tables.
pub type TypeId = usize;

/// Index of a process in the communicator.
pub type Rank = usize;

// End of File
