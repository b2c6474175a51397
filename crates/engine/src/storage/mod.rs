// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

mod atom_storage;
mod group_storage;

pub use atom_storage::AtomStorage;
pub use group_storage::GroupStorage;

// End of File
