// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

mod atom_distributor;
mod exchanger;
mod group_distributor;
mod group_exchanger;

pub use atom_distributor::AtomDistributor;
pub use exchanger::{ExchangeReport, Exchanger};
pub use group_distributor::GroupDistributor;
pub use group_exchanger::GroupExchanger;

// End of File
