// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! Random initial configurations, built on the master before distribution.

use common::{Boundary, Vector};
use engine::{Atom, Bond};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal, UnitSphere};

use crate::{config::InitialConfig, potential::BondPotential, ConfigError};

/// Linear chains of `chain_length` atoms grown as random walks from random starting points.
/// Bond lengths follow the bond potential at the target temperature and velocities a
/// Maxwell-Boltzmann distribution with zero total momentum. Positions are not wrapped into the
/// box.
pub fn polymer_melt(
    system: &InitialConfig,
    bond_potential: &BondPotential,
    boundary: &Boundary,
) -> Result<(Vec<Atom>, Vec<Bond>), ConfigError> {
    let mut rng = StdRng::seed_from_u64(system.seed);
    let speed = Normal::new(0.0, (system.temperature / system.mass).sqrt())
        .map_err(|err| ConfigError::invalid("system", err.to_string()))?;
    let beta = 1.0 / system.temperature;

    let mut atoms = Vec::with_capacity(system.n_atom());
    let mut bonds = Vec::with_capacity(system.n_bond());
    for molecule in 0..system.n_molecule {
        let mut position = boundary.random_position(&mut rng);
        for i in 0..system.chain_length {
            let id = atoms.len();
            if i > 0 {
                let direction = Vector::from_array(UnitSphere.sample(&mut rng));
                position += direction * bond_potential.random_bond_length(&mut rng, beta, 0);
                bonds.push(Bond::new(bonds.len(), 0, [id - 1, id]));
            }
            let mut atom = Atom::new(id, (molecule + i) % system.n_atom_type, position);
            atom.velocity = Vector::new(
                speed.sample(&mut rng),
                speed.sample(&mut rng),
                speed.sample(&mut rng),
            );
            atoms.push(atom);
        }
    }

    let drift = atoms.iter().map(|a| a.velocity).sum::<Vector>() / atoms.len().max(1) as f64;
    for atom in atoms.iter_mut() {
        atom.velocity -= drift;
    }
    Ok((atoms, bonds))
}


// End of File
