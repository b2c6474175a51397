// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! Velocity-Verlet NVE integration over a decomposed [`System`].
//!
//! Each step refreshes ghosts with [`System::update`] unless some atom moved more than half the
//! skin since the last exchange, in which case the step runs a full [`System::exchange`].

use comm::{Communicator, ReduceOp};
use engine::{ForceParts, System};
use log::{debug, info};

use crate::{
    config::IntegratorConfig,
    context::RunContext,
    potential::{BondPotential, PairPotential},
    RunError,
};

/// Energies and virial of the local share of the system. Pairs with a ghost count half, bonds
/// in proportion to their local members, so sums over ranks give totals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Energies {
    pub pair: f64,
    pub bond: f64,
    /// Sum of `r_ij . f_ij` over pair and bond interactions.
    pub virial: f64,
}

/// Global thermodynamic state at one step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Thermo {
    pub step: usize,
    pub kinetic: f64,
    pub pair: f64,
    pub bond: f64,
    pub temperature: f64,
    pub virial: f64,
    /// Instantaneous pressure, `(2 K + W) / 3 V`.
    pub pressure: f64,
}

impl Thermo {
    pub fn total(&self) -> f64 {
        self.kinetic + self.pair + self.bond
    }
}

/// Overwrites the forces on local atoms and returns the local energies. Ghost forces are
/// left untouched.
pub fn compute_forces(
    system: &mut System,
    pair: &PairPotential,
    bond: &BondPotential,
) -> Result<Energies, RunError> {
    let ForceParts {
        boundary,
        atoms,
        cell_list,
        bonds,
    } = system.force_parts();
    atoms.zero_forces();
    let cutoff_sq = pair.cutoff() * pair.cutoff();

    let mut energies = Energies::default();
    cell_list.for_each_pair(|a, b| {
        let (atom_a, atom_b) = (atoms.get(a), atoms.get(b));
        // Ghosts are explicit images, so the plain difference is already the nearest one.
        let dr = atom_a.position - atom_b.position;
        let rsq = dr.length_squared();
        if rsq >= cutoff_sq {
            return;
        }
        let (type_a, type_b) = (atom_a.type_id, atom_b.type_id);
        let force_over_r = pair.force_over_r(rsq, type_a, type_b);
        let f = dr * force_over_r;
        let weight = if a.is_ghost() || b.is_ghost() { 0.5 } else { 1.0 };
        energies.pair += weight * pair.energy(rsq, type_a, type_b);
        energies.virial += weight * rsq * force_over_r;
        if !a.is_ghost() {
            atoms.get_mut(a).force += f;
        }
        if !b.is_ghost() {
            atoms.get_mut(b).force -= f;
        }
    })?;

    for (group, handles) in bonds.iter() {
        let [Some(a), Some(b)] = *handles else {
            return Err(RunError::MissingBondAtom { bond: group.id });
        };
        let dr = boundary.separation(atoms.get(a).position, atoms.get(b).position);
        let rsq = dr.length_squared();
        let force_over_r = bond.force_over_r(rsq, group.type_id);
        let f = dr * force_over_r;
        let weight = [a, b].iter().filter(|h| !h.is_ghost()).count() as f64 / 2.0;
        energies.bond += weight * bond.energy(rsq, group.type_id);
        energies.virial += weight * rsq * force_over_r;
        if !a.is_ghost() {
            atoms.get_mut(a).force += f;
        }
        if !b.is_ghost() {
            atoms.get_mut(b).force -= f;
        }
    }
    Ok(energies)
}

pub struct Integrator<'a> {
    config: &'a IntegratorConfig,
    pair: &'a PairPotential,
    bond: &'a BondPotential,
    mass: f64,
    n_atom_total: usize,
    energies: Energies,
}

impl<'a> Integrator<'a> {
    pub fn new(
        config: &'a IntegratorConfig,
        pair: &'a PairPotential,
        bond: &'a BondPotential,
        mass: f64,
        n_atom_total: usize,
    ) -> Self {
        Self {
            config,
            pair,
            bond,
            mass,
            n_atom_total,
            energies: Energies::default(),
        }
    }

    /// Exchanges once, computes the initial forces, and then integrates `n_step` steps.
    /// Returns the thermodynamic state after the last step. Must be called on every rank.
    pub fn run(&mut self, system: &mut System, context: &RunContext) -> Result<Thermo, RunError> {
        system.exchange()?;
        self.energies = compute_forces(system, self.pair, self.bond)?;
        let mut thermo = self.thermo(system, 0)?;
        log_thermo(system.comm(), &thermo);

        for step in 1..=self.config.n_step {
            self.step(system)?;
            if step % self.config.log_interval == 0 || step == self.config.n_step {
                thermo = self.thermo(system, step)?;
                log_thermo(system.comm(), &thermo);
                context.check_time(system.comm())?;
            }
        }
        Ok(thermo)
    }

    fn step(&mut self, system: &mut System) -> Result<(), RunError> {
        let dt = self.config.dt;
        let half_dt_over_m = 0.5 * dt / self.mass;
        for atom in system.atoms_mut().atoms_mut() {
            atom.velocity += atom.force * half_dt_over_m;
            atom.position += atom.velocity * dt;
        }

        if system.needs_exchange()? {
            let report = system.exchange()?;
            debug!(
                "rank {} exchange {}: {} atoms in, {} out",
                system.comm().rank(),
                system.n_exchange(),
                report.n_received,
                report.n_sent
            );
        } else {
            system.update()?;
        }

        self.energies = compute_forces(system, self.pair, self.bond)?;
        for atom in system.atoms_mut().atoms_mut() {
            atom.velocity += atom.force * half_dt_over_m;
        }
        Ok(())
    }

    /// Reduces energies and the virial over all ranks. Must be called on every rank.
    pub fn thermo(&self, system: &System, step: usize) -> Result<Thermo, RunError> {
        let comm = system.comm();
        let kinetic_local: f64 = system
            .atoms()
            .atoms()
            .iter()
            .map(|a| 0.5 * self.mass * a.velocity.length_squared())
            .sum();
        let kinetic = comm.all_reduce_f64(kinetic_local, ReduceOp::Sum)?;
        let pair = comm.all_reduce_f64(self.energies.pair, ReduceOp::Sum)?;
        let bond = comm.all_reduce_f64(self.energies.bond, ReduceOp::Sum)?;
        let virial = comm.all_reduce_f64(self.energies.virial, ReduceOp::Sum)?;
        let n_dof = 3.0 * self.n_atom_total.max(1) as f64;
        Ok(Thermo {
            step,
            kinetic,
            pair,
            bond,
            temperature: 2.0 * kinetic / n_dof,
            virial,
            pressure: (2.0 * kinetic + virial) / (3.0 * system.boundary().volume()),
        })
    }
}

fn log_thermo(comm: &dyn Communicator, thermo: &Thermo) {
    if comm.is_master() {
        info!(
            "step {:>8}  T {:.4}  P {:.4}  kinetic {:.4}  pair {:.4}  bond {:.4}  total {:.6}",
            thermo.step,
            thermo.temperature,
            thermo.pressure,
            thermo.kinetic,
            thermo.pair,
            thermo.bond,
            thermo.total()
        );
    }
}

// End of File
