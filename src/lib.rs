// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! # ddmd
//!
//! Molecular dynamics of polymer melts on a spatially decomposed box. [`run`] starts one rank
//! per sub-domain of the configured grid, builds a random melt on the master, distributes it,
//! and integrates it with velocity Verlet while the engine migrates atoms and refreshes ghosts.

pub mod config;
pub mod context;
mod error;
pub mod initial;
pub mod integrator;
pub mod potential;

use std::time::{Duration, Instant};

use comm::{run_local, Communicator};
use engine::{GroupKind, System};
use log::{info, warn};

pub use config::Config;
pub use context::RunContext;
pub use error::{ConfigError, RunError};
pub use integrator::{Energies, Integrator, Thermo};

/// What one rank reports back at the end of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct RankSummary {
    pub n_atom: usize,
    pub n_ghost: usize,
    pub n_bond: usize,
    pub n_bond_total: usize,
    pub n_exchange: usize,
    pub thermo: Thermo,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub n_atom_total: usize,
    pub n_bond_total: usize,
    pub ranks: Vec<RankSummary>,
    pub wall_time: Duration,
}

impl RunSummary {
    /// Final thermodynamic state; identical on every rank.
    pub fn thermo(&self) -> Thermo {
        self.ranks.first().map(|r| r.thermo).unwrap_or_default()
    }

    pub fn n_exchange(&self) -> usize {
        self.ranks.first().map_or(0, |r| r.n_exchange)
    }
}

/// Runs a whole simulation on an in-process world of one thread per sub-domain.
///
/// If ranks fail, the reported error is the first one that is not merely a consequence of a
/// peer disconnecting.
pub fn run(config: &Config) -> Result<RunSummary, RunError> {
    config.validate()?;
    let start = Instant::now();
    let n_rank = config.domain.n_rank();
    info!("starting {n_rank} ranks on a {:?} grid", config.domain.grid);

    let results = run_local(n_rank, |comm| run_rank(&comm, config))?;
    let mut ranks = Vec::with_capacity(n_rank);
    let mut errors = Vec::new();
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(summary) => ranks.push(summary),
            Err(err) => errors.push((rank, err)),
        }
    }
    if !errors.is_empty() {
        let index = errors.iter().position(|(_, err)| !err.is_peer_failure()).unwrap_or(0);
        let (rank, err) = errors.swap_remove(index);
        warn!("{} ranks failed; rank {rank} failed first: {err}", errors.len() + 1);
        return Err(err);
    }

    Ok(RunSummary {
        n_atom_total: ranks.iter().map(|r| r.n_atom).sum(),
        n_bond_total: ranks.first().map_or(0, |r| r.n_bond_total),
        ranks,
        wall_time: start.elapsed(),
    })
}

/// Everything one rank does in a run. Must be called on every rank of `comm`.
pub fn run_rank(comm: &dyn Communicator, config: &Config) -> Result<RankSummary, RunError> {
    let context = RunContext::new(config.run.max_wall_time.map(Duration::from_secs_f64));
    let boundary = config.boundary()?;
    let mut system = System::new(comm, boundary, config.system_config())?;
    system.add_group_exchanger(GroupKind::Bond);

    let (atoms, bonds) = if comm.is_master() {
        initial::polymer_melt(&config.system, &config.bond, &boundary)?
    } else {
        (Vec::new(), Vec::new())
    };
    let n_atom_total = system.distribute_atoms(atoms)?;
    system.distribute_bonds(bonds)?;
    context.check_time(comm)?;

    let mut integrator = Integrator::new(
        &config.integrator,
        &config.pair,
        &config.bond,
        config.system.mass,
        n_atom_total,
    );
    let thermo = integrator.run(&mut system, &context)?;
    system.is_valid()?;
    let n_bond_total = system.bonds().n_total(system.atoms(), comm)?;

    Ok(RankSummary {
        n_atom: system.atoms().n_atom(),
        n_ghost: system.atoms().n_ghost(),
        n_bond: system.bonds().len(),
        n_bond_total,
        n_exchange: system.n_exchange(),
        thermo,
    })
}

// End of File
