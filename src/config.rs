// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! Run configuration, read from a TOML file.
//!
//! Every field has a default, so a file only needs the sections it changes:
//!
//! ```toml
//! [boundary]
//! lengths = [12.0, 12.0, 12.0]
//!
//! [domain]
//! grid = [2, 2, 2]
//!
//! [pair]
//! style = "dpd"
//! cutoff = 1.0
//! a = [[25.0]]
//! ```

use std::path::Path;

use common::{Boundary, Vector};
use engine::SystemConfig;
use serde::Deserialize;

use crate::{
    potential::{BondPotential, PairPotential},
    ConfigError,
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub domain: DomainConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pair: PairPotential,
    #[serde(default)]
    pub bond: BondPotential,
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub system: InitialConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryConfig {
    /// Edge lengths of the orthorhombic periodic box.
    #[serde(default = "default_lengths")]
    pub lengths: [f64; 3],
}

fn default_lengths() -> [f64; 3] {
    [10.0; 3]
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            lengths: default_lengths(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    /// Number of sub-domains along each axis. One rank runs per sub-domain.
    #[serde(default = "default_grid")]
    pub grid: [usize; 3],
    /// Verlet skin added to the pair cutoff for ghost selection.
    #[serde(default = "default_skin")]
    pub skin: f64,
}

fn default_grid() -> [usize; 3] {
    [1; 3]
}

fn default_skin() -> f64 {
    0.4
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            grid: default_grid(),
            skin: default_skin(),
        }
    }
}

impl DomainConfig {
    pub fn n_rank(&self) -> usize {
        self.grid.iter().product()
    }
}

/// Per-rank capacities. Exceeding any of them is fatal.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_capacity")]
    pub atom_capacity: usize,
    #[serde(default = "default_capacity")]
    pub ghost_capacity: usize,
    #[serde(default = "default_capacity")]
    pub bond_capacity: usize,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_capacity() -> usize {
    10_000
}

fn default_buffer_capacity() -> usize {
    1 << 24
}

fn default_cache_capacity() -> usize {
    1000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            atom_capacity: default_capacity(),
            ghost_capacity: default_capacity(),
            bond_capacity: default_capacity(),
            buffer_capacity: default_buffer_capacity(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegratorConfig {
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_n_step")]
    pub n_step: usize,
    /// Steps between thermodynamic log lines and wall clock checks.
    #[serde(default = "default_log_interval")]
    pub log_interval: usize,
}

fn default_dt() -> f64 {
    0.005
}

fn default_n_step() -> usize {
    100
}

fn default_log_interval() -> usize {
    10
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            n_step: default_n_step(),
            log_interval: default_log_interval(),
        }
    }
}

/// The random polymer melt built on the master before the run.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialConfig {
    #[serde(default = "default_n_molecule")]
    pub n_molecule: usize,
    /// Atoms per linear chain; `1` gives a simple liquid without bonds.
    #[serde(default = "default_chain_length")]
    pub chain_length: usize,
    /// Number of atom types; chains cycle through them.
    #[serde(default = "default_n_atom_type")]
    pub n_atom_type: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_mass")]
    pub mass: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_molecule() -> usize {
    300
}

fn default_chain_length() -> usize {
    10
}

fn default_n_atom_type() -> usize {
    1
}

fn default_temperature() -> f64 {
    1.0
}

fn default_mass() -> f64 {
    1.0
}

fn default_seed() -> u64 {
    12345
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            n_molecule: default_n_molecule(),
            chain_length: default_chain_length(),
            n_atom_type: default_n_atom_type(),
            temperature: default_temperature(),
            mass: default_mass(),
            seed: default_seed(),
        }
    }
}

impl InitialConfig {
    pub fn n_atom(&self) -> usize {
        self.n_molecule * self.chain_length
    }

    pub fn n_bond(&self) -> usize {
        self.n_molecule * self.chain_length.saturating_sub(1)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Wall clock budget in seconds. Unlimited if absent.
    #[serde(default)]
    pub max_wall_time: Option<f64>,
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        text.parse()
    }

    pub fn boundary(&self) -> Result<Boundary, ConfigError> {
        Ok(Boundary::new(Vector::from_array(self.boundary.lengths))?)
    }

    pub fn system_config(&self) -> SystemConfig {
        SystemConfig {
            grid: self.domain.grid,
            atom_capacity: self.storage.atom_capacity,
            ghost_capacity: self.storage.ghost_capacity,
            bond_capacity: self.storage.bond_capacity,
            angle_capacity: 0,
            dihedral_capacity: 0,
            buffer_capacity: self.storage.buffer_capacity,
            cache_capacity: self.storage.cache_capacity,
            cutoff: self.pair.cutoff(),
            skin: self.domain.skin,
        }
    }

    /// Checks everything that can be checked before ranks start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let boundary = self.boundary()?;

        if self.domain.grid.contains(&0) {
            return Err(ConfigError::invalid("domain", "grid dimensions must be positive"));
        }
        if !(self.domain.skin >= 0.0) {
            return Err(ConfigError::invalid("domain", "skin must not be negative"));
        }
        let range = self.pair.cutoff() + self.domain.skin;
        for axis in 0..3 {
            // Nearest images are only unique when the box spans two ghost ranges.
            if boundary.length(axis) < 2.0 * range {
                return Err(ConfigError::invalid(
                    "boundary",
                    format!("box length along axis {axis} is less than twice cutoff plus skin {range}"),
                ));
            }
            let width = boundary.length(axis) / self.domain.grid[axis] as f64;
            if width < range {
                return Err(ConfigError::invalid(
                    "domain",
                    format!(
                        "sub-domain width {width} along axis {axis} is smaller than cutoff plus skin {range}"
                    ),
                ));
            }
        }

        let storage = &self.storage;
        if storage.atom_capacity == 0 || storage.buffer_capacity == 0 || storage.cache_capacity == 0 {
            return Err(ConfigError::invalid("storage", "capacities must be positive"));
        }

        let n_type = self.system.n_atom_type;
        self.pair.validate(n_type)?;
        self.bond.validate(n_type)?;

        let integrator = &self.integrator;
        if !(integrator.dt > 0.0) {
            return Err(ConfigError::invalid("integrator", "dt must be positive"));
        }
        if integrator.log_interval == 0 {
            return Err(ConfigError::invalid("integrator", "log_interval must be positive"));
        }

        let system = &self.system;
        if n_type == 0 || system.chain_length == 0 || system.n_molecule == 0 {
            return Err(ConfigError::invalid(
                "system",
                "n_molecule, chain_length and n_atom_type must be positive",
            ));
        }
        if !(system.temperature > 0.0) || !(system.mass > 0.0) {
            return Err(ConfigError::invalid("system", "temperature and mass must be positive"));
        }

        if let Some(limit) = self.run.max_wall_time {
            if !(limit > 0.0) {
                return Err(ConfigError::invalid("run", "max_wall_time must be positive"));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}


// End of File
