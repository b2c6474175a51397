// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! Pair and bond potentials.
//!
//! `force_over_r` returns `F / r`, so the force on the first atom of a pair separated by
//! `dr = r1 - r2` is `dr * force_over_r(|dr|^2, ..)`. Positive values are repulsive.

use common::ids::TypeId;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Deserialize;

use crate::ConfigError;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum PairPotential {
    /// Soft conservative repulsion of dissipative particle dynamics,
    /// `E = a rc / 2 (1 - r / rc)^2`.
    Dpd { cutoff: f64, a: Vec<Vec<f64>> },
    /// Lennard-Jones, shifted to zero energy at the cutoff.
    LennardJones {
        cutoff: f64,
        epsilon: Vec<Vec<f64>>,
        sigma: Vec<Vec<f64>>,
    },
}

impl Default for PairPotential {
    fn default() -> Self {
        PairPotential::Dpd {
            cutoff: 1.0,
            a: vec![vec![25.0]],
        }
    }
}

fn validate_matrix(name: &str, matrix: &[Vec<f64>], n_type: usize) -> Result<(), ConfigError> {
    if matrix.len() != n_type || matrix.iter().any(|row| row.len() != n_type) {
        return Err(ConfigError::invalid(
            "pair",
            format!("{name} must be a {n_type} x {n_type} matrix"),
        ));
    }
    for i in 0..n_type {
        for j in 0..i {
            if matrix[i][j] != matrix[j][i] {
                return Err(ConfigError::invalid(
                    "pair",
                    format!("{name} is not symmetric at ({i}, {j})"),
                ));
            }
        }
    }
    if matrix.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ConfigError::invalid("pair", format!("{name} has non-finite entries")));
    }
    Ok(())
}

impl PairPotential {
    pub fn cutoff(&self) -> f64 {
        match self {
            PairPotential::Dpd { cutoff, .. } | PairPotential::LennardJones { cutoff, .. } => {
                *cutoff
            }
        }
    }

    pub fn validate(&self, n_type: usize) -> Result<(), ConfigError> {
        if !(self.cutoff() > 0.0) {
            return Err(ConfigError::invalid("pair", "cutoff must be positive"));
        }
        match self {
            PairPotential::Dpd { a, .. } => validate_matrix("a", a, n_type),
            PairPotential::LennardJones { epsilon, sigma, .. } => {
                validate_matrix("epsilon", epsilon, n_type)?;
                validate_matrix("sigma", sigma, n_type)?;
                if sigma.iter().flatten().any(|&s| s <= 0.0) {
                    return Err(ConfigError::invalid("pair", "sigma must be positive"));
                }
                Ok(())
            }
        }
    }

    /// Pair energy at squared distance `rsq`; zero at and beyond the cutoff.
    pub fn energy(&self, rsq: f64, i: TypeId, j: TypeId) -> f64 {
        let cutoff = self.cutoff();
        if rsq >= cutoff * cutoff {
            return 0.0;
        }
        match self {
            PairPotential::Dpd { a, .. } => {
                let x = 1.0 - rsq.sqrt() / cutoff;
                0.5 * a[i][j] * cutoff * x * x
            }
            PairPotential::LennardJones { epsilon, sigma, .. } => {
                let lj = |rsq: f64| {
                    let s6 = (sigma[i][j] * sigma[i][j] / rsq).powi(3);
                    4.0 * epsilon[i][j] * (s6 * s6 - s6)
                };
                lj(rsq) - lj(cutoff * cutoff)
            }
        }
    }

    pub fn force_over_r(&self, rsq: f64, i: TypeId, j: TypeId) -> f64 {
        let cutoff = self.cutoff();
        if rsq >= cutoff * cutoff {
            return 0.0;
        }
        match self {
            PairPotential::Dpd { a, .. } => {
                let r = rsq.sqrt();
                a[i][j] * (1.0 - r / cutoff) / r
            }
            PairPotential::LennardJones { epsilon, sigma, .. } => {
                let s6 = (sigma[i][j] * sigma[i][j] / rsq).powi(3);
                24.0 * epsilon[i][j] * (2.0 * s6 * s6 - s6) / rsq
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum BondPotential {
    /// `E = kappa / 2 (r - length)^2`, one entry per bond type.
    Harmonic { kappa: Vec<f64>, length: Vec<f64> },
}

impl Default for BondPotential {
    fn default() -> Self {
        BondPotential::Harmonic {
            kappa: vec![100.0],
            length: vec![0.8],
        }
    }
}

impl BondPotential {
    pub fn n_bond_type(&self) -> usize {
        match self {
            BondPotential::Harmonic { kappa, .. } => kappa.len(),
        }
    }

    pub fn validate(&self, _n_atom_type: usize) -> Result<(), ConfigError> {
        match self {
            BondPotential::Harmonic { kappa, length } => {
                if kappa.is_empty() || kappa.len() != length.len() {
                    return Err(ConfigError::invalid(
                        "bond",
                        "kappa and length need one entry per bond type",
                    ));
                }
                if kappa.iter().chain(length).any(|&v| !(v > 0.0) || !v.is_finite()) {
                    return Err(ConfigError::invalid("bond", "kappa and length must be positive"));
                }
                Ok(())
            }
        }
    }

    pub fn energy(&self, rsq: f64, type_id: TypeId) -> f64 {
        match self {
            BondPotential::Harmonic { kappa, length } => {
                let dr = rsq.sqrt() - length[type_id];
                0.5 * kappa[type_id] * dr * dr
            }
        }
    }

    pub fn force_over_r(&self, rsq: f64, type_id: TypeId) -> f64 {
        match self {
            BondPotential::Harmonic { kappa, length } => {
                let r = rsq.sqrt();
                -kappa[type_id] * (r - length[type_id]) / r
            }
        }
    }

    /// Draws a bond length from the Boltzmann distribution at inverse temperature `beta`.
    /// Non-positive draws are rejected.
    pub fn random_bond_length<R: Rng + ?Sized>(&self, rng: &mut R, beta: f64, type_id: TypeId) -> f64 {
        match self {
            BondPotential::Harmonic { kappa, length } => {
                let sigma = 1.0 / (beta * kappa[type_id]).sqrt();
                loop {
                    let z: f64 = rng.sample(StandardNormal);
                    let r = length[type_id] + sigma * z;
                    if r > 0.0 {
                        return r;
                    }
                }
            }
        }
    }
}


// End of File
