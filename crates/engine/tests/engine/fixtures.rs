// Shared fixtures for the multi-rank tests.

use common::{Boundary, Vector};
use ddmd_engine::{Atom, Bond, SystemConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub fn config(grid: [usize; 3]) -> SystemConfig {
    SystemConfig {
        grid,
        cutoff: 1.0,
        skin: 0.4,
        ..SystemConfig::default()
    }
}

/// `n_bond` dimers with a bond length of 0.9 at random positions and orientations. Atoms
/// `2k` and `2k + 1` are joined by bond `k`.
pub fn dimers(boundary: &Boundary, n_bond: usize, seed: u64) -> (Vec<Atom>, Vec<Bond>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut atoms = Vec::with_capacity(2 * n_bond);
    let mut bonds = Vec::with_capacity(n_bond);
    for k in 0..n_bond {
        let first = boundary.random_position(&mut rng);
        let second = first + random_unit_vector(&mut rng) * 0.9;
        atoms.push(Atom::new(2 * k, 0, first));
        atoms.push(Atom::new(2 * k + 1, 0, second));
        bonds.push(Bond::new(k, 0, [2 * k, 2 * k + 1]));
    }
    (atoms, bonds)
}

pub fn random_unit_vector(rng: &mut StdRng) -> Vector {
    loop {
        let v = Vector::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let norm = v.length();
        if norm > 1e-3 && norm <= 1.0 {
            return v / norm;
        }
    }
}

/// Runs `f` on every rank of a fresh in-process world and unwraps every result.
pub fn run_world<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(comm::LocalComm) -> TestResult<T> + Sync,
{
    comm::run_local(size, f)
        .expect("world failed to run")
        .into_iter()
        .enumerate()
        .map(|(rank, result)| result.unwrap_or_else(|err| panic!("rank {rank} failed: {err}")))
        .collect()
}
