use comm::{run_local, Communicator, ReduceOp};
use common::{Boundary, Vector};
use ddmd::{
    integrator::compute_forces,
    potential::{BondPotential, PairPotential},
    Energies, RunError,
};
use engine::{Atom, Bond, GroupKind, System, SystemConfig};

/// A pair potential that is in range of everything but exerts no force, so only the bond
/// contributes.
fn silent_pair() -> PairPotential {
    PairPotential::Dpd {
        cutoff: 1.0,
        a: vec![vec![0.0]],
    }
}

/// Bonds two atoms, exchanges once and evaluates forces. Returns the energies summed over all
/// ranks and the force on the first atom from the rank that owns it.
fn bonded_pair(boundary: Boundary, grid: [usize; 3], first: Vector, second: Vector) -> (Energies, Vector) {
    let n_rank = grid.iter().product();
    let results = run_local(n_rank, |comm| -> Result<_, RunError> {
        let config = SystemConfig {
            grid,
            cutoff: 1.0,
            skin: 0.4,
            ..SystemConfig::default()
        };
        let mut system = System::new(&comm, boundary, config)?;
        system.add_group_exchanger(GroupKind::Bond);
        let (atoms, bonds) = if comm.is_master() {
            (
                vec![Atom::new(0, 0, first), Atom::new(1, 0, second)],
                vec![Bond::new(0, 0, [0, 1])],
            )
        } else {
            (Vec::new(), Vec::new())
        };
        system.distribute_atoms(atoms)?;
        system.distribute_bonds(bonds)?;
        system.exchange()?;

        let local = compute_forces(&mut system, &silent_pair(), &BondPotential::default())?;
        let energies = Energies {
            pair: comm.all_reduce_f64(local.pair, ReduceOp::Sum)?,
            bond: comm.all_reduce_f64(local.bond, ReduceOp::Sum)?,
            virial: comm.all_reduce_f64(local.virial, ReduceOp::Sum)?,
        };
        let force = system
            .atoms()
            .find_atom(0)
            .map(|handle| system.atoms().get(handle).force);
        Ok((energies, force))
    })
    .unwrap();

    let mut owned = Vec::new();
    let mut energies = Vec::new();
    for result in results {
        let (e, force) = result.unwrap();
        energies.push(e);
        owned.extend(force);
    }
    assert_eq!(owned.len(), 1);
    assert!(energies.iter().all(|e| *e == energies[0]));
    (energies[0], owned[0])
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

// =============================================================================
// Bonds across periodic faces
// =============================================================================

#[test]
fn bond_across_a_face_uses_the_nearest_image() {
    // 0.4 apart through the face at x = 0; harmonic with kappa 100 and length 0.8.
    let boundary = Boundary::cubic(10.0).unwrap();
    let first = Vector::new(0.2, 5.0, 5.0);
    let second = Vector::new(9.8, 5.0, 5.0);
    for grid in [[1, 1, 1], [2, 1, 1], [1, 2, 2]] {
        let (energies, force) = bonded_pair(boundary, grid, first, second);
        assert_close(energies.pair, 0.0);
        assert_close(energies.bond, 8.0);
        // Compressed bond pushes the first atom away from the face.
        assert_close(energies.virial, 16.0);
        assert!((force - Vector::new(40.0, 0.0, 0.0)).length() < 1e-9, "{grid:?}: {force}");
    }
}

#[test]
fn bond_to_an_atom_with_two_ghost_images_uses_the_nearer_one() {
    // Sub-domains 2.5 wide with a ghost range of 1.4: rank 1 receives the first atom both
    // directly and shifted by one box length.
    let boundary = Boundary::new(Vector::new(5.0, 10.0, 10.0)).unwrap();
    let first = Vector::new(1.3, 5.0, 5.0);
    let second = Vector::new(2.55, 5.0, 5.0);
    let (energies, force) = bonded_pair(boundary, [2, 1, 1], first, second);
    // Stretched to 1.25: 50 * 0.45^2.
    assert_close(energies.bond, 10.125);
    assert_close(energies.virial, -56.25);
    assert!((force - Vector::new(45.0, 0.0, 0.0)).length() < 1e-9, "{force}");
}
