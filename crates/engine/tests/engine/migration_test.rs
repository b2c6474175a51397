use comm::{run_local, Communicator};
use common::{ids::AtomId, Boundary, Vector};
use ddmd_engine::{Angle, Atom, Bond, Dihedral, ExchangeError, GroupKind, System};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::fixtures::{config, dimers, run_world, TestResult};

fn move_atom(system: &mut System, id: AtomId, position: Vector) {
    if let Some(handle) = system.atoms().find_atom(id) {
        system.atoms_mut().get_mut(handle).position = position;
    }
}

fn sorted_ids(ids: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut ids: Vec<usize> = ids.collect();
    ids.sort_unstable();
    ids
}

// =============================================================================
// Corner crossings
// =============================================================================

#[test]
fn atoms_crossing_a_corner_reach_the_diagonal_owner() {
    let boundary = Boundary::cubic(10.0).unwrap();
    let results = run_world(8, |comm| {
        let mut system = System::new(&comm, boundary, config([2, 2, 2]))?;
        for kind in GroupKind::ALL {
            system.add_group_exchanger(kind);
        }
        let master = comm.is_master();
        let atoms = [
            (0, Vector::new(4.9, 4.9, 4.9)),
            (1, Vector::new(4.4, 4.9, 4.9)),
            (2, Vector::new(0.05, 0.05, 0.05)),
            (3, Vector::new(9.9, 9.9, 9.9)),
            (4, Vector::new(5.3, 4.9, 4.9)),
            (5, Vector::new(5.3, 5.5, 4.9)),
        ]
        .into_iter()
        .map(|(id, position)| Atom::new(id, 0, position))
        .filter(|_| master);
        system.distribute_atoms(atoms.collect::<Vec<_>>())?;
        let bonds = vec![Bond::new(0, 0, [0, 1]), Bond::new(1, 0, [2, 3])];
        let angles = vec![Angle::new(0, 0, [1, 0, 4])];
        let dihedrals = vec![Dihedral::new(0, 0, [1, 0, 4, 5])];
        system.distribute_bonds(if master { bonds } else { Vec::new() })?;
        system.distribute_angles(if master { angles } else { Vec::new() })?;
        system.distribute_dihedrals(if master { dihedrals } else { Vec::new() })?;
        system.exchange()?;
        system.is_valid()?;

        move_atom(&mut system, 0, Vector::new(5.1, 5.1, 5.1));
        move_atom(&mut system, 2, Vector::new(-0.05, -0.05, -0.05));
        let report = system.exchange()?;
        system.is_valid()?;

        Ok((
            sorted_ids(system.atoms().atoms().iter().map(|a| a.id)),
            sorted_ids(system.bonds().groups().iter().map(|g| g.id)),
            sorted_ids(system.angles().groups().iter().map(|g| g.id)),
            sorted_ids(system.dihedrals().groups().iter().map(|g| g.id)),
            report.n_incomplete,
        ))
    });

    assert_eq!(results[0].0, vec![1]);
    assert_eq!(results[4].0, vec![4]);
    assert_eq!(results[6].0, vec![5]);
    assert_eq!(results[7].0, vec![0, 2, 3]);
    for rank in [1, 2, 3, 5] {
        assert!(results[rank].0.is_empty(), "rank {rank} kept atoms");
        assert!(results[rank].1.is_empty());
    }

    assert_eq!(results[0].1, vec![0]);
    assert_eq!(results[7].1, vec![0, 1]);
    for rank in [0, 4, 6, 7] {
        assert_eq!(results[rank].2, vec![0], "angle missing on rank {rank}");
        assert_eq!(results[rank].3, vec![0], "dihedral missing on rank {rank}");
    }
    assert!(results.iter().all(|r| r.4 == 0));
}

// =============================================================================
// Conservation under motion
// =============================================================================

#[test]
fn random_walks_conserve_atoms_and_bonds() {
    let boundary = Boundary::cubic(10.0).unwrap();
    let results = run_world(8, |comm| {
        let mut system = System::new(&comm, boundary, config([2, 2, 2]))?;
        system.add_group_exchanger(GroupKind::Bond);
        let (atoms, bonds) = if comm.is_master() {
            dimers(&boundary, 500, 31)
        } else {
            (Vec::new(), Vec::new())
        };
        system.distribute_atoms(atoms)?;
        system.distribute_bonds(bonds)?;
        system.exchange()?;

        let mut totals = Vec::new();
        for step in 0..20u64 {
            // Both atoms of a dimer take the same step so bonds never stretch.
            for atom in system.atoms_mut().atoms_mut() {
                let mut rng = StdRng::seed_from_u64(step << 32 | (atom.id / 2) as u64);
                atom.position += Vector::new(
                    rng.gen_range(-0.1..0.1),
                    rng.gen_range(-0.1..0.1),
                    rng.gen_range(-0.1..0.1),
                );
            }
            let report = system.exchange()?;
            system.is_valid()?;
            totals.push((
                system.atoms().n_atom_total(&comm)?,
                system.bonds().n_total(system.atoms(), &comm)?,
                report.n_incomplete,
            ));
        }
        Ok((totals, system.n_exchange()))
    });

    for (totals, n_exchange) in &results {
        assert_eq!(*n_exchange, 21);
        assert!(totals.iter().all(|&t| t == (1000, 500, 0)));
    }
}

// =============================================================================
// Fatal moves
// =============================================================================

#[test]
fn skipping_a_subdomain_is_fatal() {
    let boundary = Boundary::cubic(10.0).unwrap();
    let results = run_local(4, |comm| -> TestResult<()> {
        let mut system = System::new(&comm, boundary, config([4, 1, 1]))?;
        let atoms = if comm.is_master() {
            vec![Atom::new(0, 0, Vector::new(1.0, 5.0, 5.0))]
        } else {
            Vec::new()
        };
        system.distribute_atoms(atoms)?;
        system.exchange()?;
        move_atom(&mut system, 0, Vector::new(6.0, 5.0, 5.0));
        system.exchange()?;
        Ok(())
    })
    .unwrap();

    assert!(results.iter().all(|r| r.is_err()));
    let err = results[1].as_ref().unwrap_err();
    match err.downcast_ref::<ExchangeError>() {
        Some(ExchangeError::AtomOutsideDomain { id, rank, .. }) => {
            assert_eq!(*id, 0);
            assert_eq!(*rank, 1);
        }
        other => panic!("unexpected error {other:?} ({err})"),
    }
}
