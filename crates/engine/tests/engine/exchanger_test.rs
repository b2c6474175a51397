use comm::{local_world, Communicator};
use common::{ids::AtomId, Boundary, Vector};
use ddmd_engine::{
    AtomStorage, Domain, ExchangeError, Exchanger, GroupKind, StorageError, System,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::fixtures::{config, dimers, run_world};

// =============================================================================
// Distribution and first exchange
// =============================================================================

#[test]
fn distributed_dimers_are_valid_after_exchange() {
    let boundary = Boundary::cubic(10.0).unwrap();
    let results = run_world(8, |comm| {
        let mut system = System::new(&comm, boundary, config([2, 2, 2]))?;
        system.add_group_exchanger(GroupKind::Bond);
        let (atoms, bonds) = if comm.is_master() {
            dimers(&boundary, 500, 11)
        } else {
            (Vec::new(), Vec::new())
        };
        let n_total = system.distribute_atoms(atoms)?;
        let n_distributed = system.distribute_bonds(bonds)?;
        let report = system.exchange()?;
        system.is_valid()?;
        let n_bond_total = system.bonds().n_total(system.atoms(), &comm)?;
        Ok((
            n_total,
            system.atoms().n_atom(),
            n_distributed,
            n_bond_total,
            report,
        ))
    });

    let n_local: usize = results.iter().map(|r| r.1).sum();
    assert_eq!(n_local, 1000);
    assert_eq!(results[0].2, 500);
    for (n_total, n_atom, _, n_bond_total, report) in &results {
        assert_eq!(*n_total, 1000);
        assert!(*n_atom > 0);
        assert_eq!(*n_bond_total, 500);
        assert_eq!(report.n_incomplete, 0);
        assert!(report.n_ghost > 0);
    }
}

// =============================================================================
// Ghost updates
// =============================================================================

type Snapshot = (Vec<(AtomId, Vector)>, Vec<(AtomId, Vector)>);

fn snapshot(atoms: &AtomStorage) -> Snapshot {
    (
        atoms.atoms().iter().map(|a| (a.id, a.position)).collect(),
        atoms.ghosts().iter().map(|a| (a.id, a.position)).collect(),
    )
}

/// Every ghost must sit exactly on a periodic image of its owner.
fn assert_ghosts_are_images(snapshots: &[Snapshot], length: f64) {
    let owners: FxHashMap<AtomId, Vector> = snapshots
        .iter()
        .flat_map(|(locals, _)| locals.iter().copied())
        .collect();
    for (_, ghosts) in snapshots {
        for (id, position) in ghosts {
            let delta = *position - owners[id];
            for axis in 0..3 {
                let images = delta[axis] / length;
                assert!(
                    (images - images.round()).abs() < 1e-9 && images.round().abs() <= 1.0,
                    "ghost {id} is off its owner by {delta}"
                );
            }
        }
    }
}

#[test]
fn updates_keep_ghost_counts_and_positions() {
    let boundary = Boundary::cubic(10.0).unwrap();
    let results = run_world(8, |comm| {
        let mut system = System::new(&comm, boundary, config([2, 2, 2]))?;
        system.add_group_exchanger(GroupKind::Bond);
        let (atoms, bonds) = if comm.is_master() {
            dimers(&boundary, 500, 12)
        } else {
            (Vec::new(), Vec::new())
        };
        system.distribute_atoms(atoms)?;
        system.distribute_bonds(bonds)?;
        system.exchange()?;

        let n_atom = system.atoms().n_atom();
        let n_ghost = system.atoms().n_ghost();
        let mut rng = StdRng::seed_from_u64(100 + comm.rank() as u64);
        let mut counts = Vec::new();
        for _ in 0..4 {
            for atom in system.atoms_mut().atoms_mut() {
                atom.position += Vector::new(
                    rng.gen_range(-0.01..=0.01),
                    rng.gen_range(-0.01..=0.01),
                    rng.gen_range(-0.01..=0.01),
                );
            }
            system.update()?;
            counts.push((system.atoms().n_atom(), system.atoms().n_ghost()));
        }
        let updated = snapshot(system.atoms());
        let needs_exchange = system.needs_exchange()?;

        system.exchange()?;
        system.is_valid()?;
        let n_total = system.atoms().n_atom_total(&comm)?;
        Ok((n_atom, n_ghost, counts, updated, needs_exchange, n_total))
    });

    for (n_atom, n_ghost, counts, _, needs_exchange, n_total) in &results {
        assert!(counts.iter().all(|&c| c == (*n_atom, *n_ghost)));
        assert!(!needs_exchange);
        assert_eq!(*n_total, 1000);
    }
    let snapshots: Vec<Snapshot> = results.into_iter().map(|r| r.3).collect();
    assert_ghosts_are_images(&snapshots, 10.0);
}

#[test]
fn single_rank_ghosts_are_periodic_images() {
    let boundary = Boundary::new(Vector::new(6.0, 8.0, 7.0)).unwrap();
    let results = run_world(1, |comm| {
        let mut system = System::new(&comm, boundary, config([1, 1, 1]))?;
        let (atoms, _) = dimers(&boundary, 100, 13);
        system.distribute_atoms(atoms)?;
        system.exchange()?;
        system.is_valid()?;
        let after_exchange = snapshot(system.atoms());
        for atom in system.atoms_mut().atoms_mut() {
            atom.position.x += 0.05;
        }
        system.update()?;
        Ok((after_exchange, snapshot(system.atoms())))
    });
    let (after_exchange, after_update) = &results[0];
    assert!(!after_exchange.1.is_empty());
    let locals: FxHashMap<AtomId, Vector> = after_update.0.iter().copied().collect();
    for (id, position) in &after_update.1 {
        let delta = *position - locals[id];
        let images = delta / boundary.lengths();
        assert!((images - images.round()).abs().max_element() < 1e-9);
    }
}

// =============================================================================
// Pair coverage
// =============================================================================

fn brute_force_pairs(boundary: &Boundary, seed: u64, cutoff: f64) -> f64 {
    let (mut atoms, _) = dimers(boundary, 500, seed);
    for atom in atoms.iter_mut() {
        boundary.shift(&mut atom.position);
    }
    let mut count = 0.0;
    for (i, a) in atoms.iter().enumerate() {
        for b in &atoms[i + 1..] {
            if boundary.distance_sq(a.position, b.position) < cutoff * cutoff {
                count += 1.0;
            }
        }
    }
    count
}

fn cell_list_pairs(grid: [usize; 3], boundary: Boundary, seed: u64, cutoff: f64) -> f64 {
    let size = grid.iter().product();
    let results = run_world(size, |comm| {
        let mut system = System::new(&comm, boundary, config(grid))?;
        let (atoms, _) = if comm.is_master() {
            dimers(&boundary, 500, seed)
        } else {
            (Vec::new(), Vec::new())
        };
        system.distribute_atoms(atoms)?;
        system.exchange()?;
        let atoms = system.atoms();
        let mut count = 0.0;
        system.cell_list().for_each_pair(|a, b| {
            let d = atoms.get(a).position.distance_squared(atoms.get(b).position);
            if d < cutoff * cutoff {
                count += if a.is_ghost() || b.is_ghost() { 0.5 } else { 1.0 };
            }
        })?;
        Ok(count)
    });
    results.iter().sum()
}

#[test]
fn every_pair_within_cutoff_is_found_once() {
    let boundary = Boundary::cubic(10.0).unwrap();
    let expected = brute_force_pairs(&boundary, 21, 1.0);
    assert!(expected > 500.0);
    for grid in [[1, 1, 1], [2, 1, 1], [2, 2, 2]] {
        let found = cell_list_pairs(grid, boundary, 21, 1.0);
        assert_eq!(found, expected, "grid {grid:?}");
    }
}

// =============================================================================
// Protocol errors
// =============================================================================

#[test]
fn update_before_exchange_is_rejected() {
    let world = local_world(1);
    let mut system =
        System::new(&world[0], Boundary::cubic(10.0).unwrap(), config([1, 1, 1])).unwrap();
    assert!(matches!(system.update(), Err(ExchangeError::NoPlan)));
}

#[test]
fn exchange_checks_allocation_and_coordinates() {
    let world = local_world(1);
    let domain = Domain::new(Boundary::cubic(10.0).unwrap(), [1, 1, 1], 0, 1).unwrap();
    let mut atoms = AtomStorage::new(4, 4);
    let mut exchanger = Exchanger::new();
    exchanger.set_pair_cutoff(1.4);
    assert!(matches!(
        exchanger.exchange(&domain, &mut atoms, &mut [], &world[0]),
        Err(ExchangeError::NotAllocated)
    ));
    exchanger.allocate(&domain, 1 << 16).unwrap();
    assert!(matches!(
        exchanger.exchange(&domain, &mut atoms, &mut [], &world[0]),
        Err(ExchangeError::Storage(StorageError::WrongCoordinates { .. }))
    ));
}

#[test]
fn cutoff_wider_than_subdomain_is_rejected() {
    let world = local_world(8);
    let result = System::new(&world[0], Boundary::cubic(10.0).unwrap(), config([8, 1, 1]));
    assert!(matches!(
        result,
        Err(ExchangeError::Domain(ddmd_engine::DomainError::CutoffTooLarge { axis: 0, .. }))
    ));
}

// =============================================================================
// Bond geometry
// =============================================================================

/// Checks every bond on every rank against the dimer length and returns how many bonds had
/// members whose stored positions are not the nearest images of each other.
fn check_bond_lengths(grid: [usize; 3]) -> usize {
    let boundary = Boundary::cubic(10.0).unwrap();
    let n_rank = grid.iter().product();
    let results = run_world(n_rank, |comm| {
        let mut system = System::new(&comm, boundary, config(grid))?;
        system.add_group_exchanger(GroupKind::Bond);
        let (atoms, bonds) = if comm.is_master() {
            dimers(&boundary, 500, 29)
        } else {
            (Vec::new(), Vec::new())
        };
        system.distribute_atoms(atoms)?;
        system.distribute_bonds(bonds)?;
        system.exchange()?;

        let mut n_wrapped = 0;
        for (bond, handles) in system.bonds().iter() {
            let [Some(a), Some(b)] = *handles else {
                panic!("bond {} is incomplete", bond.id);
            };
            let (pa, pb) = (system.atoms().get(a).position, system.atoms().get(b).position);
            let length = boundary.distance_sq(pa, pb).sqrt();
            assert!((length - 0.9).abs() < 1e-9, "bond {} has length {length}", bond.id);
            if ((pa - pb).length() - 0.9).abs() > 1e-9 {
                n_wrapped += 1;
            }
        }
        Ok(n_wrapped)
    });
    results.into_iter().sum()
}

#[test]
fn bonds_crossing_a_single_process_axis_keep_their_length() {
    // With one process per axis both members are local and wrapped into the box, so bonds
    // across a face only have their true length under the minimum image.
    assert!(check_bond_lengths([1, 1, 1]) > 0);
    assert!(check_bond_lengths([2, 1, 1]) > 0);
}

#[test]
fn bonds_split_on_every_axis_reach_each_other_through_ghosts() {
    assert_eq!(check_bond_lengths([2, 2, 2]), 0);
}
