use std::collections::BTreeSet;

use common::{BoundingBox, Vector};
use ddmd_engine::{AtomHandle, CellList};
use rand::{rngs::StdRng, Rng, SeedableRng};

const CUTOFF: f64 = 1.2;

struct Scene {
    lower: Vector,
    upper: Vector,
    locals: Vec<Vector>,
    ghosts: Vec<Vector>,
}

/// Local atoms uniformly inside `[lower, upper)` and ghosts in the shell of one cutoff around it.
fn scene(seed: u64, n_local: usize, n_ghost: usize) -> Scene {
    let lower = Vector::new(1.0, -2.0, 0.5);
    let upper = Vector::new(5.0, 2.5, 4.1);
    let mut rng = StdRng::seed_from_u64(seed);
    let inner = BoundingBox::new(lower, upper);
    let outer = inner.expanded(Vector::splat(CUTOFF));
    let sample = |region: &BoundingBox, rng: &mut StdRng| {
        let size = region.size();
        region.min
            + Vector::new(
                rng.gen_range(0.0..size.x),
                rng.gen_range(0.0..size.y),
                rng.gen_range(0.0..size.z),
            )
    };
    let locals = (0..n_local).map(|_| sample(&inner, &mut rng)).collect();
    let mut ghosts = Vec::with_capacity(n_ghost);
    while ghosts.len() < n_ghost {
        let p = sample(&outer, &mut rng);
        if !inner.contains(p) {
            ghosts.push(p);
        }
    }
    Scene {
        lower,
        upper,
        locals,
        ghosts,
    }
}

impl Scene {
    fn position(&self, handle: AtomHandle) -> Vector {
        match handle {
            AtomHandle::Local(i) => self.locals[i],
            AtomHandle::Ghost(i) => self.ghosts[i],
        }
    }

    fn handles(&self) -> impl Iterator<Item = AtomHandle> + '_ {
        (0..self.locals.len())
            .map(AtomHandle::Local)
            .chain((0..self.ghosts.len()).map(AtomHandle::Ghost))
    }

    fn build(&self) -> CellList {
        let mut list = CellList::new();
        list.allocate(
            self.locals.len() + self.ghosts.len(),
            self.lower,
            self.upper,
            Vector::splat(CUTOFF),
        )
        .unwrap();
        for handle in self.handles() {
            list.place_atom(handle, self.position(handle)).unwrap();
        }
        list.build();
        list
    }
}

fn key(a: AtomHandle, b: AtomHandle) -> (AtomHandle, AtomHandle) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[test]
fn pairs_match_brute_force() {
    for seed in 0..4 {
        let scene = scene(seed, 300, 400);
        let list = scene.build();
        list.is_valid().unwrap();
        assert_eq!(list.n_reject(), 0);

        let mut found = Vec::new();
        list.for_each_pair(|a, b| {
            if scene.position(a).distance_squared(scene.position(b)) < CUTOFF * CUTOFF {
                found.push(key(a, b));
            }
        })
        .unwrap();
        let unique: BTreeSet<_> = found.iter().copied().collect();
        assert_eq!(unique.len(), found.len(), "a pair was visited twice");

        let handles: Vec<AtomHandle> = scene.handles().collect();
        let mut expected = BTreeSet::new();
        for (i, &a) in handles.iter().enumerate() {
            for &b in &handles[i + 1..] {
                if a.is_ghost() && b.is_ghost() {
                    continue;
                }
                if scene.position(a).distance_squared(scene.position(b)) < CUTOFF * CUTOFF {
                    expected.insert(key(a, b));
                }
            }
        }
        assert_eq!(unique, expected);
    }
}

#[test]
fn rebuilds_are_deterministic() {
    let scene = scene(7, 200, 200);
    let mut list = scene.build();
    let first: Vec<Vec<AtomHandle>> =
        (0..list.n_cell()).map(|i| list.cell_atoms(i).to_vec()).collect();

    list.clear();
    for handle in scene.handles() {
        list.place_atom(handle, scene.position(handle)).unwrap();
    }
    list.build();
    list.is_valid().unwrap();
    let second: Vec<Vec<AtomHandle>> =
        (0..list.n_cell()).map(|i| list.cell_atoms(i).to_vec()).collect();
    assert_eq!(first, second);
    assert_eq!(first.iter().map(Vec::len).sum::<usize>(), 400);
}

#[test]
fn far_atoms_are_rejected() {
    let scene = scene(3, 10, 0);
    let mut list = scene.build();
    list.clear();
    list.place_atom(AtomHandle::Ghost(0), scene.upper + Vector::splat(CUTOFF + 0.1))
        .unwrap();
    list.place_atom(AtomHandle::Ghost(1), scene.lower - Vector::new(0.0, CUTOFF + 0.1, 0.0))
        .unwrap();
    list.build();
    assert_eq!(list.n_atom(), 0);
    assert_eq!(list.n_reject(), 2);
    list.is_valid().unwrap();
}

#[test]
fn atoms_on_cell_planes_land_in_exactly_one_cell() {
    let scene = scene(1, 0, 0);
    let mut list = CellList::new();
    list.allocate(4, scene.lower, scene.upper, Vector::splat(CUTOFF))
        .unwrap();
    // One point on the sub-domain's lower faces, one on the first interior planes.
    let on_planes = [scene.lower, scene.lower + list.cell_lengths()];
    let mut homes = Vec::new();
    for _ in 0..3 {
        list.clear();
        for (i, &position) in on_planes.iter().enumerate() {
            list.place_atom(AtomHandle::Local(i), position).unwrap();
        }
        list.build();
        list.is_valid().unwrap();
        let mut found = Vec::new();
        for cell in 0..list.n_cell() {
            for &handle in list.cell_atoms(cell) {
                found.push((handle, cell));
            }
        }
        found.sort();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, AtomHandle::Local(0));
        assert_eq!(found[1].0, AtomHandle::Local(1));
        homes.push(found);
    }
    assert!(homes.windows(2).all(|w| w[0] == w[1]));
}
