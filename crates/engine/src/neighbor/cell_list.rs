// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

// Cell list over one rank's sub-domain plus a frame of ghost cells.
//
// Along each axis the sub-domain [lower, upper) is cut into n = floor((upper - lower) / cutoff)
// interior cells, each at least one cutoff long, and one extra cell is added on either side
// for ghosts. Atoms are accepted if they lie within one cutoff of the sub-domain.
//
// Building is two passes: `place_atom` records (cell, handle) tags and per-cell counts, then
// `build` turns the counts into offsets and scatters the handles so each cell owns a
// contiguous span of one shared array. Nothing is freed between builds.

use common::{BoundingBox, IntVector, Vector, DIMENSION};

use crate::{AtomHandle, CellListError};

/// One cell: a span of the shared handle array and the cells that follow it in the half
/// shell.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    begin: usize,
    n_atom: usize,
    neighbors: Vec<usize>,
}

impl Cell {
    pub fn n_atom(&self) -> usize {
        self.n_atom
    }

    /// Indices of the (up to 13) neighboring cells that come after this one in lexicographic
    /// offset order. Visiting each cell and its forward neighbors covers every pair of
    /// adjacent cells exactly once.
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }
}

#[derive(Clone, Debug, Default)]
pub struct CellList {
    grid_lower: Vector,
    cell_lengths: Vector,
    grid: IntVector,
    region: BoundingBox,
    cells: Vec<Cell>,
    tags: Vec<(usize, AtomHandle)>,
    handles: Vec<AtomHandle>,
    atom_capacity: usize,
    n_attempt: usize,
    n_reject: usize,
    is_built: bool,
}

impl CellList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves room for `atom_capacity` local plus ghost atoms and lays out the grid for the
    /// region `[lower, upper)`.
    pub fn allocate(
        &mut self,
        atom_capacity: usize,
        lower: Vector,
        upper: Vector,
        cutoffs: Vector,
    ) -> Result<(), CellListError> {
        self.atom_capacity = atom_capacity;
        self.tags = Vec::with_capacity(atom_capacity);
        self.handles = Vec::with_capacity(atom_capacity);
        self.make_grid(lower, upper, cutoffs)
    }

    /// Recomputes the grid for the region `[lower, upper)` with minimum cell lengths `cutoffs`.
    /// Clears any placed atoms.
    pub fn make_grid(
        &mut self,
        lower: Vector,
        upper: Vector,
        cutoffs: Vector,
    ) -> Result<(), CellListError> {
        let mut grid = IntVector::ZERO;
        for axis in 0..DIMENSION {
            let width = upper[axis] - lower[axis];
            let n = (width / cutoffs[axis]).floor();
            if !(n >= 1.0) {
                return Err(CellListError::RegionTooSmall {
                    axis,
                    width,
                    cutoff: cutoffs[axis],
                });
            }
            grid[axis] = n as i32 + 2;
            self.cell_lengths[axis] = width / n;
        }
        self.grid = grid;
        self.grid_lower = lower - self.cell_lengths;
        self.region = BoundingBox::new(lower, upper).expanded(cutoffs);

        let n_cell = (grid.x * grid.y * grid.z) as usize;
        self.cells.clear();
        self.cells.resize_with(n_cell, Cell::default);
        let offsets = forward_offsets();
        for ix in 0..grid.x {
            for iy in 0..grid.y {
                for iz in 0..grid.z {
                    let here = IntVector::new(ix, iy, iz);
                    let neighbors = offsets
                        .iter()
                        .map(|&offset| here + offset)
                        .filter(|&other| {
                            other.cmpge(IntVector::ZERO).all() && other.cmplt(grid).all()
                        })
                        .map(|other| self.flat_index(other))
                        .collect();
                    let cell = self.flat_index(here);
                    self.cells[cell].neighbors = neighbors;
                }
            }
        }
        self.clear();
        Ok(())
    }

    fn flat_index(&self, index: IntVector) -> usize {
        ((index.x * self.grid.y + index.y) * self.grid.z + index.z) as usize
    }

    /// Index of the cell containing `position`, or `None` if it lies more than one cutoff
    /// outside the sub-domain. A position on a cell face belongs to the cell above the face.
    pub fn cell_index_from_position(&self, position: Vector) -> Option<usize> {
        if !self.region.contains(position) {
            return None;
        }
        let mut index = IntVector::ZERO;
        for axis in 0..DIMENSION {
            let i = ((position[axis] - self.grid_lower[axis]) / self.cell_lengths[axis]).floor();
            index[axis] = (i as i32).clamp(0, self.grid[axis] - 1);
        }
        Some(self.flat_index(index))
    }

    /// Records one atom. Positions outside the accepted region only increment the reject
    /// count.
    pub fn place_atom(&mut self, handle: AtomHandle, position: Vector) -> Result<(), CellListError> {
        let Some(cell) = self.cell_index_from_position(position) else {
            self.n_attempt += 1;
            self.n_reject += 1;
            self.is_built = false;
            return Ok(());
        };
        if self.tags.len() == self.atom_capacity {
            return Err(CellListError::CapacityExceeded(self.atom_capacity));
        }
        self.n_attempt += 1;
        self.is_built = false;
        self.tags.push((cell, handle));
        self.cells[cell].n_atom += 1;
        Ok(())
    }

    /// Gathers the placed atoms into contiguous per-cell spans.
    pub fn build(&mut self) {
        let mut begin = 0;
        let mut cursors = Vec::with_capacity(self.cells.len());
        for cell in self.cells.iter_mut() {
            cell.begin = begin;
            cursors.push(begin);
            begin += cell.n_atom;
        }
        self.handles.clear();
        self.handles.resize(self.tags.len(), AtomHandle::Local(0));
        for &(cell, handle) in &self.tags {
            self.handles[cursors[cell]] = handle;
            cursors[cell] += 1;
        }
        self.is_built = true;
    }

    /// Forgets all placed atoms but keeps the grid and memory.
    pub fn clear(&mut self) {
        self.tags.clear();
        self.handles.clear();
        for cell in self.cells.iter_mut() {
            cell.begin = 0;
            cell.n_atom = 0;
        }
        self.n_attempt = 0;
        self.n_reject = 0;
        self.is_built = false;
    }

    pub fn grid_dimensions(&self) -> IntVector {
        self.grid
    }

    pub fn cell_lengths(&self) -> Vector {
        self.cell_lengths
    }

    pub fn n_cell(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    /// Handles of the atoms in cell `index`. Empty until [`CellList::build`].
    pub fn cell_atoms(&self, index: usize) -> &[AtomHandle] {
        if !self.is_built {
            return &[];
        }
        let cell = &self.cells[index];
        &self.handles[cell.begin..cell.begin + cell.n_atom]
    }

    /// Number of atoms placed in cells.
    pub fn n_atom(&self) -> usize {
        self.tags.len()
    }

    /// Number of atoms rejected as out of range since the last clear.
    pub fn n_reject(&self) -> usize {
        self.n_reject
    }

    pub fn is_built(&self) -> bool {
        self.is_built
    }

    /// Calls `f` once for every unordered pair of atoms in the same or adjacent cells, except
    /// pairs of two ghosts.
    pub fn for_each_pair<F>(&self, mut f: F) -> Result<(), CellListError>
    where
        F: FnMut(AtomHandle, AtomHandle),
    {
        if !self.is_built {
            return Err(CellListError::NotBuilt);
        }
        for (index, cell) in self.cells.iter().enumerate() {
            let here = self.cell_atoms(index);
            if here.is_empty() {
                continue;
            }
            for (i, &a) in here.iter().enumerate() {
                for &b in &here[i + 1..] {
                    if !(a.is_ghost() && b.is_ghost()) {
                        f(a, b);
                    }
                }
            }
            for &neighbor in &cell.neighbors {
                for &b in self.cell_atoms(neighbor) {
                    for &a in here {
                        if !(a.is_ghost() && b.is_ghost()) {
                            f(a, b);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks that every attempted atom was either placed or rejected and that each cell's span
    /// holds exactly the atoms tagged for it.
    pub fn is_valid(&self) -> Result<(), CellListError> {
        if self.n_attempt != self.tags.len() + self.n_reject {
            return Err(CellListError::Invalid(format!(
                "{} attempted, {} placed, {} rejected",
                self.n_attempt,
                self.tags.len(),
                self.n_reject
            )));
        }
        let n_counted: usize = self.cells.iter().map(|c| c.n_atom).sum();
        if n_counted != self.tags.len() {
            return Err(CellListError::Invalid(format!(
                "cell counts sum to {n_counted}, {} atoms placed",
                self.tags.len()
            )));
        }
        if !self.is_built {
            return Ok(());
        }
        let mut begin = 0;
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.begin != begin {
                return Err(CellListError::Invalid(format!(
                    "cell {index} begins at {}, expected {begin}",
                    cell.begin
                )));
            }
            begin += cell.n_atom;
        }
        let mut cursors: Vec<usize> = self.cells.iter().map(|c| c.begin).collect();
        for &(cell, handle) in &self.tags {
            if self.handles.get(cursors[cell]) != Some(&handle) {
                return Err(CellListError::Invalid(format!(
                    "{handle:?} is missing from cell {cell}"
                )));
            }
            cursors[cell] += 1;
        }
        Ok(())
    }
}

/// The 13 neighbor offsets that are lexicographically greater than zero.
fn forward_offsets() -> Vec<IntVector> {
    let mut offsets = Vec::with_capacity(13);
    for dx in -1..=1 {
        for dy in -1..=1 {
            for dz in -1..=1 {
                if (dx, dy, dz) > (0, 0, 0) {
                    offsets.push(IntVector::new(dx, dy, dz));
                }
            }
        }
    }
    offsets
}


// End of File
