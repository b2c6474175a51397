// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use common::{ids::Rank, Boundary, BoundingBox, IntVector, Vector, DIMENSION};

use crate::DomainError;

/// Direction along one axis of the process grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards lower coordinates.
    Down = 0,
    /// Towards higher coordinates.
    Up = 1,
}

impl Direction {
    /// The order in which every protocol visits the two faces of an axis.
    pub const ALL: [Direction; 2] = [Direction::Down, Direction::Up];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
        }
    }

    fn step(self) -> i32 {
        match self {
            Direction::Down => -1,
            Direction::Up => 1,
        }
    }
}

/// One rank's view of a regular grid of sub-domains over the periodic box.
///
/// Sub-domains are defined in generalized coordinates: the one at grid index `(i, j, k)` covers
/// `[i/P0, (i+1)/P0) x [j/P1, (j+1)/P1) x [k/P2, (k+1)/P2)`. Ranks are laid out with the last
/// axis varying fastest, `rank = (i * P1 + j) * P2 + k`.
///
/// Ownership is decided by the integer grid coordinate `floor(r_i * P_i)`, both for this rank's
/// own membership test and for the owner of an arbitrary position, so every rank reaches the
/// same verdict for the same bits.
#[derive(Clone, Debug)]
pub struct Domain {
    boundary: Boundary,
    grid_dimensions: IntVector,
    grid_index: IntVector,
    rank: Rank,
    bounds: BoundingBox,
    neighbors: [[Rank; 2]; DIMENSION],
}

impl Domain {
    /// Places `rank` in a `grid` of sub-domains over `boundary`. `size` is the communicator size
    /// and must equal the number of sub-domains.
    pub fn new(
        boundary: Boundary,
        grid: [usize; 3],
        rank: Rank,
        size: usize,
    ) -> Result<Self, DomainError> {
        if grid.contains(&0) {
            return Err(DomainError::EmptyGrid { grid });
        }
        let expected = grid.iter().product();
        if size != expected {
            return Err(DomainError::SizeMismatch {
                grid,
                expected,
                size,
            });
        }
        let grid_dimensions = IntVector::new(grid[0] as i32, grid[1] as i32, grid[2] as i32);
        let grid_index = index_of(grid_dimensions, rank);
        let dims = grid_dimensions.as_dvec3();
        let bounds = BoundingBox::new(
            grid_index.as_dvec3() / dims,
            (grid_index + IntVector::ONE).as_dvec3() / dims,
        );

        let mut domain = Self {
            boundary,
            grid_dimensions,
            grid_index,
            rank,
            bounds,
            neighbors: [[rank; 2]; DIMENSION],
        };
        for axis in 0..DIMENSION {
            for direction in Direction::ALL {
                let mut index = grid_index;
                index[axis] += direction.step();
                domain.neighbors[axis][direction.index()] = domain.rank_of(index);
            }
        }
        Ok(domain)
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn grid_dimensions(&self) -> IntVector {
        self.grid_dimensions
    }

    /// Number of processes along `axis`.
    pub fn grid_dimension(&self, axis: usize) -> usize {
        self.grid_dimensions[axis] as usize
    }

    pub fn grid_index(&self) -> IntVector {
        self.grid_index
    }

    /// Generalized bounds of this rank's sub-domain.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Cartesian bounds of this rank's sub-domain.
    pub fn cartesian_bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.boundary.transform_gen_to_cart(self.bounds.min),
            self.boundary.transform_gen_to_cart(self.bounds.max),
        )
    }

    /// Rank at `index` in the process grid, wrapping periodically.
    pub fn rank_of(&self, index: IntVector) -> Rank {
        let wrapped = IntVector::new(
            index.x.rem_euclid(self.grid_dimensions.x),
            index.y.rem_euclid(self.grid_dimensions.y),
            index.z.rem_euclid(self.grid_dimensions.z),
        );
        ((wrapped.x * self.grid_dimensions.y + wrapped.y) * self.grid_dimensions.z + wrapped.z)
            as Rank
    }

    /// The face neighbor of this rank along `axis` in `direction`.
    pub fn neighbor_rank(&self, axis: usize, direction: Direction) -> Rank {
        self.neighbors[axis][direction.index()]
    }

    /// Integer grid coordinate of a generalized position along `axis`, without periodic
    /// wrapping. Positions left of the primary cell give negative values.
    pub fn grid_coordinate(&self, position: Vector, axis: usize) -> i32 {
        (position[axis] * self.grid_dimensions[axis] as f64).floor() as i32
    }

    /// True if the generalized `position` lies in this rank's sub-domain. Periodic images
    /// outside the primary cell are never in the domain.
    pub fn is_in_domain(&self, position: Vector) -> bool {
        (0..DIMENSION).all(|axis| self.grid_coordinate(position, axis) == self.grid_index[axis])
    }

    /// Cartesian counterpart of [`Domain::is_in_domain`].
    pub fn is_in_domain_cartesian(&self, position: Vector) -> bool {
        self.is_in_domain(self.boundary.transform_cart_to_gen(position))
    }

    /// The rank owning the generalized `position`, after wrapping it into the primary cell.
    pub fn owner_rank(&self, mut position: Vector) -> Rank {
        self.boundary.shift_gen(&mut position);
        let index = IntVector::new(
            self.grid_coordinate(position, 0),
            self.grid_coordinate(position, 1),
            self.grid_coordinate(position, 2),
        );
        self.rank_of(index)
    }

    /// Checks that every sub-domain is at least `cutoff` wide, so ghosts only ever come from
    /// face neighbors.
    pub fn check_cutoff(&self, cutoff: f64) -> Result<(), DomainError> {
        if !(cutoff.is_finite() && cutoff > 0.0) {
            return Err(DomainError::InvalidCutoff(cutoff));
        }
        for axis in 0..DIMENSION {
            let width = self.boundary.length(axis) / self.grid_dimension(axis) as f64;
            if width < cutoff {
                return Err(DomainError::CutoffTooLarge {
                    axis,
                    width,
                    cutoff,
                });
            }
        }
        Ok(())
    }
}

fn index_of(grid_dimensions: IntVector, rank: Rank) -> IntVector {
    let rank = rank as i32;
    let z = rank % grid_dimensions.z;
    let y = (rank / grid_dimensions.z) % grid_dimensions.y;
    let x = rank / (grid_dimensions.z * grid_dimensions.y);
    IntVector::new(x, y, z)
}


// End of File
