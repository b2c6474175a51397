// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use rand::Rng;
use thiserror::Error;

use crate::{Vector, DIMENSION};

/// Errors raised while constructing a [`Boundary`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundaryError {
    /// Every edge of the periodic box must be finite and strictly positive.
    #[error("box length along axis {axis} must be positive and finite, got {length}")]
    InvalidLength { axis: usize, length: f64 },
}

/// An orthorhombic, fully periodic simulation box with its origin at zero.
///
/// Positions come in two flavors. Cartesian coordinates live in `[0, L_i)` along each axis.
/// Generalized coordinates are the same positions divided by the box lengths, so the primary
/// cell is the unit cube `[0, 1)^3`. Domain decomposition and ghost selection work in
/// generalized coordinates; force evaluation and integration work in Cartesian coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Boundary {
    lengths: Vector,
    inverse_lengths: Vector,
}

impl Boundary {
    /// Creates a box with edge lengths `lengths`.
    pub fn new(lengths: Vector) -> Result<Self, BoundaryError> {
        for axis in 0..DIMENSION {
            let length = lengths[axis];
            if !(length.is_finite() && length > 0.0) {
                return Err(BoundaryError::InvalidLength { axis, length });
            }
        }
        Ok(Self {
            lengths,
            inverse_lengths: lengths.recip(),
        })
    }

    /// Creates a cube of edge length `length`.
    pub fn cubic(length: f64) -> Result<Self, BoundaryError> {
        Self::new(Vector::splat(length))
    }

    pub fn lengths(&self) -> Vector {
        self.lengths
    }

    pub fn length(&self, axis: usize) -> f64 {
        self.lengths[axis]
    }

    pub fn volume(&self) -> f64 {
        self.lengths.x * self.lengths.y * self.lengths.z
    }

    /// Wraps a Cartesian position into the primary cell.
    pub fn shift(&self, r: &mut Vector) {
        for axis in 0..DIMENSION {
            r[axis] = wrap_unit(r[axis] * self.inverse_lengths[axis]) * self.lengths[axis];
        }
    }

    /// Wraps a generalized position into the unit cube.
    pub fn shift_gen(&self, r: &mut Vector) {
        for axis in 0..DIMENSION {
            self.shift_gen_axis(r, axis);
        }
    }

    /// Wraps one component of a generalized position into `[0, 1)`.
    pub fn shift_gen_axis(&self, r: &mut Vector, axis: usize) {
        r[axis] = wrap_unit(r[axis]);
    }

    /// Squared minimum-image distance between two Cartesian positions.
    pub fn distance_sq(&self, r1: Vector, r2: Vector) -> f64 {
        self.min_image(r1 - r2).length_squared()
    }

    /// Minimum-image separation `r1 - r2` between two Cartesian positions.
    pub fn separation(&self, r1: Vector, r2: Vector) -> Vector {
        self.min_image(r1 - r2)
    }

    fn min_image(&self, mut dr: Vector) -> Vector {
        for axis in 0..DIMENSION {
            let l = self.lengths[axis];
            dr[axis] -= l * (dr[axis] * self.inverse_lengths[axis]).round();
        }
        dr
    }

    pub fn transform_cart_to_gen(&self, rc: Vector) -> Vector {
        rc * self.inverse_lengths
    }

    pub fn transform_gen_to_cart(&self, rg: Vector) -> Vector {
        rg * self.lengths
    }

    /// A uniformly distributed Cartesian position inside the primary cell.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector {
        Vector::new(
            rng.gen_range(0.0..self.lengths.x),
            rng.gen_range(0.0..self.lengths.y),
            rng.gen_range(0.0..self.lengths.z),
        )
    }
}

/// `x - floor(x)`, guarded against rounding up to exactly one for tiny negative inputs.
fn wrap_unit(x: f64) -> f64 {
    let w = x - x.floor();
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}


// End of File
