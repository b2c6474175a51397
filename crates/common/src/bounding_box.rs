// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

use crate::Vector;

/// An axis-aligned box defined by two opposite corners (`min` and `max`).
/// `min.x <= max.x`, `min.y <= max.y`, `min.z <= max.z`.
///
/// Sub-domains are closed on the `min` faces and open on the `max` faces, so that adjacent
/// boxes of a regular grid never both claim a point.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vector,
    pub max: Vector,
}

impl BoundingBox {
    pub fn new(min: Vector, max: Vector) -> Self {
        Self { min, max }
    }

    /// Edge lengths along each axis.
    pub fn size(&self) -> Vector {
        self.max - self.min
    }

    /// Returns true if `point` lies inside the half-open box `[min, max)`.
    pub fn contains(&self, point: Vector) -> bool {
        self.min.x <= point.x
            && point.x < self.max.x
            && self.min.y <= point.y
            && point.y < self.max.y
            && self.min.z <= point.z
            && point.z < self.max.z
    }

    /// Returns a copy of this box grown by `margin[i]` on both faces of axis `i`.
    pub fn expanded(&self, margin: Vector) -> Self {
        Self {
            min: self.min - margin,
            max: self.max + margin,
        }
    }
}


// End of File
