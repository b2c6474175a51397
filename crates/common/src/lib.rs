// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file,
// You can obtain one at <https://mozilla.org/MPL/2.0/>.

//! Geometry shared by every part of the engine: the periodic simulation box, axis-aligned
//! bounds in either coordinate system, and the identifier types used to name atoms, groups
//! and processes.

mod boundary;
mod bounding_box;
pub mod ids;

pub use boundary::{Boundary, BoundaryError};
pub use bounding_box::BoundingBox;

/// Positions, velocities and forces.
pub type Vector = glam::DVec3;
/// Integer grid coordinates (process grid, cell grid).
pub type IntVector = glam::IVec3;

/// Number of spatial dimensions.
pub const DIMENSION: usize = 3;

// End of File
