//! Ray Limits - volumetric range limits for 2.5D rays
//!
//! Core modules:
//! - `raycast`: Shapes, boundaries, volumes, spaces, and the energy-integrating ray
//! - `caster`: Point-source casters that crop a space into octants around the origin
//! - `constraint`: Clips a source polygon against a space by marching quadrants
//! - `limits`: Owning registry of regions and behaviors, memoized per sense
//! - `scene`: Serializable scene descriptors and their validation
//! - `settings`: Grid, distance, and precision configuration

pub mod caster;
pub mod constraint;
pub mod limits;
pub mod raycast;
pub mod scene;
pub mod settings;

pub use caster::{PointSourceRayCaster, SoundSource, VisionSource};
pub use constraint::{PolygonConstraint, SourcePolygon};
pub use limits::{Limits, PerceptionUpdate, Sense};
pub use raycast::{Aabb, Boundary, Geometry, Mode, Ray, Region, Shape, Space, Volume};
pub use scene::{SceneDescriptor, SceneError};
pub use settings::{PrecisionPreset, Settings};

use glam::DVec3;

/// Engine constants
pub mod consts {
    /// Mask bit toggled by crossing a region's bottom or top elevation plane
    pub const ELEVATION_MASK: u32 = 1 << 31;
    /// Largest mask a shape may carry (31 bits)
    pub const SHAPE_MASK: u32 = 0x7FFF_FFFF;
    /// Initial parity of a region or geometry: every bit unresolved
    pub const FULL_STATE: u32 = u32::MAX;

    /// Distance tolerance (pixels) for the fast paths and the final snap to the target
    pub const DISTANCE_EPSILON: f64 = 0.5 / 256.0;
    /// Upper bound on the cost rate used while debiting energy between events
    pub const MAX_COST_RATE: f64 = 256.0;
    /// Remaining energy below this fraction of the budget counts as exhausted
    pub const ENERGY_EPSILON: f64 = 1e-12;

    /// Initial capacity of a cast's hit pool
    pub const HIT_POOL_CAPACITY: usize = 64;
}

/// Minimum that returns `y` whenever the comparison fails (including NaN in `x`)
#[inline]
pub fn fmin(x: f64, y: f64) -> f64 {
    if x < y { x } else { y }
}

/// Maximum that returns `y` whenever the comparison fails (including NaN in `x`)
#[inline]
pub fn fmax(x: f64, y: f64) -> f64 {
    if x > y { x } else { y }
}

/// Snap a coordinate to the integer grid (ties to even)
#[inline]
pub fn snap(v: f64) -> f64 {
    v.round_ties_even()
}

/// Snap every component of a point to the integer grid
#[inline]
pub fn snap3(v: DVec3) -> DVec3 {
    DVec3::new(snap(v.x), snap(v.y), snap(v.z))
}
