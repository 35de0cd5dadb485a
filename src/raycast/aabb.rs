//! Axis-aligned crop boxes

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Closed axis-aligned box used to crop spaces, geometries, and boundaries.
///
/// Infinite extents are allowed on any side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// The box covering all of space
    pub const INFINITE: Aabb = Aabb {
        min: DVec3::splat(f64::NEG_INFINITY),
        max: DVec3::splat(f64::INFINITY),
    };

    /// Create a box. Panics if any axis is inverted or NaN.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        Self { min, max }
    }

    /// Horizontal rectangle with an unbounded elevation range
    pub fn from_rect(min: DVec2, max: DVec2) -> Self {
        Self::new(min.extend(f64::NEG_INFINITY), max.extend(f64::INFINITY))
    }

    /// Smallest box containing both points
    pub fn from_corners(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[inline]
    pub fn min_xy(&self) -> DVec2 {
        self.min.truncate()
    }

    #[inline]
    pub fn max_xy(&self) -> DVec2 {
        self.max.truncate()
    }

    /// Intersection of two boxes, or `None` if they are disjoint
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min.x <= max.x && min.y <= max.y && min.z <= max.z {
            Some(Aabb { min, max })
        } else {
            None
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::INFINITE
    }
}
