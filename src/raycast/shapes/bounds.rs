//! Axis-aligned rectangle

use super::{Overlap, assert_shape_mask, slab, test_extent};
use crate::consts::SHAPE_MASK;
use crate::fmin;
use crate::raycast::cast::Cast;

/// Axis-aligned rectangle `[min_x, max_x] x [min_y, max_y]`
#[derive(Debug, Clone)]
pub struct Bounds {
    pub(crate) mask: u32,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    /// Create with the default mask. Panics on non-finite or empty extents.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::with_mask(min_x, min_y, max_x, max_y, SHAPE_MASK)
    }

    pub fn with_mask(min_x: f64, min_y: f64, max_x: f64, max_y: f64, mask: u32) -> Self {
        assert!(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite());
        assert!(min_x < max_x && min_y < max_y, "bounds must have positive area");
        assert_shape_mask(mask);

        Self {
            mask,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub(crate) fn test_bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Overlap {
        test_extent((self.min_x, self.min_y, self.max_x, self.max_y), min_x, min_y, max_x, max_y)
            .unwrap_or(Overlap::Contains)
    }

    #[inline]
    pub(crate) fn contains_point(&self, x: f64, y: f64) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }

    pub(crate) fn compute_hits(&self, cast: &mut Cast) {
        let origin = cast.origin();
        let inv = cast.inv_direction();
        let (time1, time2) = slab(
            ((self.min_x - origin.x) * inv.x, (self.max_x - origin.x) * inv.x),
            ((self.min_y - origin.y) * inv.y, (self.max_y - origin.y) * inv.y),
        );

        if time1 <= fmin(time2, 1.0) {
            if time1 > 0.0 {
                cast.add_hit(time1, self.mask);
            }
            cast.add_hit(time2, self.mask);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_overlap() {
        let b = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(b.test_bounds(20.0, 20.0, 30.0, 30.0), Overlap::Outside);
        assert_eq!(b.test_bounds(5.0, 5.0, 15.0, 15.0), Overlap::Partial);
        assert_eq!(b.test_bounds(2.0, 2.0, 8.0, 8.0), Overlap::Contains);
        // Touching edges still overlap
        assert_eq!(b.test_bounds(10.0, 0.0, 20.0, 10.0), Overlap::Partial);
    }

    #[test]
    fn test_bounds_contains_point_inclusive() {
        let b = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains_point(0.0, 0.0));
        assert!(b.contains_point(10.0, 5.0));
        assert!(!b.contains_point(10.5, 5.0));
    }

    #[test]
    #[should_panic]
    fn test_bounds_empty_panics() {
        Bounds::new(0.0, 0.0, 0.0, 10.0);
    }
}
