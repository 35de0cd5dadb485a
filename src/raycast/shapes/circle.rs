//! Circle

use super::{Overlap, assert_shape_mask, unit_circle_times};
use crate::consts::SHAPE_MASK;
use crate::raycast::cast::Cast;

#[derive(Debug, Clone)]
pub struct Circle {
    pub(crate) mask: u32,
    center_x: f64,
    center_y: f64,
    radius: f64,
}

impl Circle {
    /// Create with the default mask. Panics unless the radius is positive and finite.
    pub fn new(center_x: f64, center_y: f64, radius: f64) -> Self {
        Self::with_mask(center_x, center_y, radius, SHAPE_MASK)
    }

    pub fn with_mask(center_x: f64, center_y: f64, radius: f64, mask: u32) -> Self {
        assert!(center_x.is_finite() && center_y.is_finite() && radius.is_finite());
        assert!(radius > 0.0, "circle radius must be positive");
        assert_shape_mask(mask);

        Self {
            mask,
            center_x,
            center_y,
            radius,
        }
    }

    pub(crate) fn test_bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Overlap {
        let (cx, cy, r) = (self.center_x, self.center_y, self.radius);

        if cx + r < min_x || max_x < cx - r || cy + r < min_y || max_y < cy - r {
            return Overlap::Outside;
        }
        if cx - r > min_x || max_x > cx + r || cy - r > min_y || max_y > cy + r {
            return Overlap::Partial;
        }

        // All four corners must lie inside
        let r2 = r * r;
        for (x, y) in [(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y)] {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy > r2 {
                return Overlap::Partial;
            }
        }
        Overlap::Contains
    }

    #[inline]
    pub(crate) fn contains_point(&self, x: f64, y: f64) -> bool {
        let (dx, dy) = (x - self.center_x, y - self.center_y);
        dx * dx + dy * dy <= self.radius * self.radius
    }

    pub(crate) fn compute_hits(&self, cast: &mut Cast) {
        let origin = cast.origin();
        let direction = cast.direction();
        let inv_radius = 1.0 / self.radius;

        let Some((time1, time2)) = unit_circle_times(
            (origin.x - self.center_x) * inv_radius,
            (origin.y - self.center_y) * inv_radius,
            direction.x * inv_radius,
            direction.y * inv_radius,
        ) else {
            return;
        };

        if time1 > 0.0 {
            cast.add_hit(time1, self.mask);
        }
        if time2 > 0.0 {
            cast.add_hit(time2, self.mask);
        }
    }
}
