//! Rotated ellipse
//!
//! Mapped to the unit circle by an affine transform, so ray intersection and
//! containment reduce to the circle case.

use super::{Affine, Overlap, assert_shape_mask, test_extent, unit_circle_times};
use crate::consts::SHAPE_MASK;
use crate::raycast::cast::Cast;

#[derive(Debug, Clone)]
pub struct Ellipse {
    pub(crate) mask: u32,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    transform: Affine,
}

impl Ellipse {
    /// Create with the default mask; `rotation` is in radians.
    pub fn new(center_x: f64, center_y: f64, radius_x: f64, radius_y: f64, rotation: f64) -> Self {
        Self::with_mask(center_x, center_y, radius_x, radius_y, rotation, SHAPE_MASK)
    }

    pub fn with_mask(
        center_x: f64,
        center_y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        mask: u32,
    ) -> Self {
        assert!(center_x.is_finite() && center_y.is_finite() && rotation.is_finite());
        assert!(radius_x.is_finite() && radius_y.is_finite());
        assert!(radius_x > 0.0 && radius_y > 0.0, "ellipse radii must be positive");
        assert_shape_mask(mask);

        let (sin, cos) = rotation.sin_cos();
        let delta_x = (radius_x * cos).hypot(radius_y * sin);
        let delta_y = (radius_x * sin).hypot(radius_y * cos);
        let scale_x = cos / radius_x;
        let skew_x = -sin / radius_y;
        let skew_y = sin / radius_x;
        let scale_y = cos / radius_y;

        Self {
            mask,
            min_x: center_x - delta_x,
            min_y: center_y - delta_y,
            max_x: center_x + delta_x,
            max_y: center_y + delta_y,
            transform: Affine {
                scale_x,
                skew_x,
                skew_y,
                scale_y,
                translation_x: -(center_x * scale_x + center_y * skew_y),
                translation_y: -(center_x * skew_x + center_y * scale_y),
            },
        }
    }

    pub(crate) fn test_bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Overlap {
        let extent = (self.min_x, self.min_y, self.max_x, self.max_y);
        if let Some(overlap) = test_extent(extent, min_x, min_y, max_x, max_y) {
            return overlap;
        }

        for (x, y) in [(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y)] {
            if !self.contains_point(x, y) {
                return Overlap::Partial;
            }
        }
        Overlap::Contains
    }

    #[inline]
    pub(crate) fn contains_point(&self, x: f64, y: f64) -> bool {
        let x0 = self.transform.apply_x(x, y);
        let y0 = self.transform.apply_y(x, y);
        x0 * x0 + y0 * y0 <= 1.0
    }

    pub(crate) fn compute_hits(&self, cast: &mut Cast) {
        let origin = cast.origin();
        let direction = cast.direction();
        let m = &self.transform;
        let (dx, dy) = m.apply_vector(direction.x, direction.y);

        let Some((time1, time2)) =
            unit_circle_times(m.apply_x(origin.x, origin.y), m.apply_y(origin.x, origin.y), dx, dy)
        else {
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
