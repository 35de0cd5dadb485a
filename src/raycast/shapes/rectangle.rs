//! Rotated rectangle
//!
//! Mapped to the unit square `[0, 1]²` by an affine transform; ray hits use
//! the slab method in that frame.

use super::{Affine, Overlap, assert_shape_mask, rotated_extent, slab, test_extent};
use crate::consts::SHAPE_MASK;
use crate::fmin;
use crate::raycast::cast::Cast;

#[derive(Debug, Clone)]
pub struct Rectangle {
    pub(crate) mask: u32,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    transform: Affine,
}

impl Rectangle {
    /// Create with the default mask. `width`/`height` are full extents and
    /// `rotation` is in radians around the center.
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64, rotation: f64) -> Self {
        Self::with_mask(center_x, center_y, width, height, rotation, SHAPE_MASK)
    }

    pub fn with_mask(
        center_x: f64,
        center_y: f64,
        width: f64,
        height: f64,
        rotation: f64,
        mask: u32,
    ) -> Self {
        assert!(center_x.is_finite() && center_y.is_finite() && rotation.is_finite());
        assert!(width.is_finite() && height.is_finite());
        assert!(width > 0.0 && height > 0.0, "rectangle size must be positive");
        assert_shape_mask(mask);

        let (sin, cos) = rotation.sin_cos();
        let (hw, hh) = (width * 0.5, height * 0.5);
        let (min_x, min_y, max_x, max_y) = rotated_extent(center_x, center_y, cos, sin, (-hw, hw, -hh, hh));
        let scale_x = cos / width;
        let skew_x = -sin / height;
        let skew_y = sin / width;
        let scale_y = cos / height;

        Self {
            mask,
            min_x,
            min_y,
            max_x,
            max_y,
            transform: Affine {
                scale_x,
                skew_x,
                skew_y,
                scale_y,
                translation_x: 0.5 - (center_x * scale_x + center_y * skew_y),
                translation_y: 0.5 - (center_x * skew_x + center_y * scale_y),
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
        if !(0.0..=1.0).contains(&x0) {
            return false;
        }
        let y0 = self.transform.apply_y(x, y);
        (0.0..=1.0).contains(&y0)
    }

    pub(crate) fn compute_hits(&self, cast: &mut Cast) {
        let origin = cast.origin();
        let direction = cast.direction();
        let m = &self.transform;
        let x = m.apply_x(origin.x, origin.y);
        let y = m.apply_y(origin.x, origin.y);
        let (dx, dy) = m.apply_vector(direction.x, direction.y);
        let px = -1.0 / dx;
        let py = -1.0 / dy;

        let (time1, time2) = slab((x * px, (x - 1.0) * px), (y * py, (y - 1.0) * py));

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
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_rectangle_axis_aligned() {
        let r = Rectangle::new(10.0, 10.0, 20.0, 10.0, 0.0);
        assert!(r.contains_point(0.0, 5.0));
        assert!(r.contains_point(20.0, 15.0));
        assert!(!r.contains_point(10.0, 16.0));
        assert_eq!(r.test_bounds(2.0, 6.0, 18.0, 14.0), Overlap::Contains);
    }

    #[test]
    fn test_rectangle_rotated_extent() {
        // Unit-less square rotated 45 degrees becomes a diamond
        let r = Rectangle::new(0.0, 0.0, 10.0, 10.0, FRAC_PI_4);
        let half_diagonal = 50.0f64.sqrt();
        assert!((r.max_x - half_diagonal).abs() < 1e-9);
        assert!((r.min_y + half_diagonal).abs() < 1e-9);
        assert!(r.contains_point(0.0, 7.0));
        assert!(!r.contains_point(5.0, 5.0));
        // Box corners fall outside the diamond even though the box fits its extent
        assert_eq!(r.test_bounds(-6.0, -6.0, 6.0, 6.0), Overlap::Partial);
        assert_eq!(r.test_bounds(-2.0, -2.0, 2.0, 2.0), Overlap::Contains);
    }
}
