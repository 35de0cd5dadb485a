//! Simple polygon with even-odd containment
//!
//! Vertices are snapped to the integer grid at construction so that
//! crossings are stable across casts.

use glam::DVec2;

use super::{Overlap, assert_shape_mask, slab, test_extent};
use crate::consts::SHAPE_MASK;
use crate::raycast::cast::Cast;
use crate::{fmax, fmin, snap};

#[derive(Debug, Clone)]
pub struct Polygon {
    pub(crate) mask: u32,
    points: Vec<DVec2>,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Polygon {
    /// Create with the default mask. Panics unless there are at least three
    /// vertices spanning both axes.
    pub fn new(points: &[DVec2]) -> Self {
        Self::with_mask(points, SHAPE_MASK)
    }

    pub fn with_mask(points: &[DVec2], mask: u32) -> Self {
        assert!(points.len() >= 3, "polygon needs at least three vertices");
        assert!(points.iter().all(|p| p.is_finite()));
        assert_shape_mask(mask);

        let points: Vec<DVec2> = points.iter().map(|p| DVec2::new(snap(p.x), snap(p.y))).collect();
        let (mut min_x, mut min_y) = (points[0].x, points[0].y);
        let (mut max_x, mut max_y) = (min_x, min_y);
        for p in &points[1..] {
            min_x = fmin(min_x, p.x);
            min_y = fmin(min_y, p.y);
            max_x = fmax(max_x, p.x);
            max_y = fmax(max_y, p.y);
        }
        assert!(min_x < max_x && min_y < max_y, "polygon must span both axes");

        Self {
            mask,
            points,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Snapped vertices
    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    /// Iterate edges as (previous, current) vertex pairs, closing the ring
    fn edges(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        let last = self.points[self.points.len() - 1];
        std::iter::once(last)
            .chain(self.points.iter().copied())
            .zip(self.points.iter().copied())
    }

    fn crossing_parity(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        for (p0, p1) in self.edges() {
            if (p1.y > y) != (p0.y > y) && x < (p0.x - p1.x) * ((y - p1.y) / (p0.y - p1.y)) + p1.x {
                inside = !inside;
            }
        }
        inside
    }

    pub(crate) fn test_bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Overlap {
        let extent = (self.min_x, self.min_y, self.max_x, self.max_y);
        if let Some(overlap) = test_extent(extent, min_x, min_y, max_x, max_y) {
            return overlap;
        }

        if !self.crossing_parity((min_x + max_x) * 0.5, (min_y + max_y) * 0.5) {
            return Overlap::Partial;
        }

        // The center is inside; the box is contained unless an edge enters it
        for (p0, p1) in self.edges() {
            let px = 1.0 / (p1.x - p0.x);
            let py = 1.0 / (p1.y - p0.y);
            let (time1, time2) = slab(
                ((min_x - p0.x) * px, (max_x - p0.x) * px),
                ((min_y - p0.y) * py, (max_y - p0.y) * py),
            );
            if time1 <= fmin(time2, 1.0) {
                return Overlap::Partial;
            }
        }
        Overlap::Contains
    }

    pub(crate) fn contains_point(&self, x: f64, y: f64) -> bool {
        if x < self.min_x || x > self.max_x || y < self.min_y || y > self.max_y {
            return false;
        }
        self.crossing_parity(x, y)
    }

    pub(crate) fn compute_hits(&self, cast: &mut Cast) {
        let origin = cast.origin();
        let inv = cast.inv_direction();
        let (time1, time2) = slab(
            ((self.min_x - origin.x) * inv.x, (self.max_x - origin.x) * inv.x),
            ((self.min_y - origin.y) * inv.y, (self.max_y - origin.y) * inv.y),
        );
        if time1 > fmin(time2, 1.0) {
            return;
        }

        let direction = cast.direction();
        for (p0, p1) in self.edges() {
            let dx = p1.x - p0.x;
            let dy = p1.y - p0.y;
            let q = direction.x * dy - direction.y * dx;
            if q == 0.0 {
                continue;
            }

            let ox = p0.x - origin.x;
            let oy = p0.y - origin.y;
            let u = (ox * direction.y - oy * direction.x) / q;
            // Each shared vertex counts for exactly one of its two edges
            if u < 0.0 || u > 1.0 || (u == 0.0 && q > 0.0) || (u == 1.0 && q < 0.0) {
                continue;
            }

            let time = (ox * dy - oy * dx) / q;
            if time > 0.0 {
                cast.add_hit(time, self.mask);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(&[
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
        ])
    }

    #[test]
    fn test_polygon_snaps_vertices() {
        let p = Polygon::new(&[DVec2::new(0.4, 0.2), DVec2::new(9.7, 0.0), DVec2::new(5.0, 8.6)]);
        assert_eq!(p.points()[0], DVec2::new(0.0, 0.0));
        assert_eq!(p.points()[1], DVec2::new(10.0, 0.0));
        assert_eq!(p.points()[2], DVec2::new(5.0, 9.0));
    }

    #[test]
    fn test_polygon_contains_point() {
        let p = square();
        assert!(p.contains_point(5.0, 5.0));
        assert!(!p.contains_point(15.0, 5.0));
        assert!(!p.contains_point(5.0, -1.0));
    }

    #[test]
    fn test_polygon_concave_overlap() {
        // U shape opening upward
        let p = Polygon::new(&[
            DVec2::new(0.0, 0.0),
            DVec2::new(30.0, 0.0),
            DVec2::new(30.0, 30.0),
            DVec2::new(20.0, 30.0),
            DVec2::new(20.0, 10.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(10.0, 30.0),
            DVec2::new(0.0, 30.0),
        ]);
        assert!(!p.contains_point(15.0, 20.0));
        assert_eq!(p.test_bounds(2.0, 2.0, 8.0, 8.0), Overlap::Contains);
        // Wide box below the notch
        assert_eq!(p.test_bounds(2.0, 2.0, 28.0, 8.0), Overlap::Contains);
        // Center in the left arm, but a notch edge cuts through the box
        assert_eq!(p.test_bounds(2.0, 2.0, 12.0, 28.0), Overlap::Partial);
        // Center in the notch
        assert_eq!(p.test_bounds(12.0, 12.0, 18.0, 28.0), Overlap::Partial);
    }

    #[test]
    #[should_panic]
    fn test_polygon_collinear_panics() {
        Polygon::new(&[DVec2::new(0.0, 0.0), DVec2::new(5.0, 0.0), DVec2::new(10.0, 0.0)]);
    }

    #[test]
    #[should_panic]
    fn test_polygon_too_few_vertices_panics() {
        Polygon::new(&[DVec2::new(0.0, 0.0), DVec2::new(5.0, 5.0)]);
    }
}
