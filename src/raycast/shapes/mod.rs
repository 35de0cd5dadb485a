//! Two-dimensional shape primitives
//!
//! Every shape answers three questions:
//! - how it overlaps a crop box (`test_bounds`)
//! - whether it contains a point (`contains_point`)
//! - where a ray segment crosses its outline (`compute_hits`)
//!
//! A shape carries a nonzero 31-bit mask that is XORed into its region's
//! state at every crossing.

pub mod bounds;
pub mod circle;
pub mod ellipse;
pub mod polygon;
pub mod rectangle;
pub mod sdf;
pub mod tile;

pub use bounds::Bounds;
pub use circle::Circle;
pub use ellipse::Ellipse;
pub use polygon::Polygon;
pub use rectangle::Rectangle;
pub use tile::{Tile, TileTexture};

use super::aabb::Aabb;
use super::cast::Cast;
use crate::consts::SHAPE_MASK;

/// Result of testing a shape against a crop box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// Shape and box are disjoint
    Outside,
    /// The outline may cross the box
    Partial,
    /// The box lies entirely inside the shape
    Contains,
}

/// Closed set of shape primitives
#[derive(Debug, Clone)]
pub enum Shape {
    Bounds(Bounds),
    Circle(Circle),
    Ellipse(Ellipse),
    Rectangle(Rectangle),
    Polygon(Polygon),
    Tile(Tile),
}

impl Shape {
    #[inline]
    pub fn mask(&self) -> u32 {
        match self {
            Shape::Bounds(s) => s.mask,
            Shape::Circle(s) => s.mask,
            Shape::Ellipse(s) => s.mask,
            Shape::Rectangle(s) => s.mask,
            Shape::Polygon(s) => s.mask,
            Shape::Tile(s) => s.mask,
        }
    }

    /// Sort key grouping shapes of the same kind together
    #[inline]
    pub(crate) fn kind_order(&self) -> u8 {
        match self {
            Shape::Bounds(_) => 0,
            Shape::Circle(_) => 1,
            Shape::Ellipse(_) => 2,
            Shape::Rectangle(_) => 3,
            Shape::Polygon(_) => 4,
            Shape::Tile(_) => 5,
        }
    }

    /// Test the shape against the horizontal extent of a box
    pub fn test_bounds(&self, bbox: &Aabb) -> Overlap {
        let (min_x, min_y, max_x, max_y) = (bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y);
        match self {
            Shape::Bounds(s) => s.test_bounds(min_x, min_y, max_x, max_y),
            Shape::Circle(s) => s.test_bounds(min_x, min_y, max_x, max_y),
            Shape::Ellipse(s) => s.test_bounds(min_x, min_y, max_x, max_y),
            Shape::Rectangle(s) => s.test_bounds(min_x, min_y, max_x, max_y),
            Shape::Polygon(s) => s.test_bounds(min_x, min_y, max_x, max_y),
            Shape::Tile(s) => s.test_bounds(min_x, min_y, max_x, max_y),
        }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        match self {
            Shape::Bounds(s) => s.contains_point(x, y),
            Shape::Circle(s) => s.contains_point(x, y),
            Shape::Ellipse(s) => s.contains_point(x, y),
            Shape::Rectangle(s) => s.contains_point(x, y),
            Shape::Polygon(s) => s.contains_point(x, y),
            Shape::Tile(s) => s.contains_point(x, y),
        }
    }

    /// Record the crossings of the cast's segment with the outline.
    ///
    /// Only called when the horizontal direction of the cast is nonzero.
    pub fn compute_hits(&self, cast: &mut Cast) {
        match self {
            Shape::Bounds(s) => s.compute_hits(cast),
            Shape::Circle(s) => s.compute_hits(cast),
            Shape::Ellipse(s) => s.compute_hits(cast),
            Shape::Rectangle(s) => s.compute_hits(cast),
            Shape::Polygon(s) => s.compute_hits(cast),
            Shape::Tile(s) => s.compute_hits(cast),
        }
    }
}

impl From<Bounds> for Shape {
    fn from(s: Bounds) -> Self {
        Shape::Bounds(s)
    }
}

impl From<Circle> for Shape {
    fn from(s: Circle) -> Self {
        Shape::Circle(s)
    }
}

impl From<Ellipse> for Shape {
    fn from(s: Ellipse) -> Self {
        Shape::Ellipse(s)
    }
}

impl From<Rectangle> for Shape {
    fn from(s: Rectangle) -> Self {
        Shape::Rectangle(s)
    }
}

impl From<Polygon> for Shape {
    fn from(s: Polygon) -> Self {
        Shape::Polygon(s)
    }
}

impl From<Tile> for Shape {
    fn from(s: Tile) -> Self {
        Shape::Tile(s)
    }
}

/// Panics unless `mask` is a nonzero 31-bit value
#[inline]
pub(crate) fn assert_shape_mask(mask: u32) {
    assert!(mask != 0 && mask & SHAPE_MASK == mask, "invalid shape mask {mask:#x}");
}

/// Affine map from world space into a shape's local frame
#[derive(Debug, Clone, Copy)]
pub(crate) struct Affine {
    pub scale_x: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub scale_y: f64,
    pub translation_x: f64,
    pub translation_y: f64,
}

impl Affine {
    #[inline]
    pub fn apply_x(&self, x: f64, y: f64) -> f64 {
        self.scale_x * x + self.skew_y * y + self.translation_x
    }

    #[inline]
    pub fn apply_y(&self, x: f64, y: f64) -> f64 {
        self.skew_x * x + self.scale_y * y + self.translation_y
    }

    /// Transform a direction (no translation)
    #[inline]
    pub fn apply_vector(&self, dx: f64, dy: f64) -> (f64, f64) {
        (
            self.scale_x * dx + self.skew_y * dy,
            self.skew_x * dx + self.scale_y * dy,
        )
    }
}

/// Axis-aligned extent of a centered box of half-size (`l..r`, `t..b`) rotated by (`cos`, `sin`)
pub(crate) fn rotated_extent(
    center_x: f64,
    center_y: f64,
    cos: f64,
    sin: f64,
    (l, r, t, b): (f64, f64, f64, f64),
) -> (f64, f64, f64, f64) {
    let xs = [cos * l - sin * t, cos * r - sin * t, cos * r - sin * b, cos * l - sin * b];
    let ys = [sin * l + cos * t, sin * r + cos * t, sin * r + cos * b, sin * l + cos * b];
    let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min) + center_x;
    let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max) + center_x;
    let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min) + center_y;
    let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max) + center_y;
    (min_x, min_y, max_x, max_y)
}

/// Shared outer test: disjoint boxes are `Outside`, a box not inside the
/// shape's extent is `Partial`, otherwise `None` to defer to the exact test.
#[inline]
pub(crate) fn test_extent(
    (x0, y0, x1, y1): (f64, f64, f64, f64),
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Option<Overlap> {
    use crate::{fmax, fmin};

    if fmax(x0, min_x) > fmin(x1, max_x) || fmax(y0, min_y) > fmin(y1, max_y) {
        return Some(Overlap::Outside);
    }
    if x0 > min_x || max_x > x1 || y0 > min_y || max_y > y1 {
        return Some(Overlap::Partial);
    }
    None
}

/// Slab clip of the segment against a box, returning the entry and exit
/// times (entry clamped to zero). The segment overlaps the box when
/// `time1 <= min(time2, 1)`.
#[inline]
pub(crate) fn slab(
    (tx1, tx2): (f64, f64),
    (ty1, ty2): (f64, f64),
) -> (f64, f64) {
    use crate::{fmax, fmin};

    let mut time1 = fmin(fmax(tx1, 0.0), fmax(tx2, 0.0));
    let mut time2 = fmax(fmin(tx1, f64::INFINITY), fmin(tx2, f64::INFINITY));
    time1 = fmin(fmax(ty1, time1), fmax(ty2, time1));
    time2 = fmax(fmin(ty1, time2), fmin(ty2, time2));
    (time1, time2)
}

/// Quadratic intersection of a segment with the unit circle in local space.
///
/// Returns `None` for a miss or a tangent graze.
pub(crate) fn unit_circle_times(x: f64, y: f64, dx: f64, dy: f64) -> Option<(f64, f64)> {
    let a = dx * dx + dy * dy;
    let b = dx * x + dy * y;
    let c = x * x + y * y - 1.0;

    if c != 0.0 {
        let d = b * b - a * c;
        if d <= 1e-6 {
            return None;
        }
        let f = d.sqrt();
        if b != 0.0 {
            // Numerically stable root first, the other from the product of roots
            let time1 = (-b - b.signum() * f) / a;
            Some((time1, c / (a * time1)))
        } else {
            let time1 = f / a;
            Some((time1, -time1))
        }
    } else {
        // Origin on the outline
        Some((0.0, -b / a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_circle_times_through_center() {
        // From (-2, 0) moving +4 in x crosses at x=-1 and x=1
        let (t1, t2) = unit_circle_times(-2.0, 0.0, 4.0, 0.0).unwrap();
        let (lo, hi) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        assert!((lo - 0.25).abs() < 1e-12);
        assert!((hi - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_unit_circle_times_miss_and_tangent() {
        assert!(unit_circle_times(-2.0, 2.0, 4.0, 0.0).is_none());
        // Tangent at y=1
        assert!(unit_circle_times(-2.0, 1.0, 4.0, 0.0).is_none());
    }

    #[test]
    fn test_unit_circle_times_on_outline() {
        let (t1, t2) = unit_circle_times(-1.0, 0.0, 2.0, 0.0).unwrap();
        assert_eq!(t1, 0.0);
        assert!((t2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_slab_inside_and_outside() {
        // Box x in [0.25, 0.5] along a unit segment, unbounded y
        let (t1, t2) = slab((0.25, 0.5), (f64::NEG_INFINITY, f64::INFINITY));
        assert_eq!((t1, t2), (0.25, 0.5));
        let (t1, t2) = slab((1.5, 2.0), (f64::NEG_INFINITY, f64::INFINITY));
        assert!(t1 > t2.min(1.0));
    }

    #[test]
    #[should_panic]
    fn test_zero_mask_panics() {
        assert_shape_mask(0);
    }

    #[test]
    #[should_panic]
    fn test_high_bit_mask_panics() {
        assert_shape_mask(0x8000_0001);
    }
}
