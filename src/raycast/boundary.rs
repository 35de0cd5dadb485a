//! Boundaries: closed volumes extruded from shapes
//!
//! A boundary carries a 32-bit mask and an initial 32-bit parity state.
//! During a cast its running state is XORed with the mask of every crossing;
//! a running state of zero means the ray is inside.
//!
//! - `Region`: shapes extruded between a bottom and top elevation
//! - `Universe`: the unbounded result of cropping a region that covers the
//!   whole crop box (state zero), or the empty boundary (mask zero)

use std::sync::{Arc, LazyLock};

use super::aabb::Aabb;
use super::cast::Cast;
use super::shapes::{Overlap, Shape};
use crate::consts::{ELEVATION_MASK, FULL_STATE};
use crate::{fmax, fmin};

static EMPTY: LazyLock<Arc<Boundary>> = LazyLock::new(|| Arc::new(Boundary::Universe { mask: 0 }));

#[derive(Debug, Clone)]
pub enum Boundary {
    Region(Region),
    /// Always inside (state zero); empty when the mask is zero
    Universe { mask: u32 },
}

impl Boundary {
    /// The boundary that never contributes to its geometry
    pub fn empty() -> Arc<Boundary> {
        Arc::clone(&EMPTY)
    }

    #[inline]
    pub fn mask(&self) -> u32 {
        match self {
            Boundary::Region(region) => region.mask,
            Boundary::Universe { mask } => *mask,
        }
    }

    #[inline]
    pub fn state(&self) -> u32 {
        match self {
            Boundary::Region(region) => region.state,
            Boundary::Universe { .. } => 0,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        match self {
            Boundary::Region(region) => {
                region.state == 0
                    && region.shapes.is_empty()
                    && region.bottom == f64::NEG_INFINITY
                    && region.top == f64::INFINITY
            }
            Boundary::Universe { .. } => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mask() == 0 || (self.state() != 0 && self.is_unbounded())
    }

    #[inline]
    pub(crate) fn kind_order(&self) -> u8 {
        match self {
            Boundary::Region(_) => 0,
            Boundary::Universe { .. } => 1,
        }
    }

    /// Restrict the boundary to a box. Returns the same allocation when
    /// cropping changes nothing.
    pub fn crop(self: &Arc<Self>, bbox: &Aabb) -> Arc<Boundary> {
        match self.as_ref() {
            Boundary::Universe { .. } => Arc::clone(self),
            Boundary::Region(region) => region.crop(bbox).unwrap_or_else(|| Arc::clone(self)),
        }
    }

    pub(crate) fn compute_hits(&self, cast: &mut Cast) {
        if let Boundary::Region(region) = self {
            region.compute_hits(cast);
        }
    }
}

impl From<Region> for Boundary {
    fn from(region: Region) -> Self {
        Boundary::Region(region)
    }
}

/// Shapes extruded between two elevations.
///
/// Every shape crossing toggles the shape's mask; every crossing of the
/// bottom or top plane toggles [`ELEVATION_MASK`]. With the default mask and
/// state a single shape is inside exactly when the ray is within the shape
/// and between the planes.
#[derive(Debug, Clone)]
pub struct Region {
    shapes: Vec<Arc<Shape>>,
    bottom: f64,
    top: f64,
    mask: u32,
    state: u32,
}

impl Region {
    /// Region spanning all elevations. Panics if `shapes` is empty.
    pub fn new(shapes: Vec<Shape>) -> Self {
        assert!(!shapes.is_empty(), "region needs at least one shape");

        let mut shapes: Vec<Arc<Shape>> = shapes.into_iter().map(Arc::new).collect();
        shapes.sort_by_key(|s| s.kind_order());

        Self {
            shapes,
            bottom: f64::NEG_INFINITY,
            top: f64::INFINITY,
            mask: FULL_STATE,
            state: FULL_STATE,
        }
    }

    /// Set the elevation range. Panics unless `bottom <= top`.
    pub fn with_elevation(mut self, bottom: f64, top: f64) -> Self {
        assert!(bottom <= top, "region bottom above top");
        self.bottom = bottom;
        self.top = top;
        self
    }

    /// Panics on a zero mask
    pub fn with_mask(mut self, mask: u32) -> Self {
        assert!(mask != 0, "region mask must be nonzero");
        self.mask = mask;
        self
    }

    pub fn with_state(mut self, state: u32) -> Self {
        self.state = state;
        self
    }

    pub fn shapes(&self) -> &[Arc<Shape>] {
        &self.shapes
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.top
    }

    /// `None` when the crop leaves the region unchanged
    fn crop(&self, bbox: &Aabb) -> Option<Arc<Boundary>> {
        if fmax(self.bottom, bbox.min.z) > fmin(self.top, bbox.max.z) {
            return Some(Boundary::empty());
        }

        let mut state = self.state;
        let mut kept = Vec::with_capacity(self.shapes.len());
        for shape in &self.shapes {
            match shape.test_bounds(bbox) {
                Overlap::Outside => {}
                Overlap::Contains => state ^= shape.mask(),
                Overlap::Partial => kept.push(Arc::clone(shape)),
            }
        }

        if kept.is_empty() {
            if self.bottom <= bbox.min.z && bbox.max.z <= self.top {
                state ^= ELEVATION_MASK;
                return Some(if state == 0 {
                    Arc::new(Boundary::Universe { mask: self.mask })
                } else {
                    Boundary::empty()
                });
            }
            // The box straddles an elevation plane, so only the planes remain
            if state & !ELEVATION_MASK != 0 {
                return Some(Boundary::empty());
            }
            if self.shapes.is_empty() {
                return None;
            }
        } else if kept.len() == self.shapes.len() {
            return None;
        }

        Some(Arc::new(Boundary::Region(Region {
            shapes: kept,
            bottom: self.bottom,
            top: self.top,
            mask: self.mask,
            state,
        })))
    }

    fn compute_hits(&self, cast: &mut Cast) {
        let origin = cast.origin();
        let inv_z = cast.inv_direction().z;

        if inv_z != f64::INFINITY {
            let time1 = (self.bottom - origin.z) * inv_z;
            if time1 > 0.0 {
                cast.add_hit(time1, ELEVATION_MASK);
            }
            let time2 = (self.top - origin.z) * inv_z;
            if time2 > 0.0 {
                cast.add_hit(time2, ELEVATION_MASK);
            }
        } else if self.bottom <= origin.z && origin.z <= self.top {
            // Level ray inside the band never leaves it
            cast.add_hit(f64::INFINITY, ELEVATION_MASK);
        }

        let direction = cast.direction();
        if direction.x != 0.0 || direction.y != 0.0 {
            for shape in &self.shapes {
                shape.compute_hits(cast);
            }
        } else {
            for shape in &self.shapes {
                if shape.contains_point(origin.x, origin.y) {
                    cast.add_hit(f64::INFINITY, shape.mask());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raycast::{Bounds, Circle};
    use glam::{DVec2, DVec3};

    fn column() -> Arc<Boundary> {
        Arc::new(Region::new(vec![Circle::new(0.0, 0.0, 10.0).into()]).with_elevation(0.0, 100.0).into())
    }

    #[test]
    fn test_crop_unchanged_returns_same() {
        let b = column();
        let cropped = b.crop(&Aabb::INFINITE);
        assert!(Arc::ptr_eq(&b, &cropped));
    }

    #[test]
    fn test_crop_outside_elevation_is_empty() {
        let b = column();
        let bbox = Aabb::new(DVec3::new(-1.0, -1.0, 200.0), DVec3::new(1.0, 1.0, 300.0));
        assert!(b.crop(&bbox).is_empty());
    }

    #[test]
    fn test_crop_contained_collapses_to_universe() {
        let b = column();
        let bbox = Aabb::new(DVec3::new(-1.0, -1.0, 10.0), DVec3::new(1.0, 1.0, 20.0));
        let cropped = b.crop(&bbox);
        assert!(cropped.is_unbounded());
        assert!(!cropped.is_empty());
        assert_eq!(cropped.state(), 0);
        assert_eq!(cropped.mask(), FULL_STATE);
    }

    #[test]
    fn test_crop_contained_but_crossing_elevation_keeps_planes() {
        // Box pokes above the top plane, so only the shape is resolved
        let b = column();
        let bbox = Aabb::new(DVec3::new(-1.0, -1.0, 50.0), DVec3::new(1.0, 1.0, 150.0));
        let cropped = b.crop(&bbox);
        assert!(!cropped.is_empty());
        assert!(!cropped.is_unbounded());
        match cropped.as_ref() {
            Boundary::Region(r) => {
                assert!(r.shapes().is_empty());
                assert_eq!((r.bottom(), r.top()), (0.0, 100.0));
                assert_eq!(r.state, ELEVATION_MASK);
            }
            other => panic!("expected region, got {other:?}"),
        }

        // Cropping again inside the band collapses it
        let inner = Aabb::new(DVec3::new(-1.0, -1.0, 60.0), DVec3::new(1.0, 1.0, 70.0));
        assert!(cropped.crop(&inner).is_unbounded());
        // and cropping by the same box changes nothing
        assert!(Arc::ptr_eq(&cropped, &cropped.crop(&bbox)));
    }

    #[test]
    fn test_crop_crossing_elevation_keeps_cost_along_ray() {
        use crate::raycast::{Geometry, Mode, Ray, Space, Volume};

        let geometry = Arc::new(Geometry::new(
            vec![Region::new(vec![Circle::new(0.0, 0.0, 100.0).into()]).with_elevation(0.0, 20.0).into()],
            FULL_STATE,
        ));
        let space = Space::new(vec![Volume::new(geometry, 0, Mode::Add, 1.0 / 20.0)], None);
        let origin = DVec3::new(0.0, 0.0, 10.0);
        let target = DVec3::new(50.0, 0.0, 30.0);
        let cropped = space.crop(&Aabb::from_corners(origin, target));
        assert!(!cropped.is_empty());

        let mut full = Ray::new();
        full.set_space(space).set_origin(origin).set_target(target);
        let mut short = Ray::new();
        short.set_space(cropped).set_origin(origin).set_target(target);
        assert_eq!(full.target_hit(), short.target_hit());
        assert!((full.remaining_energy() - short.remaining_energy()).abs() < 1e-12);
        assert!((full.elapsed_time() - short.elapsed_time()).abs() < 1e-12);
    }

    #[test]
    fn test_crop_drops_outside_shapes() {
        let region = Region::new(vec![
            Bounds::new(0.0, 0.0, 10.0, 10.0).into(),
            Bounds::new(100.0, 0.0, 110.0, 10.0).into(),
        ])
        .with_state(0);
        let b: Arc<Boundary> = Arc::new(region.into());
        let cropped = b.crop(&Aabb::from_rect(DVec2::new(-5.0, -5.0), DVec2::new(5.0, 5.0)));
        match cropped.as_ref() {
            Boundary::Region(r) => assert_eq!(r.shapes().len(), 1),
            other => panic!("expected region, got {other:?}"),
        }
    }

    #[test]
    #[should_panic]
    fn test_empty_region_panics() {
        Region::new(Vec::new());
    }

    #[test]
    #[should_panic]
    fn test_inverted_elevation_panics() {
        Region::new(vec![Circle::new(0.0, 0.0, 1.0).into()]).with_elevation(10.0, 0.0);
    }
}
