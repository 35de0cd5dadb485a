//! Geometries: boundaries combined under one parity state
//!
//! A geometry's running state starts at `state` and is XORed with the mask
//! of every boundary the ray is inside; zero means the geometry contains
//! the ray.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LazyLock};

use super::aabb::Aabb;
use super::boundary::Boundary;
use crate::consts::FULL_STATE;

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

static EMPTY: LazyLock<Arc<Geometry>> = LazyLock::new(|| Arc::new(Geometry::from_parts(Vec::new(), FULL_STATE)));
static UNBOUNDED: LazyLock<Arc<Geometry>> = LazyLock::new(|| Arc::new(Geometry::from_parts(Vec::new(), 0)));

#[derive(Debug)]
pub struct Geometry {
    id: u32,
    boundaries: Vec<Arc<Boundary>>,
    state: u32,
}

impl Geometry {
    /// Combine boundaries (sorted by kind) under an initial state
    pub fn new(boundaries: Vec<Boundary>, state: u32) -> Self {
        Self::from_shared(boundaries.into_iter().map(Arc::new).collect(), state)
    }

    /// Like [`Geometry::new`] for boundaries that are already shared.
    /// Panics on a boundary with a zero mask.
    pub fn from_shared(mut boundaries: Vec<Arc<Boundary>>, state: u32) -> Self {
        assert!(boundaries.iter().all(|b| b.mask() != 0), "boundary mask must be nonzero");
        boundaries.sort_by_key(|b| b.kind_order());
        Self::from_parts(boundaries, state)
    }

    fn from_parts(boundaries: Vec<Arc<Boundary>>, state: u32) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            boundaries,
            state,
        }
    }

    /// Geometry that never contains anything
    pub fn empty() -> Arc<Geometry> {
        Arc::clone(&EMPTY)
    }

    /// Geometry that contains everything
    pub fn unbounded() -> Arc<Geometry> {
        Arc::clone(&UNBOUNDED)
    }

    /// Creation order, used to break priority ties between volumes
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn boundaries(&self) -> &[Arc<Boundary>] {
        &self.boundaries
    }

    pub fn is_unbounded(&self) -> bool {
        self.state == 0 && self.boundaries.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.state != 0 && self.boundaries.is_empty()
    }

    /// Restrict to a box. Boundaries that become unbounded fold into the
    /// state; returns the same allocation when nothing changes.
    pub fn crop(self: &Arc<Self>, bbox: &Aabb) -> Arc<Geometry> {
        let mut state = self.state;
        let mut kept = Vec::with_capacity(self.boundaries.len());

        for boundary in &self.boundaries {
            let cropped = boundary.crop(bbox);
            if cropped.is_unbounded() {
                if cropped.state() == 0 {
                    state ^= cropped.mask();
                }
                continue;
            }
            kept.push(cropped);
        }

        if kept.is_empty() {
            return if state == 0 { Geometry::unbounded() } else { Geometry::empty() };
        }

        if kept.len() == self.boundaries.len() && kept.iter().zip(&self.boundaries).all(|(a, b)| Arc::ptr_eq(a, b)) {
            return Arc::clone(self);
        }

        Arc::new(Geometry::from_parts(kept, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raycast::{Bounds, Circle, Region};
    use glam::{DVec2, DVec3};

    fn disk(x: f64, radius: f64) -> Boundary {
        Region::new(vec![Circle::new(x, 0.0, radius).into()]).into()
    }

    #[test]
    fn test_ids_increase() {
        let a = Geometry::new(vec![disk(0.0, 1.0)], FULL_STATE);
        let b = Geometry::new(vec![disk(0.0, 1.0)], FULL_STATE);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_sentinels() {
        assert!(Geometry::empty().is_empty());
        assert!(!Geometry::empty().is_unbounded());
        assert!(Geometry::unbounded().is_unbounded());
        assert!(Arc::ptr_eq(&Geometry::empty(), &Geometry::empty()));
    }

    #[test]
    #[should_panic]
    fn test_zero_mask_boundary_panics() {
        Geometry::new(vec![Boundary::Universe { mask: 0 }], FULL_STATE);
    }

    #[test]
    fn test_crop_identity() {
        let g = Arc::new(Geometry::new(vec![disk(0.0, 10.0)], FULL_STATE));
        assert!(Arc::ptr_eq(&g, &g.crop(&Aabb::INFINITE)));
    }

    #[test]
    fn test_crop_inside_is_unbounded() {
        let g = Arc::new(Geometry::new(vec![disk(0.0, 10.0)], FULL_STATE));
        let bbox = Aabb::new(DVec3::new(-1.0, -1.0, 0.0), DVec3::new(1.0, 1.0, 0.0));
        assert!(Arc::ptr_eq(&g.crop(&bbox), &Geometry::unbounded()));
    }

    #[test]
    fn test_crop_outside_is_empty() {
        let g = Arc::new(Geometry::new(vec![disk(0.0, 10.0)], FULL_STATE));
        let bbox = Aabb::from_rect(DVec2::new(50.0, 50.0), DVec2::new(60.0, 60.0));
        assert!(g.crop(&bbox).is_empty());
    }

    #[test]
    fn test_crop_keeps_partial_boundaries() {
        // Intersection of two regions: one folds, one stays
        let a: Boundary = Region::new(vec![Circle::new(0.0, 0.0, 100.0).into()]).with_mask(0x0F).into();
        let b: Boundary = Region::new(vec![Bounds::new(0.0, -5.0, 10.0, 5.0).into()]).with_mask(0xF0).into();
        let g = Arc::new(Geometry::new(vec![a, b], 0xFF));
        let bbox = Aabb::new(DVec3::new(-2.0, -2.0, 0.0), DVec3::new(2.0, 2.0, 0.0));
        let cropped = g.crop(&bbox);
        assert!(!Arc::ptr_eq(&g, &cropped));
        assert_eq!(cropped.boundaries().len(), 1);
        assert_eq!(cropped.state(), 0xF0);
    }
}
