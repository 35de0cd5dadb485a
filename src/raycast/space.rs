//! Spaces: prioritized volume collections
//!
//! A space keeps its volumes sorted by ascending priority (ties broken by
//! geometry creation order) and carries conservative cost bounds:
//! - `min_cost`/`max_cost`: the least and greatest cost any point can have
//! - `min_distance = 1 / max_cost`: every ray at least this long is unaffected
//! - `max_distance = 1 / min_cost`: no ray longer than this reaches its target
//!
//! Cropping drops volumes that cannot matter inside the crop box and
//! truncates everything below an unbounded volume that masks lower
//! priorities. It never changes the result of a cast inside the box.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use super::aabb::Aabb;
use super::cast::Cast;
use super::geometry::Geometry;
use super::volume::{Mode, Volume};
use crate::{fmax, fmin};

static EMPTY: LazyLock<Arc<Space>> = LazyLock::new(|| Arc::new(Space::from_volumes(Vec::new())));

/// Dense slots for the distinct geometries of a space, so a cast can keep
/// per-geometry and per-boundary state in flat arrays
#[derive(Debug, Default)]
pub(crate) struct Layout {
    pub geometries: Vec<Arc<Geometry>>,
    pub boundary_offsets: Vec<usize>,
    pub num_boundaries: usize,
    /// Geometry slot of each volume
    pub volume_slots: Vec<usize>,
}

impl Layout {
    fn new(volumes: &[Volume]) -> Self {
        let mut layout = Layout::default();
        let mut slots: HashMap<u32, usize> = HashMap::new();

        for volume in volumes {
            let geometry = volume.geometry();
            let slot = *slots.entry(geometry.id()).or_insert_with(|| {
                layout.geometries.push(Arc::clone(geometry));
                layout.boundary_offsets.push(layout.num_boundaries);
                layout.num_boundaries += geometry.boundaries().len();
                layout.geometries.len() - 1
            });
            layout.volume_slots.push(slot);
        }
        layout
    }
}

#[derive(Debug)]
pub struct Space {
    volumes: Vec<Volume>,
    layout: Layout,
    min_cost: f64,
    max_cost: f64,
    min_distance: f64,
    max_distance: f64,
}

impl Space {
    /// Sort the volumes by priority and crop them to `bbox` (everything if `None`).
    pub fn new(mut volumes: Vec<Volume>, bbox: Option<Aabb>) -> Arc<Space> {
        volumes.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| a.geometry().id().cmp(&b.geometry().id()))
        });

        let bbox = bbox.unwrap_or(Aabb::INFINITE);
        let volumes = crop_volumes(&volumes, &bbox).unwrap_or(volumes);
        if volumes.is_empty() {
            return Space::empty();
        }

        let space = Space::from_volumes(volumes);
        log::debug!(
            "space with {} volumes, {} geometries, distance bounds [{}, {}]",
            space.volumes.len(),
            space.layout.geometries.len(),
            space.min_distance,
            space.max_distance,
        );
        Arc::new(space)
    }

    /// The space without volumes: every ray reaches its target
    pub fn empty() -> Arc<Space> {
        Arc::clone(&EMPTY)
    }

    fn from_volumes(volumes: Vec<Volume>) -> Self {
        let (min_cost, max_cost) = cost_estimates(&volumes);
        let layout = Layout::new(&volumes);

        Self {
            volumes,
            layout,
            min_cost,
            max_cost,
            min_distance: 1.0 / max_cost,
            max_distance: 1.0 / min_cost,
        }
    }

    /// Restrict to a box. Returns the same allocation when nothing changes
    /// and the shared empty space when nothing is left.
    pub fn crop(self: &Arc<Self>, bbox: &Aabb) -> Arc<Space> {
        match crop_volumes(&self.volumes, bbox) {
            None => Arc::clone(self),
            Some(volumes) if volumes.is_empty() => Space::empty(),
            Some(volumes) => {
                log::trace!("cropped space from {} to {} volumes", self.volumes.len(), volumes.len());
                Arc::new(Space::from_volumes(volumes))
            }
        }
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    #[inline]
    pub fn min_cost(&self) -> f64 {
        self.min_cost
    }

    #[inline]
    pub fn max_cost(&self) -> f64 {
        self.max_cost
    }

    #[inline]
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    #[inline]
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    #[inline]
    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Cost at the cast's current position: every volume containing the ray
    /// folded in priority order
    pub fn current_cost(&self, cast: &Cast) -> f64 {
        self.volumes
            .iter()
            .zip(&self.layout.volume_slots)
            .filter(|&(_, &slot)| cast.is_inside(slot))
            .fold(0.0, |cost, (volume, _)| volume.mode().apply(cost, volume.cost()))
    }
}

/// Crop sorted volumes. `None` means every volume survived unchanged.
fn crop_volumes(volumes: &[Volume], bbox: &Aabb) -> Option<Vec<Volume>> {
    let mut memo: HashMap<u32, Arc<Geometry>> = HashMap::new();
    let mut cropped = Vec::with_capacity(volumes.len());

    for volume in volumes {
        if volume.mode().is_noop(volume.cost()) {
            continue;
        }

        // Shared geometries are cropped once and stay shared
        let geometry = volume.geometry();
        let cropped_geometry = memo
            .entry(geometry.id())
            .or_insert_with(|| geometry.crop(bbox))
            .clone();
        if cropped_geometry.is_empty() {
            continue;
        }

        if Arc::ptr_eq(&cropped_geometry, geometry) {
            cropped.push(volume.clone());
        } else {
            cropped.push(volume.with_geometry(cropped_geometry));
        }
    }

    let unchanged = cropped.len() == volumes.len()
        && cropped
            .iter()
            .zip(volumes)
            .all(|(a, b)| Arc::ptr_eq(a.geometry(), b.geometry()));
    if unchanged {
        return None;
    }

    // The highest priority unbounded volume that fixes the cost makes
    // everything below it irrelevant
    for (i, volume) in cropped.iter().enumerate().rev() {
        if !volume.geometry().is_unbounded() {
            continue;
        }
        let cost = volume.cost();
        let start = match volume.mode() {
            Mode::Add if !cost.is_finite() => Some(if cost > 0.0 { i } else { i + 1 }),
            Mode::Minimize if cost == 0.0 => Some(i + 1),
            Mode::Maximize if cost == f64::INFINITY => Some(i),
            Mode::Override => Some(if cost == 0.0 { i + 1 } else { i }),
            _ => None,
        };
        if let Some(start) = start {
            cropped.drain(..start);
            break;
        }
    }

    Some(cropped)
}

/// Static bounds on the cost at any point. Unbounded volumes always apply;
/// bounded ones may or may not, so they only widen one side.
fn cost_estimates(volumes: &[Volume]) -> (f64, f64) {
    let mut min_cost = 0.0;
    let mut max_cost = 0.0;

    for volume in volumes {
        let cost = volume.cost();
        if volume.geometry().is_unbounded() {
            match volume.mode() {
                Mode::Add => {
                    min_cost = fmax(min_cost + cost, 0.0);
                    max_cost = fmax(max_cost + cost, 0.0);
                }
                Mode::Minimize => {
                    min_cost = fmin(min_cost, cost);
                    max_cost = fmin(max_cost, cost);
                }
                Mode::Maximize => {
                    min_cost = fmax(min_cost, cost);
                    max_cost = fmax(max_cost, cost);
                }
                Mode::Override => {
                    min_cost = cost;
                    max_cost = cost;
                }
            }
        } else {
            match volume.mode() {
                Mode::Add => {
                    if cost >= 0.0 {
                        max_cost += cost;
                    } else {
                        min_cost = fmax(min_cost + cost, 0.0);
                    }
                }
                Mode::Minimize => min_cost = fmin(min_cost, cost),
                Mode::Maximize => max_cost = fmax(max_cost, cost),
                Mode::Override => {
                    min_cost = fmin(min_cost, cost);
                    max_cost = fmax(max_cost, cost);
                }
            }
        }
    }

    (min_cost, max_cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FULL_STATE;
    use crate::raycast::{Boundary, Circle, Region};
    use glam::{DVec2, DVec3};
    use proptest::prelude::*;

    fn disk(x: f64, y: f64, radius: f64) -> Arc<Geometry> {
        let region = Region::new(vec![Circle::new(x, y, radius).into()]);
        Arc::new(Geometry::new(vec![Boundary::from(region)], FULL_STATE))
    }

    #[test]
    fn test_empty_space_distances() {
        let space = Space::empty();
        assert!(space.is_empty());
        assert_eq!(space.min_distance(), f64::INFINITY);
        assert_eq!(space.max_distance(), f64::INFINITY);
    }

    #[test]
    fn test_sorted_by_priority_then_identity() {
        let a = disk(0.0, 0.0, 10.0);
        let b = disk(50.0, 0.0, 10.0);
        let space = Space::new(
            vec![
                Volume::new(Arc::clone(&b), 1, Mode::Add, 0.1),
                Volume::new(Arc::clone(&b), 0, Mode::Add, 0.1),
                Volume::new(Arc::clone(&a), 0, Mode::Add, 0.1),
            ],
            None,
        );
        let order: Vec<(i32, u32)> = space.volumes().iter().map(|v| (v.priority(), v.geometry().id())).collect();
        assert_eq!(order, vec![(0, a.id()), (0, b.id()), (1, b.id())]);
        // The shared geometry gets a single slot
        assert_eq!(space.layout().geometries.len(), 2);
    }

    #[test]
    fn test_noop_volumes_dropped() {
        let space = Space::new(
            vec![
                Volume::new(disk(0.0, 0.0, 10.0), 0, Mode::Add, 0.0),
                Volume::new(disk(0.0, 0.0, 10.0), 0, Mode::Minimize, f64::INFINITY),
                Volume::new(disk(0.0, 0.0, 10.0), 0, Mode::Maximize, 0.0),
            ],
            None,
        );
        assert!(space.is_empty());
    }

    #[test]
    fn test_cost_estimates_bounded() {
        let space = Space::new(
            vec![
                Volume::new(disk(0.0, 0.0, 10.0), 0, Mode::Add, 0.02),
                Volume::new(disk(5.0, 0.0, 10.0), 0, Mode::Add, 0.03),
            ],
            None,
        );
        assert_eq!(space.min_cost(), 0.0);
        assert!((space.max_cost() - 0.05).abs() < 1e-12);
        assert!((space.min_distance() - 20.0).abs() < 1e-9);
        assert_eq!(space.max_distance(), f64::INFINITY);
    }

    #[test]
    fn test_cost_estimates_unbounded_override() {
        let space = Space::new(vec![Volume::new(Geometry::unbounded(), 0, Mode::Override, 0.5)], None);
        assert_eq!(space.min_cost(), 0.5);
        assert_eq!(space.max_cost(), 0.5);
        assert_eq!(space.min_distance(), 2.0);
        assert_eq!(space.max_distance(), 2.0);
    }

    #[test]
    fn test_crop_unchanged_returns_same() {
        let space = Space::new(vec![Volume::new(disk(0.0, 0.0, 10.0), 0, Mode::Add, 0.1)], None);
        assert!(Arc::ptr_eq(&space, &space.crop(&Aabb::INFINITE)));
    }

    #[test]
    fn test_crop_outside_is_empty() {
        let space = Space::new(vec![Volume::new(disk(0.0, 0.0, 10.0), 0, Mode::Add, 0.1)], None);
        let bbox = Aabb::from_rect(DVec2::new(100.0, 100.0), DVec2::new(200.0, 200.0));
        assert!(Arc::ptr_eq(&space.crop(&bbox), &Space::empty()));
    }

    #[test]
    fn test_crop_truncates_below_override() {
        let low = disk(0.0, 0.0, 10.0);
        let high = disk(0.0, 0.0, 100.0);
        let space = Space::new(
            vec![
                Volume::new(low, 0, Mode::Add, 0.1),
                Volume::new(high, 1, Mode::Override, 0.2),
            ],
            None,
        );
        assert_eq!(space.volumes().len(), 2);

        // Inside the big disk only: it becomes unbounded and masks the small one
        let bbox = Aabb::new(DVec3::new(-5.0, -5.0, 0.0), DVec3::new(5.0, 5.0, 0.0));
        let cropped = space.crop(&bbox);
        assert_eq!(cropped.volumes().len(), 1);
        assert_eq!(cropped.volumes()[0].mode(), Mode::Override);
        assert_eq!(cropped.min_distance(), 5.0);
    }

    #[test]
    fn test_crop_truncation_by_infinite_add() {
        let space = Space::new(
            vec![
                Volume::new(disk(0.0, 0.0, 10.0), 0, Mode::Maximize, 0.1),
                Volume::new(disk(0.0, 0.0, 100.0), 1, Mode::Add, f64::INFINITY),
                Volume::new(disk(30.0, 0.0, 10.0), 2, Mode::Minimize, 0.5),
            ],
            None,
        );
        let bbox = Aabb::new(DVec3::new(-5.0, -5.0, 0.0), DVec3::new(5.0, 5.0, 0.0));
        let cropped = space.crop(&bbox);
        // The small maximize is masked; the minimize is outside the box
        assert_eq!(cropped.volumes().len(), 1);
        assert_eq!(cropped.volumes()[0].cost(), f64::INFINITY);
        assert_eq!(cropped.min_distance(), 0.0);
    }

    fn layered_space() -> Arc<Space> {
        use crate::raycast::{Bounds, Ellipse, Shape};

        fn extruded(shape: Shape, bottom: f64, top: f64) -> Arc<Geometry> {
            let region = Region::new(vec![shape]).with_elevation(bottom, top);
            Arc::new(Geometry::new(vec![Boundary::from(region)], FULL_STATE))
        }

        Space::new(
            vec![
                Volume::new(extruded(Circle::new(0.0, 0.0, 80.0).into(), -20.0, 40.0), 0, Mode::Add, 1.0 / 200.0),
                Volume::new(
                    extruded(Bounds::new(20.0, -60.0, 120.0, 10.0).into(), 0.0, 100.0),
                    1,
                    Mode::Maximize,
                    1.0 / 100.0,
                ),
                Volume::new(
                    extruded(Ellipse::new(-50.0, 40.0, 70.0, 40.0, 0.3).into(), f64::NEG_INFINITY, f64::INFINITY),
                    2,
                    Mode::Minimize,
                    1.0 / 1000.0,
                ),
                Volume::new(extruded(Circle::new(30.0, 30.0, 25.0).into(), 10.0, 30.0), 3, Mode::Override, 1.0 / 50.0),
                Volume::new(
                    extruded(Bounds::new(-100.0, -100.0, -90.0, 100.0).into(), -10.0, 10.0),
                    4,
                    Mode::Add,
                    f64::INFINITY,
                ),
            ],
            None,
        )
    }

    proptest! {
        #[test]
        fn test_crop_to_segment_keeps_cast_results(
            ox in -150.0f64..150.0,
            oy in -150.0f64..150.0,
            oz in -40.0f64..80.0,
            tx in -150.0f64..150.0,
            ty in -150.0f64..150.0,
            tz in -40.0f64..80.0,
        ) {
            use crate::raycast::Ray;
            use crate::snap3;

            let space = layered_space();
            let origin = DVec3::new(ox, oy, oz);
            let target = DVec3::new(tx, ty, tz);
            let cropped = space.crop(&Aabb::from_corners(snap3(origin), snap3(target)));

            let mut full = Ray::new();
            full.set_space(space).set_origin(origin).set_target(target);
            let mut short = Ray::new();
            short.set_space(cropped).set_origin(origin).set_target(target);

            prop_assert_eq!(full.target_hit(), short.target_hit());
            prop_assert!((full.remaining_energy() - short.remaining_energy()).abs() < 1e-9);
            prop_assert!((full.elapsed_time() - short.elapsed_time()).abs() < 1e-9);
        }

        #[test]
        fn test_crop_idempotent(
            x in -150.0f64..150.0,
            y in -150.0f64..150.0,
            w in 1.0f64..100.0,
            h in 1.0f64..100.0,
        ) {
            let space = Space::new(
                vec![
                    Volume::new(disk(0.0, 0.0, 50.0), 0, Mode::Add, 0.1),
                    Volume::new(disk(40.0, 0.0, 30.0), 1, Mode::Override, 0.0),
                    Volume::new(disk(-40.0, 20.0, 60.0), 2, Mode::Maximize, 0.3),
                ],
                None,
            );
            let bbox = Aabb::from_rect(DVec2::new(x, y), DVec2::new(x + w, y + h));
            let once = space.crop(&bbox);
            let twice = once.crop(&bbox);

            prop_assert_eq!(once.volumes().len(), twice.volumes().len());
            for (a, b) in once.volumes().iter().zip(twice.volumes()) {
                prop_assert_eq!(a.mode(), b.mode());
                prop_assert_eq!(a.cost(), b.cost());
                prop_assert_eq!(a.priority(), b.priority());
                prop_assert_eq!(a.geometry().is_unbounded(), b.geometry().is_unbounded());
            }
            prop_assert_eq!(once.min_distance(), twice.min_distance());
            prop_assert_eq!(once.max_distance(), twice.max_distance());
        }
    }
}
