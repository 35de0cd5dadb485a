//! Clipping source polygons to how far rays can travel
//!
//! A [`PolygonConstraint`] traces the ring of points a point source's rays
//! reach through a space and intersects the source's polygon with it. The
//! ring is built one quadrant at a time: quadrants where the cost is uniform
//! get an exact circular arc, the others are ray-marched along the quadrant's
//! outer edges with rays spaced evenly in angle and bisected until adjacent
//! vertices are close enough.

mod quadrants;

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use geo::{Area, BooleanOps, Coord, LineString, Polygon as GeoPolygon};
use glam::{DVec2, DVec3};

use crate::raycast::{Aabb, Ray, Space};
use crate::settings::Settings;

pub use quadrants::compute_quadrant_bounds;

/// Squared distance below which a new vertex merges with its neighbour or
/// counts as colinear
const MERGE_DISTANCE_SQUARED: f64 = 0.0625;

/// Quadrant directions in the order of [`compute_quadrant_bounds`]
const QUADRANT_SIGNS: [DVec2; 4] = [
    DVec2::new(1.0, 1.0),
    DVec2::new(-1.0, 1.0),
    DVec2::new(-1.0, -1.0),
    DVec2::new(1.0, -1.0),
];

/// The polygon of a point source: everything its rays reach before walls
#[derive(Debug, Clone, Default)]
pub struct SourcePolygon {
    pub origin: DVec2,
    /// In scene units
    pub elevation: f64,
    pub points: Vec<DVec2>,
    /// Nominal radius in pixels
    pub radius: f64,
    /// Radius of the source's own footprint; rays start paying at this distance
    pub external_radius: f64,
    /// Constraints applied so far
    pub boundary_shapes: Vec<PolygonConstraint>,
}

impl SourcePolygon {
    pub fn new(origin: DVec2, elevation: f64, points: Vec<DVec2>, radius: f64) -> Self {
        Self {
            origin,
            elevation,
            points,
            radius,
            ..Self::default()
        }
    }

    /// Unobstructed source: a regular polygon inscribed in the circle, as
    /// fine as the settings' arc tolerance
    pub fn circle(origin: DVec2, elevation: f64, radius: f64, settings: &Settings) -> Self {
        let per_quadrant = if radius > 0.0 {
            (FRAC_PI_2 / (2.0 * settings.arc_epsilon() / radius).sqrt() - 1e-3).ceil().max(1.0) as usize
        } else {
            1
        };
        let steps = per_quadrant * 4;
        let points = (0..steps)
            .map(|i| origin + DVec2::from_angle(std::f64::consts::TAU * i as f64 / steps as f64) * radius)
            .collect();
        Self::new(origin, elevation, points, radius)
    }

    pub fn with_external_radius(mut self, external_radius: f64) -> Self {
        self.external_radius = external_radius;
        self
    }

    /// Bounding rectangle of the points (the origin alone if there are none)
    pub fn bounds(&self) -> (DVec2, DVec2) {
        if self.points.is_empty() {
            return (self.origin, self.origin);
        }
        self.points
            .iter()
            .fold((DVec2::INFINITY, DVec2::NEG_INFINITY), |(min, max), &p| (min.min(p), max.max(p)))
    }
}

#[derive(Debug, Clone)]
pub struct PolygonConstraint {
    origin: DVec2,
    points: Vec<DVec2>,
    enveloping: bool,
    quadrant_bounds: Option<[DVec2; 4]>,
}

impl PolygonConstraint {
    /// Trace the reach of `polygon`'s source through `space`
    pub fn new(polygon: &SourcePolygon, space: &Arc<Space>, settings: &Settings) -> Self {
        let origin = polygon.origin;
        let z = polygon.elevation * settings.distance_pixels();
        let (min, max) = polygon.bounds();

        let mut tracer = Tracer {
            origin,
            external_radius: polygon.external_radius,
            max_radius: settings.max_radius,
            arc_epsilon: settings.arc_epsilon(),
            precision: settings.constraint_precision(),
            points: Vec::new(),
            enveloping: true,
        };
        let mut quadrant_bounds = None;

        let space = space.crop(&Aabb::new(min.extend(z), max.extend(z)));
        if space.min_distance() == space.max_distance() {
            let max_radius = polygon.external_radius + space.max_distance();
            if max_radius < polygon.radius {
                for q in 0..4 {
                    tracer.add_circle_segment(max_radius, q as f64 * FRAC_PI_2);
                }
            }
        } else {
            let bounds = compute_quadrant_bounds(origin, &polygon.points);
            let mut ray = Ray::new();
            ray.set_origin(origin.extend(z))
                .set_range(polygon.external_radius, polygon.radius);
            tracer.trace_quadrants(&mut ray, &space, bounds);
            quadrant_bounds = Some(bounds);
        }

        let points = if tracer.enveloping {
            vec![min, DVec2::new(max.x, min.y), max, DVec2::new(min.x, max.y)]
        } else {
            tracer.close_points();
            tracer.points
        };

        log::trace!(
            "constraint at {origin}: {} points, enveloping {}",
            points.len(),
            tracer.enveloping
        );

        Self {
            origin,
            points,
            enveloping: tracer.enveloping,
            quadrant_bounds,
        }
    }

    /// Constrain `polygon` in place. Returns whether its points changed.
    ///
    /// The constraint is recorded in `boundary_shapes` either way.
    pub fn apply(polygon: &mut SourcePolygon, space: &Arc<Space>, settings: &Settings) -> bool {
        let constraint = Self::new(polygon, space, settings);
        let changed = !constraint.is_enveloping();
        if changed {
            polygon.points = intersect(&polygon.points, &constraint.points);
        }
        polygon.boundary_shapes.push(constraint);
        changed
    }

    /// Like [`PolygonConstraint::apply`] but leaves `polygon` untouched
    pub fn apply_cloned(polygon: &SourcePolygon, space: &Arc<Space>, settings: &Settings) -> SourcePolygon {
        let mut constrained = polygon.clone();
        Self::apply(&mut constrained, space, settings);
        constrained
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn points(&self) -> &[DVec2] {
        &self.points
    }

    /// No ray was shortened: the constraint is just the polygon's bounds
    pub fn is_enveloping(&self) -> bool {
        self.enveloping
    }

    /// Outer corners per quadrant when the space was not uniform
    pub fn quadrant_bounds(&self) -> Option<[DVec2; 4]> {
        self.quadrant_bounds
    }
}

/// Ring under construction
struct Tracer {
    origin: DVec2,
    external_radius: f64,
    max_radius: f64,
    arc_epsilon: f64,
    precision: f64,
    points: Vec<DVec2>,
    enveloping: bool,
}

/// Parameters of the rays along one edge: the ray for index `i` points at
/// `normal + tangent * sinh(start + i * step)`
struct Sweep {
    origin: DVec2,
    z: f64,
    normal: DVec2,
    tangent: DVec2,
    start: f64,
    step: f64,
}

impl Sweep {
    fn direction(&self, i: i64) -> DVec2 {
        self.normal + self.tangent * (self.start + i as f64 * self.step).sinh()
    }
}

impl Tracer {
    fn trace_quadrants(&mut self, ray: &mut Ray, space: &Arc<Space>, bounds: [DVec2; 4]) {
        let o = self.origin;

        for (q, corner) in bounds.into_iter().enumerate() {
            let sign = QUADRANT_SIGNS[q];
            // Points where the quadrant's outer edges meet its axes, in ring order
            let first = |c: DVec2| if q % 2 == 0 { DVec2::new(c.x, o.y) } else { DVec2::new(o.x, c.y) };
            let last = |c: DVec2| if q % 2 == 0 { DVec2::new(o.x, c.y) } else { DVec2::new(c.x, o.y) };

            let extent = (corner - o) * sign;
            if !(extent.x > 0.0 && extent.y > 0.0) {
                self.add_point(first(corner));
                self.add_point(corner);
                self.add_point(last(corner));
                continue;
            }

            let quadrant_space = space.crop(&Aabb::from_rect(o.min(corner), o.max(corner)));
            let max_radius = self.external_radius + quadrant_space.max_distance();

            if quadrant_space.min_distance() == quadrant_space.max_distance() {
                if max_radius < (corner - o).length() {
                    self.add_circle_segment(max_radius, q as f64 * FRAC_PI_2);
                } else {
                    self.add_point(first(corner));
                    self.points.push(corner);
                    self.points.push(last(corner));
                }
            } else {
                let corner = o + sign * extent.min(DVec2::splat(max_radius));
                ray.set_space(quadrant_space);
                self.cast_rays(ray, first(corner), corner);
                self.cast_rays(ray, corner, last(corner));
            }
        }
    }

    /// Quarter arc counterclockwise from `start_angle`
    fn add_circle_segment(&mut self, radius: f64, start_angle: f64) {
        self.enveloping = false;

        let center = self.origin;
        if radius == 0.0 {
            self.add_point(center);
            return;
        }

        self.add_point(center + DVec2::from_angle(start_angle) * radius);

        if radius < self.max_radius {
            let steps = (FRAC_PI_2 / (2.0 * self.arc_epsilon / radius).sqrt() - 1e-3).ceil();
            let step = FRAC_PI_2 / steps;
            for i in 1..=steps as usize {
                self.points
                    .push(center + DVec2::from_angle(start_angle + step * i as f64) * radius);
            }
        } else {
            // Two segments outside the circle
            let half = FRAC_PI_2 * 0.5;
            self.points
                .push(center + DVec2::from_angle(start_angle + half) * (radius / half.cos()));
            self.points
                .push(center + DVec2::from_angle(start_angle + FRAC_PI_2) * radius);
        }
    }

    /// Cast rays toward the edge from `c0` to `c1` and add where they stop
    fn cast_rays(&mut self, ray: &mut Ray, c0: DVec2, c1: DVec2) {
        let o = ray.origin();
        let origin = o.truncate();
        let z = o.z;

        let c0d = c0 - origin;
        let t0 = ray.set_target(c0.extend(z)).elapsed_time();
        if t0 < 1.0 {
            self.enveloping = false;
        }
        let r0 = origin + c0d * t0;
        self.add_point(r0);

        let c1d = c1 - origin;
        let t1 = ray.set_target(c1.extend(z)).elapsed_time();
        let r1 = origin + c1d * t1;

        let tangent = (c1 - c0).normalize();
        let u0 = tangent.dot(c0d);
        let normal = c0d - tangent * u0;
        let normal_squared = normal.length_squared();

        if normal_squared > 1e-6 {
            let distance = normal_squared.sqrt();
            let u1 = tangent.dot(c1d);
            let start = (u0 / distance).asinh();
            let span = (u1 / distance).asinh() - start;
            let steps = (span * (distance / self.precision)).abs().ceil();

            let sweep = Sweep {
                origin,
                z,
                normal,
                tangent: tangent * distance,
                start,
                step: span / steps,
            };
            self.refine(ray, &sweep, (0, r0), (steps as i64, r1));
        }

        if t1 < 1.0 {
            self.enveloping = false;
        }
        self.add_point(r1);
    }

    /// Bisect between two ray endpoints until they are within precision
    fn refine(&mut self, ray: &mut Ray, sweep: &Sweep, (i0, p0): (i64, DVec2), (i2, p2): (i64, DVec2)) {
        if i2 - i0 <= 1 || p0.distance_squared(p2) <= self.precision * self.precision {
            return;
        }

        let i1 = (i0 + i2) / 2;
        let direction = sweep.direction(i1);
        let target = sweep.origin + direction;
        let t1 = ray.set_target(DVec3::new(target.x, target.y, sweep.z)).elapsed_time();
        let p1 = sweep.origin + direction * t1;

        self.refine(ray, sweep, (i0, p0), (i1, p1));
        if t1 < 1.0 {
            self.enveloping = false;
        }
        self.add_point(p1);
        self.refine(ray, sweep, (i1, p1), (i2, p2));
    }

    /// Append a vertex, dropping the previous one if the three are colinear
    /// or the new one duplicates it
    fn add_point(&mut self, p: DVec2) {
        let m = self.points.len();

        if m >= 2 {
            let mut p3 = self.points[m - 2];
            let mut p2 = self.points[m - 1];
            let mut p1 = p;

            // Order the three along the dominant axis so p2 is the middle
            if (p1.x - p2.x).abs() > (p1.y - p2.y).abs() {
                if (p1.x > p2.x) != (p1.x < p3.x) {
                    if (p2.x > p1.x) == (p2.x < p3.x) {
                        (p1, p2) = (p2, p1);
                    } else {
                        (p1, p2, p3) = (p3, p1, p2);
                    }
                }
            } else if (p1.y > p2.y) != (p1.y < p3.y) {
                if (p2.y > p1.y) == (p2.y < p3.y) {
                    (p1, p2) = (p2, p1);
                } else {
                    (p1, p2, p3) = (p3, p1, p2);
                }
            }

            let a = p2.y - p3.y;
            let b = p3.x - p2.x;
            let c = a * (p1.x - p2.x) + b * (p1.y - p2.y);
            if c * c / (a * a + b * b) > MERGE_DISTANCE_SQUARED {
                self.points.push(p);
            } else {
                let before = self.points[m - 2];
                self.points.pop();
                if before.distance_squared(p) > MERGE_DISTANCE_SQUARED {
                    self.points.push(p);
                }
            }
        } else if m == 1 {
            if self.points[0].distance_squared(p) > MERGE_DISTANCE_SQUARED {
                self.points.push(p);
            }
        } else {
            self.points.push(p);
        }
    }

    /// Run the first two vertices through the merge rules again so the
    /// seam is simplified like any other vertex
    fn close_points(&mut self) {
        if self.points.len() < 3 {
            self.points.clear();
            return;
        }

        let (first, second) = (self.points[0], self.points[1]);
        self.add_point(first);
        self.add_point(second);

        let m = self.points.len();
        if m < 4 {
            self.points.clear();
            return;
        }
        self.points[0] = self.points[m - 2];
        self.points[1] = self.points[m - 1];
        self.points.truncate(m - 2);
    }
}

fn to_geo(points: &[DVec2]) -> GeoPolygon<f64> {
    let ring: Vec<Coord<f64>> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    GeoPolygon::new(LineString::from(ring), vec![])
}

/// Largest piece of the intersection of two rings
fn intersect(subject: &[DVec2], clip: &[DVec2]) -> Vec<DVec2> {
    let pieces = to_geo(subject).intersection(&to_geo(clip));
    let Some(largest) = pieces
        .0
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
    else {
        return Vec::new();
    };

    let mut points: Vec<DVec2> = largest.exterior().coords().map(|c| DVec2::new(c.x, c.y)).collect();
    // geo rings repeat the first point at the end
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}
