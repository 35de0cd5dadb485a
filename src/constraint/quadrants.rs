//! Quadrant extents of a polygon around a point
//!
//! Quadrants are numbered by increasing angle: 0 = (+x, +y), 1 = (-x, +y),
//! 2 = (-x, -y), 3 = (+x, -y). The ring must wind the same way around the
//! origin. Points on an axis belong to the quadrant that the ring enters
//! next.

use glam::DVec2;

use crate::{fmax, fmin};

/// Quadrant of `point` relative to `origin`; `None` for the origin itself
fn quadrant(origin: DVec2, point: DVec2) -> Option<usize> {
    if point.y > origin.y {
        Some(if point.x >= origin.x { 0 } else { 1 })
    } else if point.y < origin.y {
        Some(if point.x <= origin.x { 2 } else { 3 })
    } else if point.x != origin.x {
        Some(if point.x <= origin.x { 1 } else { 3 })
    } else {
        None
    }
}

/// Grow quadrant `q`'s corner outward to cover `point`
fn extend(bounds: &mut [DVec2; 4], q: usize, point: DVec2) {
    let corner = &mut bounds[q];
    match q {
        0 => *corner = DVec2::new(fmax(corner.x, point.x), fmax(corner.y, point.y)),
        1 => *corner = DVec2::new(fmin(corner.x, point.x), fmax(corner.y, point.y)),
        2 => *corner = DVec2::new(fmin(corner.x, point.x), fmin(corner.y, point.y)),
        _ => *corner = DVec2::new(fmax(corner.x, point.x), fmin(corner.y, point.y)),
    }
}

/// Outer corner of the part of the ring inside each quadrant.
///
/// Walks the ring once, splitting edges where they cross an axis. A
/// quadrant the ring never enters keeps the origin as its corner.
pub fn compute_quadrant_bounds(origin: DVec2, points: &[DVec2]) -> [DVec2; 4] {
    let mut bounds = [origin; 4];

    let Some((start, mut q1)) = points
        .iter()
        .enumerate()
        .find_map(|(i, &p)| quadrant(origin, p).map(|q| (i, q)))
    else {
        return bounds;
    };

    let m = points.len();
    let mut p1 = points[start];
    let i0 = (start + 1) % m;
    let mut i = i0;

    loop {
        let p2 = points[i];
        let q2 = quadrant(origin, p2).unwrap_or(q1);

        if q2 != q1 {
            // Move p1 to where the edge leaves quadrant q1
            let s;
            if q1 % 2 == 0 {
                if p2.x != p1.x {
                    s = (origin.x - p1.x) / (p2.x - p1.x);
                    p1 = DVec2::new(origin.x, p1.y * (1.0 - s) + p2.y * s);
                } else {
                    s = 0.0;
                    p1 = origin;
                }
            } else if p2.y != p1.y {
                s = (origin.y - p1.y) / (p2.y - p1.y);
                p1 = DVec2::new(p1.x * (1.0 - s) + p2.x * s, origin.y);
            } else {
                s = 0.0;
                p1 = origin;
            }

            // An edge that starts on the axis adds nothing to the quadrant it leaves
            if s != 0.0 {
                extend(&mut bounds, q1, p1);
            }
            q1 = (q1 + 1) % 4;
            extend(&mut bounds, q1, p1);
        } else {
            // Edges lying on the separating axis do not widen the quadrant
            let on_axis = if q2 % 2 == 0 {
                p1.x == origin.x && p2.x == origin.x
            } else {
                p1.y == origin.y && p2.y == origin.y
            };
            if !on_axis {
                extend(&mut bounds, q2, p2);
            }

            i = (i + 1) % m;
            if i == i0 {
                break;
            }
            p1 = p2;
            q1 = q2;
        }
    }

    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(-half, -half),
            DVec2::new(half, -half),
            DVec2::new(half, half),
            DVec2::new(-half, half),
        ]
    }

    #[test]
    fn test_centered_square() {
        let bounds = compute_quadrant_bounds(DVec2::ZERO, &square(10.0));
        assert_eq!(
            bounds,
            [
                DVec2::new(10.0, 10.0),
                DVec2::new(-10.0, 10.0),
                DVec2::new(-10.0, -10.0),
                DVec2::new(10.0, -10.0),
            ]
        );
    }

    #[test]
    fn test_offset_origin() {
        let bounds = compute_quadrant_bounds(DVec2::new(5.0, 2.0), &square(10.0));
        assert_eq!(bounds[0], DVec2::new(10.0, 10.0));
        assert_eq!(bounds[1], DVec2::new(-10.0, 10.0));
        assert_eq!(bounds[2], DVec2::new(-10.0, -10.0));
        assert_eq!(bounds[3], DVec2::new(10.0, -10.0));
    }

    #[test]
    fn test_origin_on_corner_leaves_other_quadrants_empty() {
        // Ring entirely in quadrant 0 with the origin as a vertex
        let points = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
        ];
        let bounds = compute_quadrant_bounds(DVec2::ZERO, &points);
        assert_eq!(bounds[0], DVec2::new(10.0, 10.0));
        assert_eq!(bounds[2], DVec2::ZERO);
    }

    #[test]
    fn test_triangle_splits_at_axes() {
        let points = vec![DVec2::new(-10.0, -5.0), DVec2::new(10.0, -5.0), DVec2::new(0.0, 20.0)];
        let bounds = compute_quadrant_bounds(DVec2::ZERO, &points);
        // The slanted edges cross y = 0 at x = +-8
        assert!(bounds[0].abs_diff_eq(DVec2::new(8.0, 20.0), 1e-12));
        assert!(bounds[1].abs_diff_eq(DVec2::new(-8.0, 20.0), 1e-12));
        assert_eq!(bounds[2], DVec2::new(-10.0, -5.0));
        assert_eq!(bounds[3], DVec2::new(10.0, -5.0));
    }

    #[test]
    fn test_degenerate_ring() {
        let bounds = compute_quadrant_bounds(DVec2::new(3.0, 4.0), &[DVec2::new(3.0, 4.0)]);
        assert_eq!(bounds, [DVec2::new(3.0, 4.0); 4]);
        assert_eq!(compute_quadrant_bounds(DVec2::ZERO, &[]), [DVec2::ZERO; 4]);
    }
}
