//! Hit collection for a single ray segment
//!
//! A cast visits every distinct geometry of a space once, asks each boundary
//! for its crossings with the segment, and keeps the crossings that happen
//! before the target in a binary min-heap keyed by time.
//!
//! Crossings after the target are never stored, but their masks are still
//! XORed into the boundary's running state. Since a boundary's state at
//! infinity is its initial state, the state left over after collection is
//! the state at the origin.

use glam::DVec3;

use super::space::Space;
use crate::consts::HIT_POOL_CAPACITY;
use crate::snap3;

/// A crossing event along the segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Normalized time along the segment (0 = origin, 1 = target)
    pub time: f64,
    /// Geometry slot in the cast's space; `None` for a range event
    pub geometry: Option<u32>,
    /// Boundary slot in the cast's space
    pub boundary: u32,
    /// Mask toggled in the boundary's state
    pub mask: u32,
}

impl Hit {
    /// Range events mark the minimum and maximum range along the segment
    #[inline]
    pub fn range(time: f64) -> Self {
        Self {
            time,
            geometry: None,
            boundary: 0,
            mask: 0,
        }
    }
}

/// Reusable accumulator of hits and per-cast parity state.
///
/// Not reentrant: a cast must be reset before another segment is computed.
#[derive(Debug, Clone)]
pub struct Cast {
    origin: DVec3,
    direction: DVec3,
    inv_direction: DVec3,
    hits: Vec<Hit>,
    hits_remaining: usize,
    geometry_states: Vec<u32>,
    boundary_states: Vec<u32>,
    boundary_masks: Vec<u32>,
    current_geometry: u32,
    current_boundary: u32,
}

impl Default for Cast {
    fn default() -> Self {
        Self::with_capacity(HIT_POOL_CAPACITY)
    }
}

impl Cast {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            origin: DVec3::ZERO,
            direction: DVec3::ZERO,
            inv_direction: DVec3::ZERO,
            hits: Vec::with_capacity(capacity),
            hits_remaining: 0,
            geometry_states: Vec::new(),
            boundary_states: Vec::new(),
            boundary_masks: Vec::new(),
            current_geometry: 0,
            current_boundary: 0,
        }
    }

    /// Snapped origin of the current segment
    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Snapped target minus snapped origin
    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    /// Component-wise reciprocal of the direction (infinite on zero axes)
    #[inline]
    pub fn inv_direction(&self) -> DVec3 {
        self.inv_direction
    }

    /// Number of hits not yet popped
    #[inline]
    pub fn hits_remaining(&self) -> usize {
        self.hits_remaining
    }

    /// Toggle the current boundary's state and record the crossing if it
    /// happens no later than the target.
    pub fn add_hit(&mut self, time: f64, mask: u32) {
        self.boundary_states[self.current_boundary as usize] ^= mask;

        if time > 1.0 {
            return;
        }

        self.hits.push(Hit {
            time,
            geometry: Some(self.current_geometry),
            boundary: self.current_boundary,
            mask,
        });
    }

    /// Collect every crossing of the segment from `origin` to `target` with
    /// the space, plus range events at `min_range` and `max_range`.
    pub fn compute_hits(
        &mut self,
        space: &Space,
        origin: DVec3,
        target: DVec3,
        (min_range, max_range): (f64, f64),
        target_distance: f64,
    ) {
        self.reset();

        let origin = snap3(origin);
        let direction = snap3(target) - origin;
        self.origin = origin;
        self.direction = direction;
        self.inv_direction = DVec3::ONE / direction;

        if min_range < target_distance {
            self.hits.push(Hit::range(min_range / target_distance));
        }
        if max_range < target_distance {
            self.hits.push(Hit::range(max_range / target_distance));
        }

        let layout = space.layout();
        self.geometry_states.clear();
        self.geometry_states.resize(layout.geometries.len(), 0);
        self.boundary_states.clear();
        self.boundary_states.resize(layout.num_boundaries, 0);
        self.boundary_masks.clear();
        self.boundary_masks.resize(layout.num_boundaries, 0);

        for (slot, geometry) in layout.geometries.iter().enumerate() {
            let mut state = geometry.state();
            let offset = layout.boundary_offsets[slot];

            for (index, boundary) in geometry.boundaries().iter().enumerate() {
                let boundary_slot = offset + index;
                self.current_geometry = slot as u32;
                self.current_boundary = boundary_slot as u32;
                self.boundary_states[boundary_slot] = boundary.state();
                self.boundary_masks[boundary_slot] = boundary.mask();

                boundary.compute_hits(self);

                if self.boundary_states[boundary_slot] == 0 {
                    state ^= boundary.mask();
                }
            }

            self.geometry_states[slot] = state;
        }

        self.hits_remaining = self.hits.len();
        let n = self.hits_remaining;
        for i in (0..n / 2).rev() {
            let hit = self.hits[i];
            sift_down(&mut self.hits, n, hit, i);
        }

        log::trace!("cast from {origin} along {direction}: {n} hits");
    }

    /// Pop the earliest remaining hit
    pub fn next_hit(&mut self) -> Option<Hit> {
        if self.hits_remaining == 0 {
            return None;
        }

        self.hits_remaining -= 1;
        let n = self.hits_remaining;
        let next = self.hits[0];
        if n != 0 {
            let last = self.hits[n];
            self.hits[n] = next;
            sift_down(&mut self.hits, n, last, 0);
        }
        Some(next)
    }

    /// Apply a boundary hit to the parity state.
    ///
    /// Returns `false` when neither the boundary nor its geometry moves into
    /// or out of the zero (inside) state, i.e. the hit has no effect on cost.
    pub fn apply_hit(&mut self, hit: &Hit) -> bool {
        let Some(geometry) = hit.geometry else {
            return true;
        };

        let boundary = hit.boundary as usize;
        let boundary_state = self.boundary_states[boundary];
        self.boundary_states[boundary] = boundary_state ^ hit.mask;
        if self.boundary_states[boundary] != 0 && boundary_state != 0 {
            return false;
        }

        let geometry = geometry as usize;
        let geometry_state = self.geometry_states[geometry];
        self.geometry_states[geometry] = geometry_state ^ self.boundary_masks[boundary];
        !(self.geometry_states[geometry] != 0 && geometry_state != 0)
    }

    /// Whether the geometry in `slot` currently contains the ray
    #[inline]
    pub fn is_inside(&self, slot: usize) -> bool {
        self.geometry_states[slot] == 0
    }

    /// Forget all hits; the pool keeps its capacity
    pub fn reset(&mut self) {
        self.hits.clear();
        self.hits_remaining = 0;
    }
}

fn sift_down(hits: &mut [Hit], n: usize, hit: Hit, mut i: usize) {
    loop {
        let r = (i + 1) << 1;
        let l = r - 1;
        let mut j = i;
        let mut h = hit;

        if l < n && hits[l].time < h.time {
            h = hits[l];
            j = l;
        }
        if r < n && hits[r].time < h.time {
            h = hits[r];
            j = r;
        }
        if j == i {
            break;
        }

        hits[i] = h;
        i = j;
    }
    hits[i] = hit;
}
