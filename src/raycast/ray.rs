//! Rays: energy-limited segments through a space
//!
//! A ray starts with one unit of energy per unit of target distance. While
//! it travels between its minimum and maximum range it pays the current
//! cost of the space per unit of distance; it stops where the energy runs
//! out. Results are computed lazily and cached until a setter changes the
//! inputs.

use std::sync::Arc;

use glam::DVec3;

use super::cast::Cast;
use super::space::Space;
use crate::consts::{DISTANCE_EPSILON, ENERGY_EPSILON, MAX_COST_RATE};
use crate::{fmax, fmin};

#[derive(Debug, Clone)]
pub struct Ray {
    space: Arc<Space>,
    min_range: f64,
    max_range: f64,
    origin: DVec3,
    target: DVec3,
    target_hit: Option<bool>,
    elapsed_time: Option<f64>,
    remaining_energy: Option<f64>,
    cast: Cast,
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            space: Space::empty(),
            min_range: 0.0,
            max_range: f64::INFINITY,
            origin: DVec3::ZERO,
            target: DVec3::ZERO,
            target_hit: None,
            elapsed_time: None,
            remaining_energy: None,
            cast: Cast::default(),
        }
    }
}

impl Ray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn space(&self) -> &Arc<Space> {
        &self.space
    }

    #[inline]
    pub fn min_range(&self) -> f64 {
        self.min_range
    }

    #[inline]
    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    #[inline]
    pub fn target(&self) -> DVec3 {
        self.target
    }

    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.target - self.origin
    }

    /// Euclidean distance from origin to target
    #[inline]
    pub fn target_distance(&self) -> f64 {
        self.direction().length()
    }

    /// Whether the ray reaches its target
    pub fn target_hit(&mut self) -> bool {
        if self.target_hit.is_none() {
            self.cast(false, false);
        }
        self.target_hit.unwrap_or(false)
    }

    /// Fraction of the segment travelled before the energy ran out
    pub fn elapsed_time(&mut self) -> f64 {
        if self.elapsed_time.is_none() {
            self.cast(true, false);
        }
        self.elapsed_time.unwrap_or(0.0)
    }

    /// Energy left at the target, in `[0, 1]`
    pub fn remaining_energy(&mut self) -> f64 {
        if self.remaining_energy.is_none() {
            self.cast(false, true);
        }
        self.remaining_energy.unwrap_or(0.0)
    }

    pub fn distance_travelled(&mut self) -> f64 {
        self.target_distance() * self.elapsed_time()
    }

    /// Where the ray stopped
    pub fn destination(&mut self) -> DVec3 {
        self.origin + self.direction() * self.elapsed_time()
    }

    /// Only invalidates cached results when the space actually changes
    pub fn set_space(&mut self, space: Arc<Space>) -> &mut Self {
        if !Arc::ptr_eq(&self.space, &space) {
            self.space = space;
            self.invalidate();
        }
        self
    }

    /// The maximum range is raised to the minimum range if below it
    pub fn set_range(&mut self, min_range: f64, max_range: f64) -> &mut Self {
        self.min_range = min_range;
        self.max_range = fmax(max_range, min_range);
        self.invalidate();
        self
    }

    pub fn set_origin(&mut self, origin: DVec3) -> &mut Self {
        self.origin = origin;
        self.invalidate();
        self
    }

    pub fn set_target(&mut self, target: DVec3) -> &mut Self {
        self.target = target;
        self.invalidate();
        self
    }

    /// Back to the empty space, full range, and a degenerate segment at the origin
    pub fn reset(&mut self) {
        self.space = Space::empty();
        self.min_range = 0.0;
        self.max_range = f64::INFINITY;
        self.origin = DVec3::ZERO;
        self.target = DVec3::ZERO;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.target_hit = None;
        self.elapsed_time = None;
        self.remaining_energy = None;
    }

    fn cast(&mut self, compute_elapsed_time: bool, compute_remaining_energy: bool) {
        let target_distance = self.target_distance();
        let min_range = self.min_range;

        // Too short for any volume to stop it
        if target_distance - min_range < self.space.min_distance() + DISTANCE_EPSILON {
            self.target_hit = Some(true);
            self.elapsed_time = Some(1.0);
            if target_distance <= min_range {
                self.remaining_energy = Some(1.0);
                return;
            }
            if !compute_remaining_energy {
                return;
            }
        }

        // Too long to ever reach the target; only the stretch between the
        // ranges costs anything
        let paid_distance = fmin(target_distance, self.max_range) - min_range;
        if !compute_elapsed_time && paid_distance > self.space.max_distance() + DISTANCE_EPSILON {
            self.target_hit = Some(false);
            self.remaining_energy = Some(0.0);
            return;
        }

        let space = Arc::clone(&self.space);
        self.cast.compute_hits(
            &space,
            self.origin,
            self.target,
            (min_range, self.max_range),
            target_distance,
        );

        let mut stage = 0;
        let mut current_time = 0.0;
        let mut current_cost = 0.0;
        let mut remaining_energy = 1.0 / target_distance;
        let almost_zero_energy = remaining_energy * ENERGY_EPSILON;

        while let Some(hit) = self.cast.next_hit() {
            if hit.geometry.is_some() {
                if !self.cast.apply_hit(&hit) {
                    continue;
                }
            } else {
                stage += 1;
            }

            let delta_time = hit.time - current_time;
            let required_energy = if delta_time > 0.0 {
                delta_time * fmin(current_cost, MAX_COST_RATE)
            } else {
                0.0
            };
            if remaining_energy <= required_energy {
                break;
            }
            remaining_energy -= required_energy;
            current_time = hit.time;

            match stage {
                0 => current_cost = 0.0,
                1 => current_cost = space.current_cost(&self.cast),
                _ => {
                    // Past the maximum range: travel is free
                    current_cost = 0.0;
                    if remaining_energy <= almost_zero_energy {
                        remaining_energy = 0.0;
                    }
                    break;
                }
            }

            if remaining_energy <= almost_zero_energy {
                remaining_energy = 0.0;
                break;
            }
        }

        if current_cost != 0.0 {
            let required_energy = if current_time < 1.0 {
                (1.0 - current_time) * current_cost
            } else {
                0.0
            };
            current_time = fmin(current_time + remaining_energy / current_cost, 1.0);
            remaining_energy -= required_energy;
            if remaining_energy <= almost_zero_energy {
                remaining_energy = 0.0;
            }
        } else if remaining_energy != 0.0 {
            current_time = 1.0;
        }

        if current_time * target_distance > target_distance - DISTANCE_EPSILON {
            current_time = 1.0;
        }

        self.target_hit = Some(current_time == 1.0);
        self.elapsed_time = Some(current_time);
        self.remaining_energy = Some(fmin(remaining_energy * target_distance, 1.0));
        self.cast.reset();
    }
}
