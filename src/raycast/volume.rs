//! Volumes: weighted geometries

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::geometry::Geometry;
use crate::{fmax, fmin};

/// How a volume combines its cost with the cost accumulated from lower
/// priority volumes while the ray is inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Add to the running cost (clamped at zero)
    Add,
    /// Keep the smaller of the two
    Minimize,
    /// Keep the larger of the two
    Maximize,
    /// Replace the running cost
    Override,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Add => "add",
            Mode::Minimize => "minimize",
            Mode::Maximize => "maximize",
            Mode::Override => "override",
        }
    }

    /// Fold a volume's cost into the running cost
    #[inline]
    pub fn apply(&self, current: f64, cost: f64) -> f64 {
        match self {
            Mode::Add => fmax(current + cost, 0.0),
            Mode::Minimize => fmin(current, cost),
            Mode::Maximize => fmax(current, cost),
            Mode::Override => cost,
        }
    }

    /// Whether a volume with this mode and cost never changes the running cost
    #[inline]
    pub fn is_noop(&self, cost: f64) -> bool {
        match self {
            Mode::Add => cost == 0.0,
            Mode::Minimize => cost == f64::INFINITY,
            Mode::Maximize => cost == 0.0,
            Mode::Override => false,
        }
    }
}

/// A geometry with a priority, a combination mode, and a cost per unit of
/// distance travelled inside it
#[derive(Debug, Clone)]
pub struct Volume {
    geometry: Arc<Geometry>,
    priority: i32,
    mode: Mode,
    cost: f64,
}

impl Volume {
    /// Panics on a NaN cost, or a negative cost outside of [`Mode::Add`].
    pub fn new(geometry: Arc<Geometry>, priority: i32, mode: Mode, cost: f64) -> Self {
        assert!(!cost.is_nan(), "volume cost is NaN");
        assert!(mode == Mode::Add || cost >= 0.0, "negative cost requires Mode::Add");

        Self {
            geometry,
            priority,
            mode,
            cost,
        }
    }

    /// Same parameters, different geometry
    pub(crate) fn with_geometry(&self, geometry: Arc<Geometry>) -> Self {
        Self {
            geometry,
            priority: self.priority,
            mode: self.mode,
            cost: self.cost,
        }
    }

    #[inline]
    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }
}
