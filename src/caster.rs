//! Point-source ray casters
//!
//! A point source casts many rays from one origin. The caster crops the
//! source's space once per octant around the origin, so every ray only
//! tests the volumes in the direction it travels.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DVec2, DVec3};

use crate::constraint::{PolygonConstraint, SourcePolygon};
use crate::limits::{Limits, Sense};
use crate::raycast::{Aabb, Ray, Space};
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct PointSourceRayCaster {
    ray: Ray,
    space: Arc<Space>,
    octants: [Option<Arc<Space>>; 8],
    initialized: bool,
}

impl Default for PointSourceRayCaster {
    fn default() -> Self {
        Self {
            ray: Ray::new(),
            space: Space::empty(),
            octants: Default::default(),
            initialized: false,
        }
    }
}

impl PointSourceRayCaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for rays from `origin` through `space`
    pub fn initialize(&mut self, space: Arc<Space>, origin: DVec3, min_range: f64, max_range: f64) {
        self.ray
            .set_space(Space::empty())
            .set_origin(origin)
            .set_range(min_range, max_range);
        self.space = space;
        self.octants = Default::default();
        self.initialized = true;
    }

    pub fn reset(&mut self) {
        self.ray.reset();
        self.space = Space::empty();
        self.octants = Default::default();
        self.initialized = false;
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn ray(&mut self) -> &mut Ray {
        &mut self.ray
    }

    /// Aim the ray at `target`; results are computed when queried
    pub fn cast_ray(&mut self, target: DVec3) -> &mut Ray {
        let octant = self.octant(target);
        self.ray.set_space(octant).set_target(target);
        &mut self.ray
    }

    /// Space cropped to the octant of `target`, cropped on first use
    fn octant(&mut self, target: DVec3) -> Arc<Space> {
        let origin = self.ray.origin();
        let index = usize::from(origin.x < target.x)
            | usize::from(origin.y < target.y) << 1
            | usize::from(origin.z < target.z) << 2;

        if let Some(octant) = &self.octants[index] {
            return Arc::clone(octant);
        }

        let mut min = origin;
        let mut max = origin;
        for axis in 0..3 {
            if index & (1 << axis) != 0 {
                max[axis] = f64::INFINITY;
            } else {
                min[axis] = f64::NEG_INFINITY;
            }
        }

        let octant = self.space.crop(&Aabb::new(min, max));
        log::trace!("octant {index} at {origin}: {} volumes", octant.volumes().len());
        self.octants[index] = Some(Arc::clone(&octant));
        octant
    }
}

/// Sight limits of a vision source, one caster per detection mode
#[derive(Debug, Clone)]
pub struct VisionSource {
    origin: DVec2,
    /// In scene units
    elevation: f64,
    external_radius: f64,
    scene_rect: (DVec2, DVec2),
    casters: HashMap<String, PointSourceRayCaster>,
}

impl VisionSource {
    pub fn new(origin: DVec2, elevation: f64, external_radius: f64, scene_rect: (DVec2, DVec2)) -> Self {
        Self {
            origin,
            elevation,
            external_radius,
            scene_rect,
            casters: HashMap::new(),
        }
    }

    /// Clip `shape` to the sight of `detection_mode` and drop the casters,
    /// whose spaces may be stale now. Returns whether the shape changed.
    pub fn constrain_shape(
        &mut self,
        shape: &mut SourcePolygon,
        limits: &mut Limits,
        detection_mode: &str,
        settings: &Settings,
    ) -> bool {
        let space = limits.space(&Sense::Sight(detection_mode.to_string()));
        let changed = PolygonConstraint::apply(shape, &space, settings);
        for caster in self.casters.values_mut() {
            caster.reset();
        }
        changed
    }

    /// Whether `detection_mode` with `range` (scene units, unlimited if
    /// `None`) reaches `point` at `elevation`
    pub fn test_limit(
        &mut self,
        limits: &mut Limits,
        detection_mode: &str,
        range: Option<f64>,
        point: DVec2,
        elevation: f64,
    ) -> bool {
        let distance_pixels = limits.distance_pixels();
        let caster = self.casters.entry(detection_mode.to_string()).or_default();

        if !caster.is_initialized() {
            let radius = match range {
                Some(range) if range == 0.0 => 0.0,
                Some(range) => range.abs() * distance_pixels + self.external_radius,
                None => f64::INFINITY,
            };
            let reach = Aabb::from_rect(self.origin - radius, self.origin + radius);
            let scene = Aabb::from_rect(self.scene_rect.0, self.scene_rect.1);
            let sight = limits.space(&Sense::Sight(detection_mode.to_string()));
            let space = match reach.intersection(&scene) {
                Some(bbox) => sight.crop(&bbox),
                None => Space::empty(),
            };

            caster.initialize(
                space,
                self.origin.extend(self.elevation * distance_pixels),
                self.external_radius,
                f64::INFINITY,
            );
        }

        caster
            .cast_ray(point.extend(elevation * distance_pixels))
            .target_hit()
    }
}

/// Sound limits of a sound source
#[derive(Debug, Clone, Default)]
pub struct SoundSource {
    shape: SourcePolygon,
    caster: PointSourceRayCaster,
}

impl SoundSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain `shape` by the sound limits and prepare the caster for
    /// listeners inside it
    pub fn update(&mut self, mut shape: SourcePolygon, limits: &mut Limits, settings: &Settings) {
        let sound = limits.space(&Sense::Sound);
        PolygonConstraint::apply(&mut shape, &sound, settings);

        let z = shape.elevation * limits.distance_pixels();
        let (min, max) = shape.bounds();
        let space = sound.crop(&Aabb::new(min.extend(z), max.extend(z)));
        self.caster
            .initialize(space, shape.origin.extend(z), 0.0, f64::INFINITY);
        self.shape = shape;
    }

    pub fn shape(&self) -> &SourcePolygon {
        &self.shape
    }

    /// Scale `volume` by the energy left when the sound reaches `listener`.
    /// Listeners are heard at the source's elevation.
    pub fn volume_multiplier(&mut self, volume: f64, listener: DVec2) -> f64 {
        if volume > 0.0 {
            let z = self.caster.ray().origin().z;
            volume * self.caster.cast_ray(listener.extend(z)).remaining_energy()
        } else {
            volume
        }
    }
}
