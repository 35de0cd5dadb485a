//! Limits registry
//!
//! Owns the regions and limit-range behaviors of a scene and turns them into
//! one space per sense. Spaces are built on first use and dropped again when
//! a mutation touches a behavior that limits their sense. Every mutation
//! reports which perception layers the host has to refresh.

use std::collections::{BTreeMap, HashMap};
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use glam::DVec3;

use crate::consts::FULL_STATE;
use crate::raycast::{Aabb, Geometry, Polygon, Ray, Region, Shape, Space, Volume};
use crate::scene::{BehaviorDescriptor, RegionDescriptor, SceneDescriptor, SceneError};
use crate::settings::Settings;
use crate::snap3;

pub use crate::scene::Sense;

/// Elevation planes are widened by this much so that rays exactly at a
/// region's bottom or top count as inside
const ELEVATION_EPSILON: f64 = 1e-8;

/// Perception layers invalidated by a registry mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerceptionUpdate {
    pub vision: bool,
    pub lighting: bool,
    pub darkness: bool,
    pub sounds: bool,
}

impl PerceptionUpdate {
    pub const NONE: PerceptionUpdate = PerceptionUpdate {
        vision: false,
        lighting: false,
        darkness: false,
        sounds: false,
    };

    /// Layers that depend on a sense
    pub fn for_sense(sense: &Sense) -> Self {
        match sense {
            Sense::Sight(_) => Self {
                vision: true,
                ..Self::NONE
            },
            Sense::Light => Self {
                lighting: true,
                ..Self::NONE
            },
            // Darkness sources also reshape the lighting
            Sense::Darkness => Self {
                darkness: true,
                lighting: true,
                ..Self::NONE
            },
            Sense::Sound => Self {
                sounds: true,
                ..Self::NONE
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

impl BitOr for PerceptionUpdate {
    type Output = PerceptionUpdate;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            vision: self.vision | rhs.vision,
            lighting: self.lighting | rhs.lighting,
            darkness: self.darkness | rhs.darkness,
            sounds: self.sounds | rhs.sounds,
        }
    }
}

impl BitOrAssign for PerceptionUpdate {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

#[derive(Debug)]
struct RegionEntry {
    descriptor: RegionDescriptor,
    geometry: Option<Arc<Geometry>>,
}

#[derive(Debug)]
pub struct Limits {
    distance_pixels: f64,
    regions: BTreeMap<String, RegionEntry>,
    behaviors: BTreeMap<String, BehaviorDescriptor>,
    spaces: HashMap<Sense, Arc<Space>>,
}

impl Limits {
    pub fn new(settings: &Settings) -> Self {
        Self {
            distance_pixels: settings.distance_pixels(),
            regions: BTreeMap::new(),
            behaviors: BTreeMap::new(),
            spaces: HashMap::new(),
        }
    }

    /// Registry holding every region and behavior of a scene
    pub fn from_scene(scene: &SceneDescriptor, settings: &Settings) -> Result<Self, SceneError> {
        scene.validate()?;

        let mut limits = Self::new(settings);
        for (id, region) in &scene.regions {
            limits.upsert_region(id, region.clone())?;
        }
        for (id, behavior) in &scene.behaviors {
            limits.upsert_behavior(id, behavior.clone())?;
        }
        log::info!(
            "Limits ready: {} regions, {} behaviors",
            limits.regions.len(),
            limits.behaviors.len()
        );
        Ok(limits)
    }

    /// Pixels per scene unit
    #[inline]
    pub fn distance_pixels(&self) -> f64 {
        self.distance_pixels
    }

    pub fn region(&self, id: &str) -> Option<&RegionDescriptor> {
        self.regions.get(id).map(|entry| &entry.descriptor)
    }

    pub fn behavior(&self, id: &str) -> Option<&BehaviorDescriptor> {
        self.behaviors.get(id)
    }

    /// Add or replace a region
    pub fn upsert_region(&mut self, id: &str, descriptor: RegionDescriptor) -> Result<PerceptionUpdate, SceneError> {
        descriptor.validate()?;

        self.regions.insert(
            id.to_string(),
            RegionEntry {
                descriptor,
                geometry: None,
            },
        );
        let update = self.invalidate_region(id);
        log::debug!("Region {id} updated ({update:?})");
        Ok(update)
    }

    /// Remove a region together with the behaviors attached to it
    pub fn remove_region(&mut self, id: &str) -> PerceptionUpdate {
        if self.regions.remove(id).is_none() {
            return PerceptionUpdate::NONE;
        }

        let update = self.invalidate_region(id);
        self.behaviors.retain(|_, behavior| behavior.region != id);
        log::debug!("Region {id} removed ({update:?})");
        update
    }

    /// Add or replace a behavior. Its region must already exist.
    pub fn upsert_behavior(
        &mut self,
        id: &str,
        descriptor: BehaviorDescriptor,
    ) -> Result<PerceptionUpdate, SceneError> {
        if !self.regions.contains_key(&descriptor.region) {
            return Err(SceneError::UnknownRegion(descriptor.region.clone()));
        }
        descriptor.validate()?;

        let mut update = self.invalidate_behavior(&descriptor);
        if let Some(previous) = self.behaviors.insert(id.to_string(), descriptor) {
            update |= self.invalidate_behavior(&previous);
        }
        log::debug!("Behavior {id} updated ({update:?})");
        Ok(update)
    }

    /// Show or hide a behavior; hidden behaviors limit nothing
    pub fn set_viewed(&mut self, id: &str, viewed: bool) -> PerceptionUpdate {
        let Some(behavior) = self.behaviors.get_mut(id) else {
            return PerceptionUpdate::NONE;
        };
        if behavior.viewed == viewed {
            return PerceptionUpdate::NONE;
        }

        behavior.viewed = viewed;
        let senses = behavior.senses();
        let update = self.invalidate_senses(&senses);
        log::debug!("Behavior {id} viewed = {viewed} ({update:?})");
        update
    }

    pub fn remove_behavior(&mut self, id: &str) -> PerceptionUpdate {
        match self.behaviors.remove(id) {
            Some(behavior) => {
                let update = self.invalidate_behavior(&behavior);
                log::debug!("Behavior {id} removed ({update:?})");
                update
            }
            None => PerceptionUpdate::NONE,
        }
    }

    /// Space of every viewed behavior limiting `sense`
    pub fn space(&mut self, sense: &Sense) -> Arc<Space> {
        if let Some(space) = self.spaces.get(sense) {
            return Arc::clone(space);
        }

        let distance_pixels = self.distance_pixels;
        let mut volumes = Vec::new();
        for behavior in self.behaviors.values() {
            if !behavior.viewed || !behavior.has_sense(sense) {
                continue;
            }
            let Some(RegionEntry { descriptor, geometry }) = self.regions.get_mut(&behavior.region) else {
                continue;
            };
            let geometry = geometry.get_or_insert_with(|| build_geometry(descriptor, distance_pixels));
            volumes.push(Volume::new(
                Arc::clone(geometry),
                behavior.priority,
                behavior.mode.mode(),
                cost(behavior.range, distance_pixels),
            ));
        }

        let space = Space::new(volumes, None);
        log::debug!("Built {sense:?} space with {} volumes", space.volumes().len());
        self.spaces.insert(sense.clone(), Arc::clone(&space));
        space
    }

    /// Cast a single ray through the space of `sense`, cropped to the segment
    pub fn cast_ray(&mut self, sense: &Sense, min_range: f64, origin: DVec3, target: DVec3) -> Ray {
        let space = self.space(sense);
        let bbox = Aabb::from_corners(snap3(origin), snap3(target));

        let mut ray = Ray::new();
        ray.set_space(space.crop(&bbox))
            .set_range(min_range, f64::INFINITY)
            .set_origin(origin)
            .set_target(target);
        ray
    }

    /// Drop the cached geometry of a region and the spaces that use it
    fn invalidate_region(&mut self, id: &str) -> PerceptionUpdate {
        if let Some(entry) = self.regions.get_mut(id) {
            entry.geometry = None;
        }

        let senses: Vec<Sense> = self
            .behaviors
            .values()
            .filter(|behavior| behavior.region == id && behavior.viewed)
            .flat_map(|behavior| behavior.senses())
            .collect();
        self.invalidate_senses(&senses)
    }

    fn invalidate_behavior(&mut self, behavior: &BehaviorDescriptor) -> PerceptionUpdate {
        if !behavior.viewed {
            return PerceptionUpdate::NONE;
        }
        self.invalidate_senses(&behavior.senses())
    }

    fn invalidate_senses(&mut self, senses: &[Sense]) -> PerceptionUpdate {
        let mut update = PerceptionUpdate::NONE;
        for sense in senses {
            self.spaces.remove(sense);
            update |= PerceptionUpdate::for_sense(sense);
        }
        update
    }
}

/// Cost per pixel of a range in scene units; no range costs nothing
fn cost(range: Option<f64>, distance_pixels: f64) -> f64 {
    match range {
        Some(range) => 1.0 / (range * distance_pixels),
        None => 0.0,
    }
}

/// A single shape keeps its specialized primitive; several shapes use the
/// supplied polygons if there are any and combine even-odd otherwise
fn build_geometry(region: &RegionDescriptor, distance_pixels: f64) -> Arc<Geometry> {
    let shapes: Vec<Shape> = if region.shapes.len() == 1 || region.polygons.is_empty() {
        region.shapes.iter().map(|shape| shape.to_shape()).collect()
    } else {
        region.polygons.iter().map(|points| Polygon::new(points).into()).collect()
    };

    let bottom = region
        .bottom
        .map_or(f64::NEG_INFINITY, |bottom| bottom * distance_pixels - ELEVATION_EPSILON);
    let top = region
        .top
        .map_or(f64::INFINITY, |top| top * distance_pixels + ELEVATION_EPSILON);

    let region = Region::new(shapes).with_elevation(bottom, top);
    Arc::new(Geometry::new(vec![region.into()], FULL_STATE))
}
