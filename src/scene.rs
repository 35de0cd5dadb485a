//! Scene descriptors
//!
//! The JSON form of regions, limit-range behaviors, and ray queries. All
//! values are validated here so the panicking constructors of the ray
//! casting engine are never reached with bad input.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::raycast::{Bounds, Circle, Ellipse, Mode, Polygon, Rectangle, Shape};
use crate::snap;

/// Errors while loading scenes and settings
#[derive(Error, Debug)]
pub enum SceneError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A behavior references a region that does not exist
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    /// Invalid value
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// What a limit applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sense {
    /// Sight with the given detection mode (e.g. `basicSight`)
    Sight(String),
    Light,
    Darkness,
    Sound,
}

/// How a behavior's range combines with lower priority behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorMode {
    /// Ranges add up (costs add)
    Stack,
    /// Keep the longer range
    Upgrade,
    /// Keep the shorter range
    #[default]
    Downgrade,
    /// Replace the range
    Override,
}

impl BehaviorMode {
    pub fn mode(&self) -> Mode {
        match self {
            BehaviorMode::Stack => Mode::Add,
            BehaviorMode::Upgrade => Mode::Minimize,
            BehaviorMode::Downgrade => Mode::Maximize,
            BehaviorMode::Override => Mode::Override,
        }
    }
}

/// A region shape in scene pixels; rotations are in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeDescriptor {
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        #[serde(default)]
        rotation: f64,
    },
    Circle {
        x: f64,
        y: f64,
        radius: f64,
    },
    Ellipse {
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        #[serde(default)]
        rotation: f64,
    },
    Polygon {
        points: Vec<DVec2>,
    },
}

impl ShapeDescriptor {
    /// The most specific ray casting primitive for this shape
    pub fn to_shape(&self) -> Shape {
        match *self {
            ShapeDescriptor::Rectangle {
                x,
                y,
                width,
                height,
                rotation,
            } => {
                if rotation == 0.0 {
                    Bounds::new(x, y, x + width, y + height).into()
                } else {
                    Rectangle::new(x + width / 2.0, y + height / 2.0, width, height, rotation.to_radians()).into()
                }
            }
            ShapeDescriptor::Circle { x, y, radius } => Circle::new(x, y, radius).into(),
            ShapeDescriptor::Ellipse {
                x,
                y,
                radius_x,
                radius_y,
                rotation,
            } => {
                if radius_x == radius_y {
                    Circle::new(x, y, radius_x).into()
                } else {
                    Ellipse::new(x, y, radius_x, radius_y, rotation.to_radians()).into()
                }
            }
            ShapeDescriptor::Polygon { ref points } => Polygon::new(points).into(),
        }
    }

    fn validate(&self) -> Result<(), SceneError> {
        match self {
            ShapeDescriptor::Rectangle {
                x,
                y,
                width,
                height,
                rotation,
            } => {
                finite("rectangle", &[*x, *y, *width, *height, *rotation])?;
                positive("rectangle size", &[*width, *height])
            }
            ShapeDescriptor::Circle { x, y, radius } => {
                finite("circle", &[*x, *y, *radius])?;
                positive("circle radius", &[*radius])
            }
            ShapeDescriptor::Ellipse {
                x,
                y,
                radius_x,
                radius_y,
                rotation,
            } => {
                finite("ellipse", &[*x, *y, *radius_x, *radius_y, *rotation])?;
                positive("ellipse radii", &[*radius_x, *radius_y])
            }
            ShapeDescriptor::Polygon { points } => validate_polygon(points),
        }
    }
}

fn finite(what: &str, values: &[f64]) -> Result<(), SceneError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SceneError::InvalidValue(format!("{what} has non-finite values")))
    }
}

fn positive(what: &str, values: &[f64]) -> Result<(), SceneError> {
    if values.iter().all(|&v| v > 0.0) {
        Ok(())
    } else {
        Err(SceneError::InvalidValue(format!("{what} must be positive")))
    }
}

/// Polygons need three finite vertices spanning both axes once snapped
fn validate_polygon(points: &[DVec2]) -> Result<(), SceneError> {
    if points.len() < 3 {
        return Err(SceneError::InvalidValue(format!(
            "polygon needs at least three vertices, got {}",
            points.len()
        )));
    }
    if !points.iter().all(|p| p.is_finite()) {
        return Err(SceneError::InvalidValue("polygon has non-finite vertices".into()));
    }

    let snapped: Vec<DVec2> = points.iter().map(|p| DVec2::new(snap(p.x), snap(p.y))).collect();
    let (min, max) = snapped
        .iter()
        .fold((DVec2::INFINITY, DVec2::NEG_INFINITY), |(min, max), &p| (min.min(p), max.max(p)));
    if !(min.x < max.x && min.y < max.y) {
        return Err(SceneError::InvalidValue("polygon is degenerate".into()));
    }
    Ok(())
}

/// Shapes extruded between two elevations (scene units, unbounded if absent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    #[serde(default)]
    pub shapes: Vec<ShapeDescriptor>,
    /// Precomputed even-odd outline used when there is more than one shape
    #[serde(default)]
    pub polygons: Vec<Vec<DVec2>>,
    #[serde(default)]
    pub bottom: Option<f64>,
    #[serde(default)]
    pub top: Option<f64>,
}

impl RegionDescriptor {
    pub fn bottom(&self) -> f64 {
        self.bottom.unwrap_or(f64::NEG_INFINITY)
    }

    pub fn top(&self) -> f64 {
        self.top.unwrap_or(f64::INFINITY)
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if self.shapes.is_empty() && self.polygons.is_empty() {
            return Err(SceneError::InvalidValue("region has no shapes".into()));
        }
        for shape in &self.shapes {
            shape.validate()?;
        }
        for polygon in &self.polygons {
            validate_polygon(polygon)?;
        }
        if self.bottom().is_nan() || self.top().is_nan() || self.bottom() > self.top() {
            return Err(SceneError::InvalidValue(format!(
                "region elevation [{}, {}] is invalid",
                self.bottom(),
                self.top()
            )));
        }
        Ok(())
    }
}

fn default_viewed() -> bool {
    true
}

/// A limit-range behavior attached to a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDescriptor {
    pub region: String,
    /// Detection modes whose sight is limited
    #[serde(default)]
    pub sight: BTreeSet<String>,
    #[serde(default)]
    pub light: bool,
    #[serde(default)]
    pub darkness: bool,
    #[serde(default)]
    pub sound: bool,
    /// Range in grid units; unlimited if absent
    #[serde(default)]
    pub range: Option<f64>,
    #[serde(default)]
    pub mode: BehaviorMode,
    #[serde(default)]
    pub priority: i32,
    /// Whether the region is on the viewed level
    #[serde(default = "default_viewed")]
    pub viewed: bool,
}

impl BehaviorDescriptor {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            sight: BTreeSet::new(),
            light: false,
            darkness: false,
            sound: false,
            range: None,
            mode: BehaviorMode::default(),
            priority: 0,
            viewed: true,
        }
    }

    /// Senses this behavior limits
    pub fn senses(&self) -> Vec<Sense> {
        let mut senses: Vec<Sense> = self.sight.iter().cloned().map(Sense::Sight).collect();
        if self.light {
            senses.push(Sense::Light);
        }
        if self.darkness {
            senses.push(Sense::Darkness);
        }
        if self.sound {
            senses.push(Sense::Sound);
        }
        senses
    }

    pub fn has_sense(&self, sense: &Sense) -> bool {
        match sense {
            Sense::Sight(id) => self.sight.contains(id),
            Sense::Light => self.light,
            Sense::Darkness => self.darkness,
            Sense::Sound => self.sound,
        }
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if let Some(range) = self.range {
            if !(range >= 0.0) {
                return Err(SceneError::InvalidValue(format!("behavior range {range} is negative")));
            }
        }
        Ok(())
    }
}

/// A single ray to evaluate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayQuery {
    pub sense: Sense,
    #[serde(default)]
    pub min_range: f64,
    pub origin: DVec3,
    pub target: DVec3,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    #[serde(default)]
    pub regions: BTreeMap<String, RegionDescriptor>,
    #[serde(default)]
    pub behaviors: BTreeMap<String, BehaviorDescriptor>,
    #[serde(default)]
    pub queries: Vec<RayQuery>,
}

impl SceneDescriptor {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let json = std::fs::read_to_string(path)?;
        let scene = Self::from_json(&json)?;
        log::info!(
            "Loaded scene {}: {} regions, {} behaviors, {} queries",
            path.display(),
            scene.regions.len(),
            scene.behaviors.len(),
            scene.queries.len()
        );
        Ok(scene)
    }

    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let scene: SceneDescriptor = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        for region in self.regions.values() {
            region.validate()?;
        }
        for behavior in self.behaviors.values() {
            if !self.regions.contains_key(&behavior.region) {
                return Err(SceneError::UnknownRegion(behavior.region.clone()));
            }
            behavior.validate()?;
        }
        for query in &self.queries {
            if !(query.origin.is_finite() && query.target.is_finite() && query.min_range >= 0.0) {
                return Err(SceneError::InvalidValue(format!(
                    "query from {} to {} is invalid",
                    query.origin, query.target
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "regions": {
            "fog": {
                "shapes": [{"type": "circle", "x": 0.0, "y": 0.0, "radius": 100.0}],
                "bottom": 0.0,
                "top": 10.0
            }
        },
        "behaviors": {
            "fog-limit": {
                "region": "fog",
                "sight": ["basicSight"],
                "sound": true,
                "range": 5.0,
                "mode": "stack"
            }
        },
        "queries": [
            {"sense": {"sight": "basicSight"}, "origin": [0.0, 0.0, 0.0], "target": [200.0, 0.0, 0.0]},
            {"sense": "sound", "origin": [0.0, 0.0, 0.0], "target": [10.0, 0.0, 0.0]}
        ]
    }"#;

    #[test]
    fn test_parse_scene() {
        let scene = SceneDescriptor::from_json(SCENE).unwrap();
        let behavior = &scene.behaviors["fog-limit"];
        assert_eq!(behavior.mode, BehaviorMode::Stack);
        assert_eq!(behavior.priority, 0);
        assert!(behavior.viewed);
        assert_eq!(
            behavior.senses(),
            vec![Sense::Sight("basicSight".into()), Sense::Sound]
        );
        assert_eq!(scene.queries[1].sense, Sense::Sound);
        assert_eq!(scene.regions["fog"].top(), 10.0);
    }

    #[test]
    fn test_unknown_region() {
        let json = r#"{"behaviors": {"b": {"region": "missing", "light": true}}}"#;
        assert!(matches!(
            SceneDescriptor::from_json(json),
            Err(SceneError::UnknownRegion(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        let region = RegionDescriptor {
            shapes: vec![ShapeDescriptor::Circle {
                x: 0.0,
                y: 0.0,
                radius: 0.0,
            }],
            polygons: Vec::new(),
            bottom: None,
            top: None,
        };
        assert!(matches!(region.validate(), Err(SceneError::InvalidValue(_))));

        // Collinear after snapping
        let flat = vec![DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.2), DVec2::new(20.0, 0.1)];
        assert!(validate_polygon(&flat).is_err());
    }

    #[test]
    fn test_negative_range_rejected() {
        let mut behavior = BehaviorDescriptor::new("r");
        behavior.range = Some(-1.0);
        assert!(behavior.validate().is_err());
    }

    #[test]
    fn test_inverted_elevation_rejected() {
        let region = RegionDescriptor {
            shapes: vec![ShapeDescriptor::Circle {
                x: 0.0,
                y: 0.0,
                radius: 5.0,
            }],
            polygons: Vec::new(),
            bottom: Some(10.0),
            top: Some(0.0),
        };
        assert!(region.validate().is_err());
    }

    #[test]
    fn test_shape_mapping() {
        let rect = ShapeDescriptor::Rectangle {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 20.0,
            rotation: 0.0,
        };
        assert!(matches!(rect.to_shape(), Shape::Bounds(_)));

        let rotated = ShapeDescriptor::Rectangle {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 20.0,
            rotation: 30.0,
        };
        assert!(matches!(rotated.to_shape(), Shape::Rectangle(_)));

        let round = ShapeDescriptor::Ellipse {
            x: 0.0,
            y: 0.0,
            radius_x: 5.0,
            radius_y: 5.0,
            rotation: 10.0,
        };
        assert!(matches!(round.to_shape(), Shape::Circle(_)));

        let oval = ShapeDescriptor::Ellipse {
            x: 0.0,
            y: 0.0,
            radius_x: 5.0,
            radius_y: 8.0,
            rotation: 0.0,
        };
        assert!(matches!(oval.to_shape(), Shape::Ellipse(_)));
    }

    #[test]
    fn test_behavior_mode_mapping() {
        assert_eq!(BehaviorMode::Stack.mode(), Mode::Add);
        assert_eq!(BehaviorMode::Upgrade.mode(), Mode::Minimize);
        assert_eq!(BehaviorMode::Downgrade.mode(), Mode::Maximize);
        assert_eq!(BehaviorMode::Override.mode(), Mode::Override);
        assert_eq!(BehaviorMode::default(), BehaviorMode::Downgrade);
    }
}
