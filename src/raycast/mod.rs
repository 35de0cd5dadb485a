//! Energy-limited ray casting through prioritized volumes
//!
//! Shapes are extruded into boundaries, boundaries are combined into
//! geometries by XOR parity, and geometries are weighted into volumes.
//! A space holds the volumes; a ray spends energy crossing it.

pub mod aabb;
pub mod boundary;
pub mod cast;
pub mod geometry;
pub mod ray;
pub mod shapes;
pub mod space;
pub mod volume;

pub use aabb::Aabb;
pub use boundary::{Boundary, Region};
pub use cast::{Cast, Hit};
pub use geometry::Geometry;
pub use ray::Ray;
pub use shapes::{Bounds, Circle, Ellipse, Overlap, Polygon, Rectangle, Shape, Tile, TileTexture};
pub use space::Space;
pub use volume::{Mode, Volume};
