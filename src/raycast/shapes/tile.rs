//! Alpha-masked tile
//!
//! The tile's texture is turned into a signed distance field once at
//! construction. Rays are sphere traced through the field in texture space;
//! every sign change of the distance is a crossing.

use serde::{Deserialize, Serialize};

use super::sdf::{MaskView, signed_distance_field};
use super::{Overlap, assert_shape_mask, rotated_extent, slab};
use crate::consts::SHAPE_MASK;
use crate::raycast::cast::Cast;
use crate::{fmax, fmin};

/// Texture data backing a tile's alpha mask
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileTexture {
    /// Alpha samples
    pub data: Vec<f32>,
    /// Index of the first alpha sample
    #[serde(default)]
    pub offset: usize,
    /// Distance between horizontally adjacent samples
    #[serde(default = "default_stride")]
    pub stride: usize,
    pub width: usize,
    pub height: usize,
    /// Sub-rectangle of the texture that holds the mask (defaults to all of it)
    #[serde(default)]
    pub min_x: Option<usize>,
    #[serde(default)]
    pub min_y: Option<usize>,
    #[serde(default)]
    pub max_x: Option<usize>,
    #[serde(default)]
    pub max_y: Option<usize>,
    /// Alpha at or above this value is inside (defaults to any nonzero alpha)
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_stride() -> usize {
    1
}

fn default_threshold() -> f32 {
    f32::from_bits(1)
}

impl TileTexture {
    /// Tightly packed single-channel texture
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> Self {
        Self {
            data,
            offset: 0,
            stride: 1,
            width,
            height,
            min_x: None,
            min_y: None,
            max_x: None,
            max_y: None,
            threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub(crate) mask: u32,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    /// Padded field dimensions
    width: usize,
    height: usize,
    scale_x: f64,
    skew_x: f64,
    skew_y: f64,
    scale_y: f64,
    translation_x: f64,
    translation_y: f64,
    field: Vec<f64>,
}

impl Tile {
    /// Create with the default mask. The tile covers `width` x `height` world
    /// units centered on (`center_x`, `center_y`), rotated by `rotation` radians.
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64, rotation: f64, texture: &TileTexture) -> Self {
        Self::with_mask(center_x, center_y, width, height, rotation, texture, SHAPE_MASK)
    }

    pub fn with_mask(
        center_x: f64,
        center_y: f64,
        width: f64,
        height: f64,
        rotation: f64,
        texture: &TileTexture,
        mask: u32,
    ) -> Self {
        assert!(center_x.is_finite() && center_y.is_finite() && rotation.is_finite());
        assert!(width.is_finite() && height.is_finite());
        assert!(width > 0.0 && height > 0.0, "tile size must be positive");
        assert!(texture.width > 0 && texture.height > 0 && texture.stride > 0);
        assert_shape_mask(mask);

        let tex_min_x = texture.min_x.unwrap_or(0);
        let tex_min_y = texture.min_y.unwrap_or(0);
        let tex_max_x = texture.max_x.unwrap_or(texture.width);
        let tex_max_y = texture.max_y.unwrap_or(texture.height);
        assert!(tex_min_x < tex_max_x && tex_max_x <= texture.width);
        assert!(tex_min_y < tex_max_y && tex_max_y <= texture.height);

        let stride_x = texture.stride;
        let stride_y = texture.width * stride_x;
        let last = texture.offset + (tex_max_x - 1) * stride_x + (tex_max_y - 1) * stride_y;
        assert!(last < texture.data.len(), "texture data too short");
        assert!(texture.data.iter().all(|&a| a >= 0.0));

        let texture_scale_x = texture.width as f64 / width;
        let texture_scale_y = texture.height as f64 / height;
        let (sin, cos) = rotation.sin_cos();
        let half_width = width * 0.5;
        let half_height = height * 0.5;
        let (min_x, min_y, max_x, max_y) = rotated_extent(
            center_x,
            center_y,
            cos,
            sin,
            (
                tex_min_x as f64 / texture_scale_x - half_width,
                tex_max_x as f64 / texture_scale_x - half_width,
                tex_min_y as f64 / texture_scale_y - half_height,
                tex_max_y as f64 / texture_scale_y - half_height,
            ),
        );

        // World to texture pixels, shifted by the one-pixel padding
        let translation_x = (half_width - (center_x * cos + center_y * sin)) * texture_scale_x + 1.0
            - tex_min_x as f64;
        let translation_y = (half_height - (center_x * -sin + center_y * cos)) * texture_scale_y + 1.0
            - tex_min_y as f64;

        let view = MaskView {
            data: &texture.data,
            offset: texture.offset,
            stride_x,
            stride_y,
            min_x: tex_min_x,
            min_y: tex_min_y,
            max_x: tex_max_x,
            max_y: tex_max_y,
            threshold: texture.threshold,
        };
        let mut field = signed_distance_field(&view);
        // Step one pixel short of the outline, but never less than half a pixel
        for d in field.iter_mut() {
            *d = d.signum() * fmax(d.abs() - 1.0, 0.5);
        }

        Self {
            mask,
            min_x,
            min_y,
            max_x,
            max_y,
            width: view.padded_width(),
            height: view.padded_height(),
            scale_x: cos * texture_scale_x,
            skew_x: -sin * texture_scale_y,
            skew_y: sin * texture_scale_x,
            scale_y: cos * texture_scale_y,
            translation_x,
            translation_y,
            field,
        }
    }

    /// Field sample at texture coordinates (truncated toward zero, clamped to the field)
    #[inline]
    fn sample(&self, x: f64, y: f64) -> f64 {
        let xi = (x as usize).min(self.width - 1);
        let yi = (y as usize).min(self.height - 1);
        self.field[yi * self.width + xi]
    }

    #[inline]
    fn to_texture(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.scale_x * x + self.skew_y * y + self.translation_x,
            self.skew_x * x + self.scale_y * y + self.translation_y,
        )
    }

    /// Tiles never fold into a region's state during a crop
    pub(crate) fn test_bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Overlap {
        if fmax(self.min_x, min_x) > fmin(self.max_x, max_x) || fmax(self.min_y, min_y) > fmin(self.max_y, max_y) {
            Overlap::Outside
        } else {
            Overlap::Partial
        }
    }

    pub(crate) fn contains_point(&self, x: f64, y: f64) -> bool {
        let (x0, y0) = self.to_texture(x, y);
        if x0 < 0.0 || x0 >= self.width as f64 || y0 < 0.0 || y0 >= self.height as f64 {
            return false;
        }
        self.sample(x0, y0) < 0.0
    }

    pub(crate) fn compute_hits(&self, cast: &mut Cast) {
        let origin = cast.origin();
        let direction = cast.direction();
        let (x, y) = self.to_texture(origin.x, origin.y);
        let dx = self.scale_x * direction.x + self.skew_y * direction.y;
        let dy = self.skew_x * direction.x + self.scale_y * direction.y;
        let px = 1.0 / dx;
        let py = 1.0 / dy;
        let (w, h) = (self.width as f64, self.height as f64);

        // Clip to the unpadded interior
        let (mut time1, time2) = slab(
            ((1.0 - x) * px, (w - 1.0 - x) * px),
            ((1.0 - y) * py, (h - 1.0 - y) * py),
        );
        if time1 > fmin(time2, 1.0) {
            return;
        }

        let mut inside = false;
        if time1 <= 0.0 {
            time1 = 0.0;
            inside = self.sample(x, y) < 0.0;
        }

        let inv_magnitude = 1.0 / (dx * dx + dy * dy).sqrt();
        loop {
            let signed_distance = self.sample(x + dx * time1, y + dy * time1) * inv_magnitude;
            if inside != (signed_distance < 0.0) {
                inside = !inside;
                cast.add_hit(time1, self.mask);
            }
            time1 += signed_distance.abs();
            if time1 > time2 {
                break;
            }
        }

        if inside {
            cast.add_hit(time2, self.mask);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8x8 texture with an opaque 4x4 block in the middle
    fn block_texture() -> TileTexture {
        let mut data = vec![0.0f32; 64];
        for y in 2..6 {
            for x in 2..6 {
                data[y * 8 + x] = 1.0;
            }
        }
        TileTexture::new(data, 8, 8)
    }

    #[test]
    fn test_tile_contains_point() {
        // 80x80 world units, so one texel is 10 units
        let tile = Tile::new(0.0, 0.0, 80.0, 80.0, 0.0, &block_texture());
        assert!(tile.contains_point(0.0, 0.0));
        assert!(tile.contains_point(-15.0, 15.0));
        assert!(!tile.contains_point(-35.0, 0.0));
        assert!(!tile.contains_point(100.0, 0.0));
    }

    #[test]
    fn test_tile_overlap_never_contains() {
        let tile = Tile::new(0.0, 0.0, 80.0, 80.0, 0.0, &block_texture());
        assert_eq!(tile.test_bounds(-1.0, -1.0, 1.0, 1.0), Overlap::Partial);
        assert_eq!(tile.test_bounds(50.0, 50.0, 60.0, 60.0), Overlap::Outside);
    }

    #[test]
    fn test_tile_rotation_moves_mask() {
        // Opaque only in the left half; a half turn moves it to the right
        let mut data = vec![0.0f32; 16];
        for y in 0..4 {
            for x in 0..2 {
                data[y * 4 + x] = 1.0;
            }
        }
        let texture = TileTexture::new(data, 4, 4);
        let tile = Tile::new(0.0, 0.0, 40.0, 40.0, 0.0, &texture);
        assert!(tile.contains_point(-10.0, 0.0));
        assert!(!tile.contains_point(10.0, 0.0));

        let turned = Tile::new(0.0, 0.0, 40.0, 40.0, std::f64::consts::PI, &texture);
        assert!(!turned.contains_point(-10.0, 0.0));
        assert!(turned.contains_point(10.0, 0.0));
    }
}
