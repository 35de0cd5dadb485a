//! Signed distance fields from alpha masks
//!
//! Uses the Felzenszwalb-Huttenlocher squared Euclidean distance transform:
//! a 1D lower envelope of parabolas along every column, then every row.
//! The field is computed twice (distance to the nearest outside pixel and to
//! the nearest inside pixel) and combined into a signed distance that is
//! negative inside.

/// Stand-in for infinity that keeps the parabola intersections finite
const EDT_INF: f64 = 1e20;

/// Alpha mask sampled from a texture buffer
#[derive(Debug, Clone, Copy)]
pub struct MaskView<'a> {
    pub data: &'a [f32],
    pub offset: usize,
    pub stride_x: usize,
    pub stride_y: usize,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    /// Pixels with alpha at or above this value are inside
    pub threshold: f32,
}

impl MaskView<'_> {
    /// Field width including one pixel of padding on each side
    #[inline]
    pub fn padded_width(&self) -> usize {
        self.max_x - self.min_x + 2
    }

    #[inline]
    pub fn padded_height(&self) -> usize {
        self.max_y - self.min_y + 2
    }
}

/// Signed distance (in pixels) for every padded pixel, row major.
pub fn signed_distance_field(mask: &MaskView) -> Vec<f64> {
    let width = mask.padded_width();
    let height = mask.padded_height();
    let size = width * height;

    let mut inner = vec![0.0; size];
    let mut outer = vec![EDT_INF; size];
    for y in mask.min_y..mask.max_y {
        let row = (y - mask.min_y + 1) * width + 1;
        for x in mask.min_x..mask.max_x {
            let alpha = mask.data[mask.offset + x * mask.stride_x + y * mask.stride_y];
            if alpha >= mask.threshold {
                let j = row + (x - mask.min_x);
                inner[j] = EDT_INF;
                outer[j] = 0.0;
            }
        }
    }

    let mut scratch = Envelope::new(width.max(height));
    scratch.transform(&mut inner, width, height);
    scratch.transform(&mut outer, width, height);

    for (o, i) in outer.iter_mut().zip(&inner) {
        *o = o.sqrt() - i.sqrt();
    }
    outer
}

/// Scratch buffers for the lower envelope, reused across rows and columns
struct Envelope {
    f: Vec<f64>,
    z: Vec<f64>,
    v: Vec<usize>,
}

impl Envelope {
    fn new(capacity: usize) -> Self {
        Self {
            f: vec![0.0; capacity],
            z: vec![0.0; capacity + 1],
            v: vec![0; capacity],
        }
    }

    fn transform(&mut self, grid: &mut [f64], width: usize, height: usize) {
        for x in 0..width {
            self.transform_1d(grid, x, width, height);
        }
        for y in 0..height {
            self.transform_1d(grid, y * width, 1, width);
        }
    }

    fn transform_1d(&mut self, grid: &mut [f64], offset: usize, stride: usize, length: usize) {
        let Envelope { f, z, v } = self;

        f[0] = grid[offset];
        v[0] = 0;
        z[0] = -EDT_INF;
        z[1] = EDT_INF;

        let mut k = 0usize;
        for q in 1..length {
            f[q] = grid[offset + q * stride];
            let q2 = (q * q) as f64;
            let mut s;
            loop {
                let r = v[k];
                s = (f[q] - f[r] + q2 - (r * r) as f64) / (q - r) as f64 * 0.5;
                if s <= z[k] && k > 0 {
                    k -= 1;
                } else {
                    break;
                }
            }
            // The first parabola is only replaced, never popped
            if s > z[k] {
                k += 1;
            }
            v[k] = q;
            z[k] = s;
            z[k + 1] = EDT_INF;
        }

        let mut k = 0usize;
        for q in 0..length {
            while z[k + 1] < q as f64 {
                k += 1;
            }
            let r = v[k];
            let qr = q as f64 - r as f64;
            grid[offset + q * stride] = f[r] + qr * qr;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel_field() {
        // 3x3 mask with only the center set
        let data = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let view = MaskView {
            data: &data,
            offset: 0,
            stride_x: 1,
            stride_y: 3,
            min_x: 0,
            min_y: 0,
            max_x: 3,
            max_y: 3,
            threshold: 0.5,
        };
        let field = signed_distance_field(&view);
        let w = view.padded_width();
        assert_eq!(w, 5);
        assert_eq!(field.len(), 25);

        // Center pixel (padded coords 2,2): one step from the nearest outside pixel
        assert!((field[2 * w + 2] + 1.0).abs() < 1e-9);
        // Direct neighbor is one step from the inside pixel
        assert!((field[2 * w + 3] - 1.0).abs() < 1e-9);
        // Diagonal neighbor
        assert!((field[w + 1] - 2.0f64.sqrt()).abs() < 1e-9);
        // Padding corner is two diagonal steps away
        assert!((field[0] - 8.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_empty_mask_is_far_outside() {
        let data = [0.0f32; 4];
        let view = MaskView {
            data: &data,
            offset: 0,
            stride_x: 1,
            stride_y: 2,
            min_x: 0,
            min_y: 0,
            max_x: 2,
            max_y: 2,
            threshold: 0.5,
        };
        let field = signed_distance_field(&view);
        assert!(field.iter().all(|&d| d > 1e9));
    }
}
