use image::{Rgb, RgbImage, imageops};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{error::SamplingError, window::WindowSampler};

/// `base * base_weight + overlay * (-overlay_weight)`: overlays darken.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    pub base: f32,
    pub overlay: f32,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            base: 0.9,
            overlay: 0.4,
        }
    }
}

#[inline]
fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Per-channel `a * alpha + b * beta + gamma`, rounded and saturated.
pub fn add_weighted(a: &RgbImage, alpha: f32, b: &RgbImage, beta: f32, gamma: f32) -> RgbImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    RgbImage::from_fn(a.width(), a.height(), |x, y| {
        let (pa, pb) = (a.get_pixel(x, y).0, b.get_pixel(x, y).0);
        Rgb(std::array::from_fn(|c| {
            saturate(pa[c] as f32 * alpha + pb[c] as f32 * beta + gamma)
        }))
    })
}

/// Same blend restricted to the `patch`-sized region of `canvas` at `(x, y)`,
/// written in place. The patch must fit inside the canvas.
pub fn blend_region(
    canvas: &mut RgbImage,
    patch: &RgbImage,
    x: u32,
    y: u32,
    canvas_weight: f32,
    patch_weight: f32,
) {
    debug_assert!(x + patch.width() <= canvas.width() && y + patch.height() <= canvas.height());
    for (px, py, p) in patch.enumerate_pixels() {
        let dst = canvas.get_pixel_mut(x + px, y + py);
        for c in 0..3 {
            dst.0[c] = saturate(dst.0[c] as f32 * canvas_weight + p.0[c] as f32 * patch_weight);
        }
    }
}

/// Blends grid and stain overlays onto a base image.
#[derive(Clone, Copy, Debug, Default)]
pub struct LayerCompositor {
    windows: WindowSampler,
}

impl LayerCompositor {
    pub fn new(windows: WindowSampler) -> Self {
        Self { windows }
    }

    /// Inverts `layer`, cuts a base-sized window from it and subtracts it
    /// from `base` with `weights`.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        base: &RgbImage,
        layer: &RgbImage,
        weights: BlendWeights,
        rng: &mut R,
    ) -> Result<RgbImage, SamplingError> {
        let mut inverted = layer.clone();
        imageops::invert(&mut inverted);
        let window = self
            .windows
            .sample(&inverted, base.width(), base.height(), rng)?;
        Ok(add_weighted(base, weights.base, &window, -weights.overlay, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::SmallRng};

    use super::*;

    #[test]
    fn weighted_sum_saturates() {
        let a = RgbImage::from_pixel(2, 2, Rgb([200, 100, 10]));
        let b = RgbImage::from_pixel(2, 2, Rgb([100, 100, 100]));
        let out = add_weighted(&a, 0.9, &b, -0.4, 0.0);
        assert_eq!(out.get_pixel(1, 1).0, [140, 50, 0]);
        let out = add_weighted(&a, 1.0, &b, 1.0, 0.0);
        assert_eq!(out.get_pixel(0, 0).0, [255, 200, 110]);
    }

    #[test]
    fn white_overlay_leaves_base_scaled() {
        // A white layer inverts to black, so only the base weight applies.
        let base = RgbImage::from_pixel(8, 6, Rgb([100, 200, 50]));
        let layer = RgbImage::from_pixel(16, 12, Rgb([255, 255, 255]));
        let mut rng = SmallRng::seed_from_u64(0);
        let out = LayerCompositor::default()
            .apply(&base, &layer, BlendWeights::default(), &mut rng)
            .unwrap();
        assert_eq!(out.dimensions(), (8, 6));
        assert!(out.pixels().all(|p| p.0 == [90, 180, 45]));
    }

    #[test]
    fn black_overlay_darkens() {
        let base = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let layer = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let mut rng = SmallRng::seed_from_u64(0);
        let weights = BlendWeights {
            base: 1.0,
            overlay: 0.5,
        };
        let out = LayerCompositor::default()
            .apply(&base, &layer, weights, &mut rng)
            .unwrap();
        // 255 - 255 * 0.5 = 127.5, rounded away from zero
        assert!(out.pixels().all(|p| p.0 == [128, 128, 128]));
    }

    #[test]
    fn region_blend_touches_only_the_patch() {
        let mut canvas = RgbImage::from_pixel(5, 5, Rgb([200, 200, 200]));
        let patch = RgbImage::from_pixel(2, 2, Rgb([100, 50, 0]));
        blend_region(&mut canvas, &patch, 3, 3, 1.0, -0.5);
        assert_eq!(canvas.get_pixel(3, 3).0, [150, 175, 200]);
        assert_eq!(canvas.get_pixel(4, 4).0, [150, 175, 200]);
        assert_eq!(canvas.get_pixel(2, 2).0, [200, 200, 200]);
    }
}
