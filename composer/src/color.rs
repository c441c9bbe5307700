use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use image::{GrayImage, Rgb, RgbImage};
use rand::Rng;
use tracing::debug;

use crate::error::SamplingError;

pub type Color = Rgb<u8>;

/// Exclusive upper bound of every channel.
const CHANNEL_LIMIT: u32 = 255;

/// Draws tints whose channel sum stays below a brightness bound.
///
/// The set of admissible colours for each bound is built on first request and
/// kept for the lifetime of the sampler. The sampler is `Sync`, so one
/// instance can be shared by scenes composed in parallel; call
/// [`ColorSampler::prewarm`] beforehand to keep the build off the hot path.
#[derive(Debug, Default)]
pub struct ColorSampler {
    sets: RwLock<HashMap<u32, Arc<[Color]>>>,
}

impl ColorSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        max_brightness: u32,
        rng: &mut R,
    ) -> Result<Color, SamplingError> {
        let set = self.valid_colors(max_brightness)?;
        Ok(set[rng.random_range(0..set.len())])
    }

    pub fn prewarm(&self, max_brightness: u32) -> Result<(), SamplingError> {
        self.valid_colors(max_brightness).map(|_| ())
    }

    /// Shared handle to the admissible set for `max_brightness`.
    pub fn valid_colors(&self, max_brightness: u32) -> Result<Arc<[Color]>, SamplingError> {
        if let Some(set) = self
            .sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&max_brightness)
        {
            return Ok(Arc::clone(set));
        }
        if max_brightness == 0 {
            return Err(SamplingError::EmptyColorSet { max_brightness });
        }

        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        let set = sets.entry(max_brightness).or_insert_with(|| {
            let colors: Arc<[Color]> = enumerate_colors(max_brightness).into();
            debug!(max_brightness, colors = colors.len(), "built colour set");
            colors
        });
        Ok(Arc::clone(set))
    }

    /// Number of distinct bounds built so far.
    pub fn cached_bounds(&self) -> usize {
        self.sets.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn enumerate_colors(max_brightness: u32) -> Vec<Color> {
    let mut colors = Vec::new();
    for r in 0..CHANNEL_LIMIT.min(max_brightness) {
        for g in 0..CHANNEL_LIMIT.min(max_brightness - r) {
            for b in 0..CHANNEL_LIMIT.min(max_brightness - r - g) {
                colors.push(Rgb([r as u8, g as u8, b as u8]));
            }
        }
    }
    colors
}

/// Per-channel multipliers `(255 - c) / 255` used to tint a glyph.
pub fn channel_factors(color: Color) -> [f32; 3] {
    color.0.map(|c| (255 - c) as f32 / 255.0)
}

/// Three-channel glyph: intensity times `(255 - c) / 255` per channel.
pub fn tint(crop: &GrayImage, color: Color) -> RgbImage {
    let factors = channel_factors(color);
    RgbImage::from_fn(crop.width(), crop.height(), |x, y| {
        let v = crop.get_pixel(x, y)[0] as f32;
        Rgb(factors.map(|f| (v * f) as u8))
    })
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::SmallRng};

    use super::*;

    #[test]
    fn small_bounds_enumerate_exactly() {
        let sampler = ColorSampler::new();
        let set = sampler.valid_colors(2).unwrap();
        let mut got: Vec<[u8; 3]> = set.iter().map(|c| c.0).collect();
        got.sort();
        assert_eq!(got, vec![[0, 0, 0], [0, 0, 1], [0, 1, 0], [1, 0, 0]]);
    }

    #[test]
    fn channels_never_reach_255() {
        let set = enumerate_colors(765);
        assert!(set.iter().all(|c| c.0.iter().all(|&v| v < 255)));
        assert_eq!(set.len(), 255 * 255 * 255);
    }

    #[test]
    fn zero_bound_fails() {
        let sampler = ColorSampler::new();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            sampler.sample(0, &mut rng),
            Err(SamplingError::EmptyColorSet { max_brightness: 0 })
        );
        assert_eq!(sampler.cached_bounds(), 0);
    }

    #[test]
    fn repeated_bounds_reuse_the_set() {
        let sampler = ColorSampler::new();
        let first = sampler.valid_colors(50).unwrap();
        let second = sampler.valid_colors(50).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        sampler.prewarm(60).unwrap();
        assert_eq!(sampler.cached_bounds(), 2);
    }

    #[test]
    fn factors_invert_channels() {
        assert_eq!(channel_factors(Rgb([0, 255, 51])), [1.0, 0.0, 0.8]);
    }

    #[test]
    fn tint_scales_intensity_per_channel() {
        let crop = GrayImage::from_fn(2, 1, |x, _| image::Luma([if x == 0 { 200 } else { 255 }]));
        let out = tint(&crop, Rgb([0, 255, 51]));
        assert_eq!(out.get_pixel(0, 0).0, [200, 0, 160]);
        assert_eq!(out.get_pixel(1, 0).0, [255, 0, 204]);
    }
}
