use image::{RgbImage, imageops, imageops::FilterType};
use rand::Rng;

use crate::{error::SamplingError, placement::uniform_anchor};

/// Source-image rectangle chosen by [`WindowSampler::choose`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Cuts a random window with the target aspect ratio out of a larger image
/// and scales it to the target size.
#[derive(Clone, Copy, Debug)]
pub struct WindowSampler {
    pub filter: FilterType,
}

impl Default for WindowSampler {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl WindowSampler {
    pub fn choose<R: Rng + ?Sized>(
        &self,
        src_w: u32,
        src_h: u32,
        target_w: u32,
        target_h: u32,
        rng: &mut R,
    ) -> Result<Window, SamplingError> {
        let degenerate = || SamplingError::DegenerateWindow {
            source_width: src_w,
            source_height: src_h,
            target_width: target_w,
            target_height: target_h,
        };
        if target_w == 0 || target_h == 0 {
            return Err(degenerate());
        }

        // aspect = target_h / target_w, kept in integers so that equal sizes
        // map back exactly.
        let (tw, th) = (target_w as u64, target_h as u64);
        let max_w = (src_w as u64).min(src_h as u64 * tw / th) as u32;
        let width = if max_w > target_w {
            rng.random_range(target_w..=max_w)
        } else {
            max_w
        };
        let height = ((2 * th * width as u64 + tw) / (2 * tw)).min(src_h as u64) as u32;
        if width == 0 || height == 0 {
            return Err(degenerate());
        }

        let (x, y) = uniform_anchor(width, height, src_w, src_h, rng).ok_or_else(degenerate)?;
        Ok(Window {
            x,
            y,
            width,
            height,
        })
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        source: &RgbImage,
        target_w: u32,
        target_h: u32,
        rng: &mut R,
    ) -> Result<RgbImage, SamplingError> {
        let win = self.choose(source.width(), source.height(), target_w, target_h, rng)?;
        let cut = imageops::crop_imm(source, win.x, win.y, win.width, win.height).to_image();
        if cut.dimensions() == (target_w, target_h) {
            return Ok(cut);
        }
        Ok(imageops::resize(&cut, target_w, target_h, self.filter))
    }
}
