//! Glyph extraction: threshold a raw character scan, find its contours and
//! cut the image and mask down to the union of their bounding boxes.

use image::{GrayImage, Luma, Rgb, RgbImage, imageops};
use imageproc::{contours::find_contours, drawing::draw_hollow_rect_mut};
use tracing::debug;

use crate::{error::ExtractionError, geom::BoundingBox};

pub const DEFAULT_THRESHOLD: u8 = 100;
pub const CONTOUR_BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const UNION_BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// How the glyph's ink relates to the paper in the raw scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Foreground {
    /// Light strokes on a dark background (MNIST).
    #[default]
    Bright,
    /// Dark strokes on light paper; inverted before thresholding.
    Dark,
}

#[derive(Clone, Debug)]
pub struct Extraction {
    pub crop: RgbImage,
    pub mask: GrayImage,
    /// Union box in the coordinates of the raw image.
    pub bbox: BoundingBox,
}

#[derive(Clone, Copy, Debug)]
pub struct GlyphExtractor {
    pub threshold: u8,
}

impl Default for GlyphExtractor {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl GlyphExtractor {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Full-size binary mask: 255 where intensity reaches the threshold.
    pub fn mask(&self, image: &RgbImage, foreground: Foreground) -> GrayImage {
        let gray = match foreground {
            Foreground::Bright => imageops::grayscale(image),
            Foreground::Dark => {
                let mut inverted = image.clone();
                imageops::invert(&mut inverted);
                imageops::grayscale(&inverted)
            }
        };
        let threshold = self.threshold;
        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] >= threshold {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Bounding box of every contour in `mask`, in discovery order.
    ///
    /// The contour search runs on a copy with a one pixel empty frame, so
    /// strokes touching the image border still close into contours.
    pub fn contour_boxes(&self, mask: &GrayImage) -> Vec<BoundingBox> {
        let (w, h) = mask.dimensions();
        let mut framed = GrayImage::new(w + 2, h + 2);
        imageops::replace(&mut framed, mask, 1, 1);

        // framed (x, y) is mask (x - 1, y - 1)
        let pixel = |x: u32, y: u32| {
            let (x, y) = (x.saturating_sub(1).min(w - 1), y.saturating_sub(1).min(h - 1));
            BoundingBox::new(x, y, x + 1, y + 1)
        };
        find_contours::<u32>(&framed)
            .iter()
            .filter_map(|contour| {
                let first = contour.points.first()?;
                let seed = pixel(first.x, first.y);
                Some(
                    contour
                        .points
                        .iter()
                        .fold(seed, |acc, p| acc.union(&pixel(p.x, p.y))),
                )
            })
            .collect()
    }

    /// Union of all contour boxes; the first contour seeds the accumulator.
    pub fn union_box(&self, mask: &GrayImage) -> Result<BoundingBox, ExtractionError> {
        let boxes = self.contour_boxes(mask);
        let (first, rest) = boxes.split_first().ok_or(ExtractionError::NoContours {
            threshold: self.threshold,
        })?;
        Ok(rest.iter().fold(*first, |acc, b| acc.union(b)))
    }

    pub fn extract(
        &self,
        image: &RgbImage,
        foreground: Foreground,
    ) -> Result<Extraction, ExtractionError> {
        let mask = self.mask(image, foreground);
        let bbox = self.union_box(&mask)?;
        debug!(?bbox, "glyph union box");

        let (x, y, w, h) = (bbox.x1, bbox.y1, bbox.width(), bbox.height());
        Ok(Extraction {
            crop: imageops::crop_imm(image, x, y, w, h).to_image(),
            mask: imageops::crop_imm(&mask, x, y, w, h).to_image(),
            bbox,
        })
    }

    /// Inspection variant: the raw image with every contour box and the union
    /// box outlined. Size is unchanged.
    pub fn annotate(
        &self,
        image: &RgbImage,
        foreground: Foreground,
    ) -> Result<RgbImage, ExtractionError> {
        let mask = self.mask(image, foreground);
        let boxes = self.contour_boxes(&mask);
        let union = self.union_box(&mask)?;

        let mut out = image.clone();
        for b in &boxes {
            draw_hollow_rect_mut(&mut out, b.to_rect(), CONTOUR_BOX_COLOR);
        }
        draw_hollow_rect_mut(&mut out, union.to_rect(), UNION_BOX_COLOR);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas_with(rects: &[(u32, u32, u32, u32)], fg: u8, bg: u8) -> RgbImage {
        let mut img = RgbImage::from_pixel(28, 28, Rgb([bg; 3]));
        for &(x, y, w, h) in rects {
            for yy in y..y + h {
                for xx in x..x + w {
                    img.put_pixel(xx, yy, Rgb([fg; 3]));
                }
            }
        }
        img
    }

    #[test]
    fn single_rectangle_is_cropped_exactly() {
        let img = canvas_with(&[(5, 7, 10, 6)], 255, 0);
        let out = GlyphExtractor::default()
            .extract(&img, Foreground::Bright)
            .unwrap();

        assert_eq!(out.bbox, BoundingBox::new(5, 7, 15, 13));
        assert_eq!(out.mask.dimensions(), (10, 6));
        assert_eq!(out.crop.dimensions(), out.mask.dimensions());
        assert!(out.mask.pixels().all(|p| p[0] == 255));
        assert!(out.crop.pixels().all(|p| p.0 == [255; 3]));
    }

    #[test]
    fn separate_strokes_are_united() {
        let img = canvas_with(&[(2, 3, 4, 4), (15, 10, 3, 8)], 200, 0);
        let extractor = GlyphExtractor::default();
        let mask = extractor.mask(&img, Foreground::Bright);

        assert_eq!(extractor.contour_boxes(&mask).len(), 2);
        assert_eq!(extractor.union_box(&mask).unwrap(), BoundingBox::new(2, 3, 18, 18));
    }

    #[test]
    fn dark_ink_is_inverted_first() {
        let img = canvas_with(&[(4, 4, 6, 6)], 0, 255);
        let out = GlyphExtractor::default()
            .extract(&img, Foreground::Dark)
            .unwrap();
        assert_eq!(out.bbox, BoundingBox::new(4, 4, 10, 10));
        assert!(out.crop.pixels().all(|p| p.0 == [0; 3]));
    }

    #[test]
    fn threshold_is_inclusive() {
        let img = canvas_with(&[(1, 1, 2, 2)], 100, 0);
        let mask = GlyphExtractor::new(100).mask(&img, Foreground::Bright);
        assert_eq!(mask.get_pixel(1, 1)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        let mask = GlyphExtractor::new(101).mask(&img, Foreground::Bright);
        assert_eq!(mask.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn border_to_border_strokes_are_found() {
        let img = canvas_with(&[(0, 0, 28, 2)], 255, 0);
        let out = GlyphExtractor::default()
            .extract(&img, Foreground::Bright)
            .unwrap();
        assert_eq!(out.bbox, BoundingBox::new(0, 0, 28, 2));
        assert_eq!(out.mask.dimensions(), (28, 2));

        let img = canvas_with(&[(12, 0, 3, 28)], 255, 0);
        let out = GlyphExtractor::default()
            .extract(&img, Foreground::Bright)
            .unwrap();
        assert_eq!(out.bbox, BoundingBox::new(12, 0, 15, 28));
    }

    #[test]
    fn all_foreground_scan_keeps_full_size() {
        let img = canvas_with(&[(0, 0, 28, 28)], 255, 0);
        let out = GlyphExtractor::default()
            .extract(&img, Foreground::Bright)
            .unwrap();
        assert_eq!(out.bbox, BoundingBox::new(0, 0, 28, 28));
        assert!(out.mask.pixels().all(|p| p[0] == 255));
        assert_eq!(out.crop, img);
    }

    #[test]
    fn blank_scan_has_no_contours() {
        let img = canvas_with(&[], 0, 0);
        let err = GlyphExtractor::default()
            .extract(&img, Foreground::Bright)
            .unwrap_err();
        assert_eq!(err, ExtractionError::NoContours { threshold: 100 });
    }

    #[test]
    fn annotate_keeps_size_and_marks_union() {
        let img = canvas_with(&[(5, 5, 4, 4)], 255, 0);
        let out = GlyphExtractor::default()
            .annotate(&img, Foreground::Bright)
            .unwrap();
        assert_eq!(out.dimensions(), img.dimensions());
        assert_eq!(*out.get_pixel(5, 5), UNION_BOX_COLOR);
    }
}
