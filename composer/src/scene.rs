use image::{GrayImage, Rgb, RgbImage, imageops, imageops::FilterType};
use imageproc::drawing::draw_hollow_rect_mut;
use rand::Rng;
use tracing::debug;

use crate::{
    assets::{AssetSource, Glyph, Pool, random_from_pool, random_glyph},
    color::{ColorSampler, tint},
    config::SceneCfg,
    error::SceneError,
    geom::BoundingBox,
    layer::{LayerCompositor, blend_region},
    placement::{Occupancy, PlacementPlanner},
    window::WindowSampler,
};

pub const MATCH_BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// One placed glyph: its label, where it landed and its mask at that size.
#[derive(Clone, Debug, PartialEq)]
pub struct Match {
    pub label: String,
    pub bbox: BoundingBox,
    pub mask: GrayImage,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub canvas: RgbImage,
    /// Placement order.
    pub matches: Vec<Match>,
}

/// Builds annotated scenes from an asset source.
///
/// All randomness comes from the generator handed to [`SceneComposer::compose`],
/// so a seeded generator reproduces a scene exactly. The colour sampler is
/// borrowed so its cache outlives single scenes and can be shared between
/// composers running in parallel.
pub struct SceneComposer<'a, A: AssetSource + ?Sized> {
    assets: &'a A,
    colors: &'a ColorSampler,
    config: &'a SceneCfg,
    windows: WindowSampler,
    layers: LayerCompositor,
    planner: PlacementPlanner,
}

impl<'a, A: AssetSource + ?Sized> SceneComposer<'a, A> {
    pub fn new(
        assets: &'a A,
        colors: &'a ColorSampler,
        config: &'a SceneCfg,
    ) -> Result<Self, SceneError> {
        config.validate()?;
        let windows = WindowSampler::default();
        Ok(Self {
            assets,
            colors,
            config,
            windows,
            layers: LayerCompositor::new(windows),
            planner: PlacementPlanner::new(config.placement),
        })
    }

    pub fn config(&self) -> &SceneCfg {
        self.config
    }

    pub fn compose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Scene, SceneError> {
        let cfg = self.config;
        let mut canvas = self.background(rng)?;

        let count = rng.random_range(cfg.min_glyphs..=cfg.max_glyphs);
        if count == 0 {
            return Ok(Scene {
                canvas,
                matches: Vec::new(),
            });
        }

        let picks = (0..count)
            .map(|_| random_glyph(self.assets, rng))
            .collect::<Result<Vec<_>, _>>()?;

        // shared by every glyph in the scene
        let avg_height = rng.random_range(cfg.min_avg_height..=cfg.max_avg_height);
        let alpha = rng.random::<f32>() * cfg.max_alpha + (1.0 - cfg.max_alpha);
        debug!(count, avg_height, alpha, "composing scene");

        let mut occupancy = Occupancy::new(cfg.margin);
        let mut matches = Vec::with_capacity(picks.len());
        for (label, glyph) in picks {
            let (crop, mask) = self.scale_glyph(&glyph, avg_height, rng);
            let tinted = self.tint(&crop, rng)?;

            let (w, h) = tinted.dimensions();
            let (x, y) = self.planner.place(
                w,
                h,
                cfg.canvas_width,
                cfg.canvas_height,
                &occupancy,
                rng,
            )?;
            blend_region(&mut canvas, &tinted, x, y, 1.0, -alpha);

            let bbox = BoundingBox::at(x, y, w, h);
            debug!(%label, ?bbox, "placed glyph");
            occupancy.record(&bbox);
            matches.push(Match { label, bbox, mask });
        }

        Ok(Scene { canvas, matches })
    }

    /// [`compose`](Self::compose) with every match box outlined on the
    /// canvas. The matches are unchanged.
    pub fn compose_debug<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Scene, SceneError> {
        let mut scene = self.compose(rng)?;
        for m in &scene.matches {
            draw_hollow_rect_mut(&mut scene.canvas, m.bbox.to_rect(), MATCH_BOX_COLOR);
        }
        Ok(scene)
    }

    fn background<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RgbImage, SceneError> {
        let cfg = self.config;
        let texture = random_from_pool(self.assets, Pool::Textures, rng)?;
        let mut canvas = self
            .windows
            .sample(&texture, cfg.canvas_width, cfg.canvas_height, rng)?;

        for (pool, weights) in [
            (Pool::Grids, cfg.grid_weights),
            (Pool::Stains, cfg.stain_weights),
        ] {
            let layer = random_from_pool(self.assets, pool, rng)?;
            canvas = self.layers.apply(&canvas, &layer, weights, rng)?;
        }
        Ok(canvas)
    }

    /// Scales crop and mask by the same factor so they stay registered.
    fn scale_glyph<R: Rng + ?Sized>(
        &self,
        glyph: &Glyph,
        avg_height: u32,
        rng: &mut R,
    ) -> (GrayImage, GrayImage) {
        let avg = avg_height as f32;
        let spread = self.config.max_height_variance * avg;
        let offset = if spread > 0.0 {
            rng.random_range(-spread..=spread)
        } else {
            0.0
        };
        let (w, h) = glyph.crop.dimensions();
        let scale = (avg + offset) / h as f32;
        let nw = ((w as f32 * scale).round() as u32).max(1);
        let nh = ((h as f32 * scale).round() as u32).max(1);

        (
            imageops::resize(&glyph.crop, nw, nh, FilterType::Triangle),
            imageops::resize(&glyph.mask, nw, nh, FilterType::Nearest),
        )
    }

    fn tint<R: Rng + ?Sized>(&self, crop: &GrayImage, rng: &mut R) -> Result<RgbImage, SceneError> {
        let color = self.colors.sample(self.config.max_brightness, rng)?;
        Ok(tint(crop, color))
    }
}
