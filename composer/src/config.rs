use serde::{Deserialize, Serialize};

use crate::{error::SceneError, layer::BlendWeights, placement::Strategy};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneCfg {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub min_glyphs: u32,
    pub max_glyphs: u32,
    pub min_avg_height: u32,
    pub max_avg_height: u32,
    pub max_height_variance: f32, // fraction of the average height
    /// Grows (positive) or shrinks (negative) every placed box for overlap
    /// tests, in pixels.
    pub margin: i32,
    pub max_brightness: u32, // bound on r + g + b of the tint
    pub max_alpha: f32,
    pub grid_weights: BlendWeights,
    pub stain_weights: BlendWeights,
    pub placement: Strategy,
}

impl Default for SceneCfg {
    fn default() -> Self {
        Self {
            canvas_width: 400,
            canvas_height: 300,
            min_glyphs: 0,
            max_glyphs: 8,
            min_avg_height: 28,
            max_avg_height: 60,
            max_height_variance: 0.2,
            margin: 5,
            max_brightness: 200,
            max_alpha: 0.2,
            grid_weights: BlendWeights::default(),
            stain_weights: BlendWeights::default(),
            placement: Strategy::default(),
        }
    }
}

impl SceneCfg {
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(SceneError::invalid_config("canvas must be at least 1x1"));
        }
        if self.min_glyphs > self.max_glyphs {
            return Err(SceneError::invalid_config(format!(
                "min_glyphs {} exceeds max_glyphs {}",
                self.min_glyphs, self.max_glyphs
            )));
        }
        if self.min_avg_height == 0 || self.min_avg_height > self.max_avg_height {
            return Err(SceneError::invalid_config(format!(
                "average height range {}..={} is empty or starts at zero",
                self.min_avg_height, self.max_avg_height
            )));
        }
        if !(0.0..1.0).contains(&self.max_height_variance) {
            return Err(SceneError::invalid_config(format!(
                "max_height_variance {} is outside [0, 1)",
                self.max_height_variance
            )));
        }
        if !(0.0..=1.0).contains(&self.max_alpha) {
            return Err(SceneError::invalid_config(format!(
                "max_alpha {} is outside [0, 1]",
                self.max_alpha
            )));
        }
        if self.max_brightness == 0 {
            return Err(SceneError::invalid_config("max_brightness must be positive"));
        }
        Ok(())
    }
}
