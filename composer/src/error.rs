use std::path::PathBuf;

use thiserror::Error;

/// Thresholding left nothing to crop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no foreground contours found at threshold {threshold}")]
    NoContours { threshold: u8 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error(
        "no valid anchor for a {width}x{height} box on a {canvas_width}x{canvas_height} canvas \
         with {occupied} occupied region(s)"
    )]
    NoValidAnchor {
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
        occupied: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplingError {
    #[error("no colour has a channel sum below {max_brightness}")]
    EmptyColorSet { max_brightness: u32 },

    #[error(
        "a {source_width}x{source_height} source cannot host a window with the aspect of \
         {target_width}x{target_height}"
    )]
    DegenerateWindow {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
    },
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("asset pool `{pool}` is empty")]
    EmptyPool { pool: &'static str },

    #[error("unknown glyph label `{label}`")]
    UnknownLabel { label: String },

    #[error("mask {} does not match its crop size", path.display())]
    MaskMismatch { path: PathBuf },
}

/// Failures converting an annotation record back into a match.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("mask row {row} has {found} values, expected {expected}")]
    RaggedMask {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("mask is {mask_width}x{mask_height} but the bounding box is {box_width}x{box_height}")]
    MaskSizeMismatch {
        mask_width: u32,
        mask_height: u32,
        box_width: u32,
        box_height: u32,
    },

    #[error("bounding box corners are out of order: {0:?}")]
    InvertedBox([[u32; 2]; 2]),
}

/// Everything that can abort a single scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("invalid scene config: {0}")]
    InvalidConfig(String),
}

impl SceneError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
