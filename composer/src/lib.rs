//! Synthetic instance-segmentation scenes: glyph extraction, texture and
//! overlay sampling, non-overlapping glyph placement and the per-instance
//! annotations that go with them.

pub mod assets;
pub mod color;
pub mod config;
pub mod error;
pub mod extract;
pub mod geom;
pub mod layer;
pub mod placement;
pub mod record;
pub mod scene;
pub mod window;

pub use assets::{AssetSource, Glyph, MemoryAssets, Pool};
pub use color::{Color, ColorSampler};
pub use config::SceneCfg;
pub use error::{AssetError, ExtractionError, PlacementError, RecordError, SamplingError, SceneError};
pub use extract::{Extraction, Foreground, GlyphExtractor};
pub use geom::{BoundingBox, OccupiedRegion};
pub use placement::{Occupancy, PlacementPlanner, Strategy};
pub use record::{AnnotationRecord, MatchRecord};
pub use scene::{Match, Scene, SceneComposer};
