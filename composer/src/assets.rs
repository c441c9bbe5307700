use std::collections::BTreeMap;

use image::{GrayImage, RgbImage};
use rand::Rng;

use crate::error::AssetError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pool {
    Textures,
    Grids,
    Stains,
}

impl Pool {
    pub fn name(self) -> &'static str {
        match self {
            Pool::Textures => "textures",
            Pool::Grids => "grids",
            Pool::Stains => "stains",
        }
    }
}

/// Extracted character: single-channel crop and a binary mask of the same size.
#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    pub crop: GrayImage,
    pub mask: GrayImage,
}

impl Glyph {
    pub fn new(crop: GrayImage, mask: GrayImage) -> Self {
        debug_assert_eq!(crop.dimensions(), mask.dimensions());
        Self { crop, mask }
    }
}

/// Everything a scene draws from. Implementations decide where images live;
/// the composer only asks for sizes and indices.
pub trait AssetSource {
    fn pool_len(&self, pool: Pool) -> usize;
    fn load(&self, pool: Pool, index: usize) -> Result<RgbImage, AssetError>;

    /// Glyph labels in a stable order.
    fn labels(&self) -> &[String];
    fn glyph_count(&self, label: &str) -> usize;
    fn glyph(&self, label: &str, index: usize) -> Result<Glyph, AssetError>;
}

pub fn random_from_pool<A, R>(assets: &A, pool: Pool, rng: &mut R) -> Result<RgbImage, AssetError>
where
    A: AssetSource + ?Sized,
    R: Rng + ?Sized,
{
    let len = assets.pool_len(pool);
    if len == 0 {
        return Err(AssetError::EmptyPool { pool: pool.name() });
    }
    assets.load(pool, rng.random_range(0..len))
}

/// Random label folder, then a random instance inside it.
pub fn random_glyph<A, R>(assets: &A, rng: &mut R) -> Result<(String, Glyph), AssetError>
where
    A: AssetSource + ?Sized,
    R: Rng + ?Sized,
{
    let labels = assets.labels();
    if labels.is_empty() {
        return Err(AssetError::EmptyPool { pool: "glyphs" });
    }
    let label = &labels[rng.random_range(0..labels.len())];
    let count = assets.glyph_count(label);
    if count == 0 {
        return Err(AssetError::EmptyPool { pool: "glyphs" });
    }
    let glyph = assets.glyph(label, rng.random_range(0..count))?;
    Ok((label.clone(), glyph))
}

/// In-memory asset pools.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssets {
    textures: Vec<RgbImage>,
    grids: Vec<RgbImage>,
    stains: Vec<RgbImage>,
    labels: Vec<String>,
    glyphs: BTreeMap<String, Vec<Glyph>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, pool: Pool, image: RgbImage) -> Self {
        match pool {
            Pool::Textures => self.textures.push(image),
            Pool::Grids => self.grids.push(image),
            Pool::Stains => self.stains.push(image),
        }
        self
    }

    pub fn with_glyph(mut self, label: impl Into<String>, glyph: Glyph) -> Self {
        self.glyphs.entry(label.into()).or_default().push(glyph);
        self.labels = self.glyphs.keys().cloned().collect();
        self
    }

    fn pool(&self, pool: Pool) -> &[RgbImage] {
        match pool {
            Pool::Textures => &self.textures,
            Pool::Grids => &self.grids,
            Pool::Stains => &self.stains,
        }
    }
}

impl AssetSource for MemoryAssets {
    fn pool_len(&self, pool: Pool) -> usize {
        self.pool(pool).len()
    }

    fn load(&self, pool: Pool, index: usize) -> Result<RgbImage, AssetError> {
        self.pool(pool)
            .get(index)
            .cloned()
            .ok_or(AssetError::EmptyPool { pool: pool.name() })
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn glyph_count(&self, label: &str) -> usize {
        self.glyphs.get(label).map_or(0, Vec::len)
    }

    fn glyph(&self, label: &str, index: usize) -> Result<Glyph, AssetError> {
        self.glyphs
            .get(label)
            .and_then(|g| g.get(index))
            .cloned()
            .ok_or_else(|| AssetError::UnknownLabel {
                label: label.to_string(),
            })
    }
}
