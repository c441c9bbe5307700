use std::{
    collections::BTreeMap,
    fs::read_dir,
    path::{Path, PathBuf},
};

use composer::{AssetError, AssetSource, Glyph, Pool};
use image::{GrayImage, Luma, RgbImage, imageops, imageops::FilterType};
use tracing::{debug, info};

/// Where each pool lives on disk. Glyph crops are `crop_root/<label>/<file>`
/// with the mask at the same relative path under `mask_root`.
#[derive(Clone, Debug)]
pub struct AssetRoots {
    pub textures: PathBuf,
    pub grids: PathBuf,
    pub stains: PathBuf,
    pub crop_root: PathBuf,
    pub mask_root: PathBuf,
}

/// Directory listings taken once; images are decoded on demand.
pub struct DiskAssets {
    textures: Vec<PathBuf>,
    grids: Vec<PathBuf>,
    stains: Vec<PathBuf>,
    crop_root: PathBuf,
    mask_root: PathBuf,
    labels: Vec<String>,
    glyph_files: BTreeMap<String, Vec<String>>,
}

impl DiskAssets {
    pub fn open(roots: &AssetRoots) -> Result<Self, AssetError> {
        let mut glyph_files = BTreeMap::new();
        for dir in list_entries(&roots.crop_root, true)? {
            let Some(label) = dir.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            let files: Vec<String> = list_entries(&dir, false)?
                .iter()
                .filter_map(|p| p.file_name().and_then(|s| s.to_str()).map(str::to_string))
                .collect();
            glyph_files.insert(label.to_string(), files);
        }

        let assets = Self {
            textures: list_entries(&roots.textures, false)?,
            grids: list_entries(&roots.grids, false)?,
            stains: list_entries(&roots.stains, false)?,
            crop_root: roots.crop_root.clone(),
            mask_root: roots.mask_root.clone(),
            labels: glyph_files.keys().cloned().collect(),
            glyph_files,
        };
        info!(
            textures = assets.textures.len(),
            grids = assets.grids.len(),
            stains = assets.stains.len(),
            labels = assets.labels.len(),
            "asset pools listed"
        );
        Ok(assets)
    }

    fn pool(&self, pool: Pool) -> &[PathBuf] {
        match pool {
            Pool::Textures => &self.textures,
            Pool::Grids => &self.grids,
            Pool::Stains => &self.stains,
        }
    }
}

impl AssetSource for DiskAssets {
    fn pool_len(&self, pool: Pool) -> usize {
        self.pool(pool).len()
    }

    fn load(&self, pool: Pool, index: usize) -> Result<RgbImage, AssetError> {
        let path = self
            .pool(pool)
            .get(index)
            .ok_or(AssetError::EmptyPool { pool: pool.name() })?;
        Ok(open_image(path)?.to_rgb8())
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn glyph_count(&self, label: &str) -> usize {
        self.glyph_files.get(label).map_or(0, Vec::len)
    }

    fn glyph(&self, label: &str, index: usize) -> Result<Glyph, AssetError> {
        let file = self
            .glyph_files
            .get(label)
            .and_then(|files| files.get(index))
            .ok_or_else(|| AssetError::UnknownLabel {
                label: label.to_string(),
            })?;
        load_glyph(
            &self.crop_root.join(label).join(file),
            &self.mask_root.join(label).join(file),
        )
    }
}

/// Every glyph under `crop_root/<label>/` with its mirrored mask, labels in
/// sorted order. With `resize`, crop and mask are scaled to that size, the
/// mask without interpolation so it stays binary.
pub fn load_glyph_samples(
    crop_root: &Path,
    mask_root: &Path,
    resize: Option<(u32, u32)>,
) -> Result<Vec<(String, Glyph)>, AssetError> {
    let mut samples = Vec::new();
    for dir in list_entries(crop_root, true)? {
        let Some(label) = dir.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        debug!(label, root = %crop_root.display(), "loading label");
        for crop_path in list_entries(&dir, false)? {
            let Some(file) = crop_path.file_name() else {
                continue;
            };
            let mut glyph = load_glyph(&crop_path, &mask_root.join(label).join(file))?;
            if let Some((w, h)) = resize {
                glyph = Glyph::new(
                    imageops::resize(&glyph.crop, w, h, FilterType::Triangle),
                    imageops::resize(&glyph.mask, w, h, FilterType::Nearest),
                );
            }
            samples.push((label.to_string(), glyph));
        }
    }
    info!(root = %crop_root.display(), samples = samples.len(), "glyph samples loaded");
    Ok(samples)
}

/// Crop as single-channel intensity, mask re-binarized; sizes must agree.
fn load_glyph(crop_path: &Path, mask_path: &Path) -> Result<Glyph, AssetError> {
    let crop = open_image(crop_path)?.to_luma8();
    let mask = binarize(&open_image(mask_path)?.to_luma8());
    if crop.dimensions() != mask.dimensions() {
        return Err(AssetError::MaskMismatch {
            path: mask_path.to_path_buf(),
        });
    }
    Ok(Glyph::new(crop, mask))
}

fn open_image(path: &Path) -> Result<image::DynamicImage, AssetError> {
    if !path.is_file() {
        return Err(AssetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    image::open(path).map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Lossy formats smear mask edges; anything lit counts as foreground.
fn binarize(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get_pixel(x, y)[0] > 0 { 255 } else { 0 }])
    })
}

/// Sorted child paths that are directories (`dirs`) or files.
fn list_entries(dir: &Path, dirs: bool) -> Result<Vec<PathBuf>, AssetError> {
    let not_found = || AssetError::NotFound {
        path: dir.to_path_buf(),
    };
    let mut entries: Vec<PathBuf> = read_dir(dir)
        .map_err(|_| not_found())?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| if dirs { p.is_dir() } else { p.is_file() })
        .collect();
    entries.sort();
    Ok(entries)
}
