use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use composer::{Foreground, GlyphExtractor};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub struct CutterCfg {
    pub src_root: PathBuf,
    pub crop_root: PathBuf,
    pub mask_root: PathBuf,
    /// When set, raw scans with their contour boxes drawn go here instead of
    /// crops and masks.
    pub debug_root: Option<PathBuf>,
    pub foreground: Foreground,
    pub threshold: u8,
    pub fail_fast: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CutSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Same relative path under another root; parent directories are created.
pub fn mirror_path(path: &Path, from_root: &Path, to_root: &Path) -> Result<PathBuf> {
    let rel = path
        .strip_prefix(from_root)
        .with_context(|| format!("{} is not under {}", path.display(), from_root.display()))?;
    let out = to_root.join(rel);
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(out)
}

pub fn cut_tree(cfg: &CutterCfg) -> Result<CutSummary> {
    let extractor = GlyphExtractor::new(cfg.threshold);
    let mut summary = CutSummary::default();

    for entry in WalkDir::new(&cfg.src_root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", cfg.src_root.display()))?;
        if entry.file_type().is_dir() {
            debug!(dir = %entry.path().display(), "processing folder");
            continue;
        }
        match cut_file(&extractor, entry.path(), cfg) {
            Ok(()) => summary.written += 1,
            Err(err) if !cfg.fail_fast => {
                warn!(file = %entry.path().display(), "skipped: {err:#}");
                summary.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    info!(written = summary.written, skipped = summary.skipped, "glyph extraction done");
    Ok(summary)
}

fn cut_file(extractor: &GlyphExtractor, path: &Path, cfg: &CutterCfg) -> Result<()> {
    let image = image::open(path)
        .with_context(|| format!("reading {}", path.display()))?
        .to_rgb8();

    if let Some(debug_root) = &cfg.debug_root {
        let marked = extractor.annotate(&image, cfg.foreground)?;
        let out = mirror_path(path, &cfg.src_root, debug_root)?;
        return marked
            .save(&out)
            .with_context(|| format!("writing {}", out.display()));
    }

    let cut = extractor.extract(&image, cfg.foreground)?;
    let crop_out = mirror_path(path, &cfg.src_root, &cfg.crop_root)?;
    let mask_out = mirror_path(path, &cfg.src_root, &cfg.mask_root)?;
    cut.crop
        .save(&crop_out)
        .with_context(|| format!("writing {}", crop_out.display()))?;
    cut.mask
        .save(&mask_out)
        .with_context(|| format!("writing {}", mask_out.display()))?;
    Ok(())
}
