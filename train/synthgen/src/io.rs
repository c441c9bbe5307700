use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use composer::{AnnotationRecord, Match, MatchRecord, Scene};
use image::RgbImage;
use tracing::{debug, info};

pub fn image_file_name(id: u32) -> String {
    format!("{id:06}.png")
}

/// Saves scene images as they come and writes all annotations as one JSON
/// array when finalized.
pub struct DatasetWriter {
    image_root: PathBuf,
    annotations_path: PathBuf,
    records: Vec<AnnotationRecord>,
}

impl DatasetWriter {
    pub fn init_output(image_root: &Path, annotations_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(image_root)
            .with_context(|| format!("creating {}", image_root.display()))?;
        if let Some(parent) = annotations_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        Ok(Self {
            image_root: image_root.to_path_buf(),
            annotations_path: annotations_path.to_path_buf(),
            records: Vec::new(),
        })
    }

    pub fn write_scene(&mut self, id: u32, seed: u64, scene: &Scene) -> Result<()> {
        let file_name = image_file_name(id);
        let out_path = self.image_root.join(&file_name);
        scene
            .canvas
            .save(&out_path)
            .with_context(|| format!("writing {}", out_path.display()))?;
        debug!(path = %out_path.display(), matches = scene.matches.len(), "scene saved");

        self.records.push(AnnotationRecord {
            filepath: file_name,
            matches: scene.matches.iter().map(MatchRecord::from).collect(),
            seed: Some(seed),
        });
        Ok(())
    }

    pub fn finalize_output(self) -> Result<PathBuf> {
        let file = File::create(&self.annotations_path)
            .with_context(|| format!("creating {}", self.annotations_path.display()))?;
        let mut writer = BufWriter::with_capacity(8 << 20, file);
        serde_json::to_writer(&mut writer, &self.records)?;
        writer.flush()?;
        writer.into_inner()?.sync_all()?;
        info!(
            path = %self.annotations_path.display(),
            records = self.records.len(),
            "annotations written"
        );
        Ok(self.annotations_path)
    }
}

pub fn load_annotations(path: &Path) -> Result<Vec<AnnotationRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

/// Every annotated scene with its image, matches checked against the image.
pub fn load_labeled_data(
    annotations_path: &Path,
    image_root: &Path,
) -> Result<Vec<(RgbImage, Vec<Match>)>> {
    load_annotations(annotations_path)?
        .into_iter()
        .map(|rec| {
            let path = image_root.join(&rec.filepath);
            debug!(path = %path.display(), "loading image");
            let image = image::open(&path)
                .with_context(|| format!("reading {}", path.display()))?
                .to_rgb8();
            let matches = rec
                .matches
                .into_iter()
                .map(Match::try_from)
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("annotations of {}", rec.filepath))?;
            for m in &matches {
                ensure!(
                    m.bbox.fits_within(image.width(), image.height()),
                    "{}: box {:?} leaves the image",
                    rec.filepath,
                    m.bbox
                );
            }
            Ok((image, matches))
        })
        .collect()
}
