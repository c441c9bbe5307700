use std::ops::Range;

use anyhow::Result;
use composer::{AssetSource, Scene, SceneComposer, SceneError};
use rand::{RngCore, SeedableRng, rngs::SmallRng};
use rand_xoshiro::SplitMix64;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::io::DatasetWriter;

/// Scenes composed in memory before they are flushed to disk in parallel mode.
const CHUNK: usize = 64;

pub struct GenOptions {
    pub seed: u64,
    pub debug: bool,
    pub parallel: bool,
    pub fail_fast: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct GenSummary {
    pub written: usize,
    pub failed: usize,
}

pub struct DatasetGenerator<'a, A: AssetSource + Sync> {
    pub composer: SceneComposer<'a, A>,
    pub options: GenOptions,
}

/// Per-scene seed, independent of generation order.
pub fn scene_seed(run_seed: u64, id: u32) -> u64 {
    let mut sm = SplitMix64::seed_from_u64(run_seed.wrapping_add(id as u64));
    sm.next_u64()
}

impl<A: AssetSource + Sync> DatasetGenerator<'_, A> {
    pub fn compose_one(&self, id: u32) -> (u32, u64, Result<Scene, SceneError>) {
        let seed = scene_seed(self.options.seed, id);
        let mut rng = SmallRng::seed_from_u64(seed);
        let scene = if self.options.debug {
            self.composer.compose_debug(&mut rng)
        } else {
            self.composer.compose(&mut rng)
        };
        (id, seed, scene)
    }

    pub fn generate(&self, ids: Range<u32>, writer: &mut DatasetWriter) -> Result<GenSummary> {
        let ids: Vec<u32> = ids.collect();
        let mut summary = GenSummary::default();

        for chunk in ids.chunks(if self.options.parallel { CHUNK } else { 1 }) {
            let composed: Vec<_> = if self.options.parallel {
                chunk.par_iter().map(|&id| self.compose_one(id)).collect()
            } else {
                chunk.iter().map(|&id| self.compose_one(id)).collect()
            };

            for (id, seed, scene) in composed {
                match scene {
                    Ok(scene) => {
                        writer.write_scene(id, seed, &scene)?;
                        summary.written += 1;
                    }
                    Err(err) if !self.options.fail_fast => {
                        warn!(id, seed, "scene skipped: {err}");
                        summary.failed += 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        info!(written = summary.written, failed = summary.failed, "generation done");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use composer::{ColorSampler, SceneCfg};

    use super::*;
    use crate::{
        assets::{DiskAssets, tests::fixture},
        io::load_labeled_data,
    };

    fn options(parallel: bool) -> GenOptions {
        GenOptions {
            seed: 5,
            debug: false,
            parallel,
            fail_fast: true,
        }
    }

    #[test]
    fn seeds_do_not_depend_on_order() {
        assert_eq!(scene_seed(1, 10), scene_seed(1, 10));
        assert_ne!(scene_seed(1, 10), scene_seed(1, 11));
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = DiskAssets::open(&fixture(tmp.path())).unwrap();
        let colors = ColorSampler::new();
        let cfg = SceneCfg {
            min_glyphs: 1,
            max_glyphs: 4,
            ..SceneCfg::default()
        };
        colors.prewarm(cfg.max_brightness).unwrap();

        let mut runs = Vec::new();
        for parallel in [false, true] {
            let out = tmp.path().join(format!("out-{parallel}"));
            let ann = out.join("annotations.json");
            let generator = DatasetGenerator {
                composer: SceneComposer::new(&assets, &colors, &cfg).unwrap(),
                options: options(parallel),
            };
            let mut writer = DatasetWriter::init_output(&out, &ann).unwrap();
            let summary = generator.generate(1..6, &mut writer).unwrap();
            assert_eq!(summary, GenSummary { written: 5, failed: 0 });
            writer.finalize_output().unwrap();
            runs.push(load_labeled_data(&ann, &out).unwrap());
        }

        assert_eq!(runs[0].len(), 5);
        for (a, b) in runs[0].iter().zip(&runs[1]) {
            assert_eq!(a.1, b.1);
            assert_eq!(a.0, b.0);
        }
    }

    #[test]
    fn failures_are_counted_unless_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let roots = fixture(tmp.path());
        std::fs::remove_file(roots.mask_root.join("4").join("0.png")).unwrap();
        std::fs::remove_file(roots.mask_root.join("9").join("0.png")).unwrap();
        let assets = DiskAssets::open(&roots).unwrap();
        let colors = ColorSampler::new();
        let cfg = SceneCfg {
            min_glyphs: 1,
            max_glyphs: 1,
            ..SceneCfg::default()
        };

        let out = tmp.path().join("out");
        let mut writer = DatasetWriter::init_output(&out, &out.join("a.json")).unwrap();
        let mut generator = DatasetGenerator {
            composer: SceneComposer::new(&assets, &colors, &cfg).unwrap(),
            options: options(false),
        };
        generator.options.fail_fast = false;
        let summary = generator.generate(0..3, &mut writer).unwrap();
        assert_eq!(summary, GenSummary { written: 0, failed: 3 });

        generator.options.fail_fast = true;
        assert!(generator.generate(0..1, &mut writer).is_err());
    }
}
