use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use composer::{ColorSampler, Foreground, SceneCfg, SceneComposer, extract::DEFAULT_THRESHOLD};
use glyph_cutter::cutter::{CutterCfg, cut_tree};
use tracing::{Level, info};

use crate::{
    assets::{AssetRoots, DiskAssets, load_glyph_samples},
    generator::{DatasetGenerator, GenOptions},
    io::{DatasetWriter, load_labeled_data},
};

mod assets;
mod generator;
mod io;

#[derive(Parser, Debug)]
#[command(name = "synthgen", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose scenes and write images plus one annotation file.
    Generate(GenerateArgs),
    /// Load a generated dataset back and report what it holds.
    Inspect(InspectArgs),
    /// Load the training and testing glyph samples, cutting raw scans first
    /// when the crop or mask tree is missing.
    Samples(SamplesArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[arg(long, default_value = "data/textures")]
    textures: PathBuf,
    #[arg(long, default_value = "data/grids")]
    grids: PathBuf,
    #[arg(long, default_value = "data/stains")]
    stains: PathBuf,
    /// Label folders of glyph crops.
    #[arg(long, default_value = "data/mnist_crop/testing")]
    crops: PathBuf,
    /// Label folders of glyph masks, mirroring `--crops`.
    #[arg(long, default_value = "data/mnist_mask/testing")]
    masks: PathBuf,

    #[arg(long, default_value = "data/mask_rcnn/images")]
    images: PathBuf,
    #[arg(long, default_value = "data/mask_rcnn/annotations/annotations.json")]
    annotations: PathBuf,

    /// Scene config JSON; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    count: u32,
    /// First scene id; ids double as image file names.
    #[arg(long, default_value_t = 1)]
    start_id: u32,
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Outline every match box on the saved images.
    #[arg(long)]
    debug: bool,
    /// Compose scenes on all cores.
    #[arg(long)]
    parallel: bool,
    /// Abort on the first scene that cannot be composed.
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    #[arg(long, default_value = "data/mask_rcnn/annotations/annotations.json")]
    annotations: PathBuf,
    #[arg(long, default_value = "data/mask_rcnn/images")]
    images: PathBuf,
}

#[derive(Parser, Debug)]
struct SamplesArgs {
    /// Raw scans, only read when the crop or mask tree is missing.
    #[arg(long, default_value = "data/mnist_png")]
    src: PathBuf,
    #[arg(long, default_value = "data/mnist_crop")]
    crops: PathBuf,
    #[arg(long, default_value = "data/mnist_mask")]
    masks: PathBuf,

    #[arg(long, default_value_t = 28)]
    width: u32,
    #[arg(long, default_value_t = 28)]
    height: u32,
    /// Keep every glyph at its cropped size.
    #[arg(long)]
    no_resize: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Samples(args) => cmd_samples(args),
    }
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<SceneCfg>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SceneCfg::default(),
    };

    let assets = DiskAssets::open(&AssetRoots {
        textures: args.textures,
        grids: args.grids,
        stains: args.stains,
        crop_root: args.crops,
        mask_root: args.masks,
    })?;
    let colors = ColorSampler::new();
    colors.prewarm(cfg.max_brightness)?;

    let generator = DatasetGenerator {
        composer: SceneComposer::new(&assets, &colors, &cfg)?,
        options: GenOptions {
            seed: args.seed,
            debug: args.debug,
            parallel: args.parallel,
            fail_fast: args.fail_fast,
        },
    };
    let mut writer = DatasetWriter::init_output(&args.images, &args.annotations)?;
    let end = args.start_id.saturating_add(args.count);
    let summary = generator.generate(args.start_id..end, &mut writer)?;
    if summary.written == 0 && summary.failed > 0 {
        bail!("all {} scenes failed; see the warnings above", summary.failed);
    }
    writer.finalize_output()?;
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let data = load_labeled_data(&args.annotations, &args.images)?;
    let mut per_label: BTreeMap<&str, usize> = BTreeMap::new();
    for m in data.iter().flat_map(|(_, matches)| matches) {
        *per_label.entry(m.label.as_str()).or_default() += 1;
    }
    info!(scenes = data.len(), "dataset loaded");
    for (label, count) in per_label {
        info!(label, count, "matches");
    }
    Ok(())
}

fn cmd_samples(args: SamplesArgs) -> anyhow::Result<()> {
    if !args.crops.is_dir() || !args.masks.is_dir() {
        info!(src = %args.src.display(), "glyph trees missing, cutting raw scans");
        cut_tree(&CutterCfg {
            src_root: args.src,
            crop_root: args.crops.clone(),
            mask_root: args.masks.clone(),
            debug_root: None,
            foreground: Foreground::Bright,
            threshold: DEFAULT_THRESHOLD,
            fail_fast: false,
        })?;
    }

    let resize = (!args.no_resize).then_some((args.width, args.height));
    for split in ["training", "testing"] {
        let samples = load_glyph_samples(&args.crops.join(split), &args.masks.join(split), resize)
            .with_context(|| format!("loading {split} samples"))?;
        let mut per_label: BTreeMap<&str, usize> = BTreeMap::new();
        for (label, _) in &samples {
            *per_label.entry(label.as_str()).or_default() += 1;
        }
        info!(split, samples = samples.len(), labels = per_label.len(), "split loaded");
        for (label, count) in per_label {
            info!(split, label, count, "samples");
        }
    }
    Ok(())
}
