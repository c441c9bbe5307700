use std::path::PathBuf;

use clap::Parser;
use composer::{Foreground, extract::DEFAULT_THRESHOLD};
use glyph_cutter::cutter::{CutterCfg, cut_tree};
use tracing::Level;

/// Crop every raw glyph scan to its ink and write a matching binary mask.
#[derive(Parser, Debug)]
#[command(name = "glyph-cutter", version)]
struct Cli {
    /// Label-organized tree of raw scans.
    #[arg(long, default_value = "data/mnist_png")]
    src: PathBuf,

    #[arg(long, default_value = "data/mnist_crop")]
    crops: PathBuf,

    #[arg(long, default_value = "data/mnist_mask")]
    masks: PathBuf,

    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: u8,

    /// Scans have dark ink on light paper.
    #[arg(long)]
    dark_foreground: bool,

    /// Write scans with contour boxes drawn here instead of crops and masks.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Abort on the first scan that cannot be processed.
    #[arg(long)]
    fail_fast: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = CutterCfg {
        src_root: cli.src,
        crop_root: cli.crops,
        mask_root: cli.masks,
        debug_root: cli.debug_dir,
        foreground: if cli.dark_foreground {
            Foreground::Dark
        } else {
            Foreground::Bright
        },
        threshold: cli.threshold,
        fail_fast: cli.fail_fast,
    };
    cut_tree(&cfg)?;
    Ok(())
}
