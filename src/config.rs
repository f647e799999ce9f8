use std::path::PathBuf;

use clap::Parser;

use crate::model::EditOptions;
use crate::thumbnail::{self, DEFAULT_THUMBNAIL_QUALITY, DEFAULT_THUMBNAIL_SIZE};
use crate::viewport::ViewportOptions;

#[derive(Parser, Debug, Default)]
#[command(name = "qiv", version, about = "Quick image viewer with crop, rotate and white balance")]
pub struct Cli {
    /// Image to open, or a directory to browse as thumbnails
    pub path: Option<PathBuf>,

    /// Where generated thumbnails are kept
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Longest side of generated thumbnails, in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(32..=1024))]
    pub thumbnail_size: Option<u32>,

    /// Keep white balance as an adjustable layer instead of baking it into the image
    #[arg(long)]
    pub no_bake_white_balance: bool,
}

/// Runtime settings. Everything has a default; the CLI overrides a few.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub initial_path: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub thumbnail_size: u32,
    pub thumbnail_quality: u8,
    pub recursive_depth: usize,
    pub scan_batch_size: usize,
    pub rotate_step_degrees: f64,
    pub exposure_step_ev: f64,
    pub edit: EditOptions,
    pub viewport: ViewportOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_path: None,
            cache_dir: thumbnail::default_cache_dir()
                .unwrap_or_else(|| std::env::temp_dir().join("qiv").join("thumbnails")),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            thumbnail_quality: DEFAULT_THUMBNAIL_QUALITY,
            recursive_depth: 2,
            scan_batch_size: 8,
            rotate_step_degrees: 1.0,
            exposure_step_ev: 0.25,
            edit: EditOptions::default(),
            viewport: ViewportOptions::default(),
        }
    }
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Self {
        let mut settings = Settings::default();
        settings.initial_path = cli.path;
        if let Some(dir) = cli.cache_dir {
            settings.cache_dir = dir;
        }
        if let Some(size) = cli.thumbnail_size {
            settings.thumbnail_size = size;
        }
        if cli.no_bake_white_balance {
            settings.edit.bake_white_balance = false;
        }
        settings
    }
}
