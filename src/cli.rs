use clap::Parser;
use std::path::PathBuf;

// Build version with engine info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Engine: scripted (JSON scene documents)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Headless scene player: load, edit, swap assets, play
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Scene document to load
    #[arg(value_name = "SCENE")]
    pub scene: PathBuf,

    /// Display frames to run after loading
    #[arg(short = 'n', long = "frames", value_name = "N", default_value_t = 0)]
    pub frames: u32,

    /// Directory pending scene assets are fetched from (default: scene directory)
    #[arg(short = 'a', long = "asset-dir", value_name = "DIR")]
    pub asset_dir: Option<PathBuf>,

    /// Replace an asset after loading (can be specified multiple times)
    #[arg(short = 'r', long = "replace", value_name = "ID:KIND:PATH")]
    pub replace: Vec<String>,

    /// Set an attribute after loading (can be specified multiple times)
    #[arg(short = 's', long = "set", value_name = "LAYER.ATTR=VALUE")]
    pub set: Vec<String>,

    /// Viewport size
    #[arg(long = "size", value_name = "WxH")]
    pub size: Option<String>,

    /// Do not start playback after loading
    #[arg(long = "no-autoplay")]
    pub no_autoplay: bool,

    /// Seek to frame after loading
    #[arg(long = "seek", value_name = "N")]
    pub seek: Option<i32>,

    /// Enable debug logging to file (default: scena.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

/// `1280x720` -> (1280.0, 720.0)
pub fn parse_size(text: &str) -> Option<(f64, f64)> {
    let (w, h) = text.split_once(['x', 'X'])?;
    let w = w.trim().parse::<f64>().ok()?;
    let h = h.trim().parse::<f64>().ok()?;
    Some((w, h))
}

/// `layer1.opacity=0.5` -> ("layer1.opacity", "0.5")
pub fn parse_assignment(text: &str) -> Option<(&str, &str)> {
    let (key, value) = text.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}
