use std::path::{Path, PathBuf};

use anyhow::Result;
use mfg_core::config::{load_mfg_config, mfg_image_from_config, MfgConfig};
use mfg_core::services::MfgImage;

use crate::canonicalize_or_current;

/// Load a config file and build the image context writing under `out_dir`.
pub fn load_image(config: &str, out_dir: &str) -> Result<(MfgConfig, MfgImage)> {
    let config_path = canonicalize_or_current(config)?;
    let out_path = canonicalize_or_current(out_dir)?;
    let cfg = load_mfg_config(&config_path)?;
    let image = mfg_image_from_config(&cfg, &out_path)?;
    Ok((cfg, image))
}

/// Print a titled list of paths, one per line.
pub fn print_paths(title: &str, paths: &[PathBuf]) {
    println!("{title} ({}):", paths.len());
    if paths.is_empty() {
        println!("  (none)");
        return;
    }
    for path in paths {
        println!("  {}", path.display());
    }
}

/// Render `path` relative to `base` when it lives underneath it.
pub fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}
