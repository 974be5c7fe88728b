use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod commands;

/// Default output base directory; each image lands in `<base>/<name>`.
pub const DEFAULT_OUT_DIR: &str = "bin/mfgs";

/// Canonicalize the path if possible, falling back to the given string
/// relative to the current working directory.
pub fn canonicalize_or_current(root: &str) -> Result<PathBuf> {
    let path = Path::new(root);
    if path == Path::new(".") {
        Ok(env::current_dir().context("Failed to get current directory")?)
    } else {
        // Output directories usually do not exist yet; canonicalize fails
        // for those, so join with the current dir instead.
        match path.canonicalize() {
            Ok(p) => Ok(p),
            Err(_) => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(path))
            }
        }
    }
}

/// Map a `-v` count to a log level: warn, info, debug, then trace.
pub fn verbosity_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Initialize `env_logger`; `RUST_LOG` still overrides the level.
pub fn init_logging(verbose: u8) {
    let _ = env_logger::Builder::new()
        .filter_level(verbosity_level(verbose))
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}
