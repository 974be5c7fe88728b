use anyhow::{Context, Result};
use mfg_core::config::load_mfg_config;

use crate::canonicalize_or_current;
use crate::commands::print_paths;

/// List every file a build of this config reads, without opening any of them.
pub fn inputs_command(config: &str, json: bool) -> Result<()> {
    let config_path = canonicalize_or_current(config)?;
    let cfg = load_mfg_config(&config_path)?;
    let paths = cfg.input_paths();

    if json {
        let serialized =
            serde_json::to_string_pretty(&paths).context("Failed to serialize inputs to JSON")?;
        println!("{}", serialized);
    } else {
        print_paths("Inputs", &paths);
    }

    Ok(())
}
