use anyhow::{Context, Result};
use mfg_core::config::load_mfg_config;
use mfg_core::flash::FlashArea;

use crate::canonicalize_or_current;

/// Show the flash map a config resolves to, ordered by device and offset.
pub fn flash_map_command(config: &str, json: bool) -> Result<()> {
    let config_path = canonicalize_or_current(config)?;
    let cfg = load_mfg_config(&config_path)?;
    let flash_map = cfg.load_flash_map()?;
    let areas: Vec<&FlashArea> = flash_map.areas_by_offset();

    if json {
        let serialized = serde_json::to_string_pretty(&areas)
            .context("Failed to serialize flash map to JSON")?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Flash areas ({}):", areas.len());
    for area in areas {
        println!(
            "  - {} [id: {}, device: {}] {:#010x}..{:#010x} ({} bytes)",
            area.name,
            area.id,
            area.device,
            area.offset,
            area.end(),
            area.size
        );
    }

    Ok(())
}
