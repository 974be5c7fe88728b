use anyhow::{anyhow, Context, Result};
use mfg_core::services::verify_mfg_image;

use crate::commands::{display_relative, load_image};

/// Check a previously created image against its manifest and meta record.
pub fn verify_command(config: &str, out_dir: &str, json: bool) -> Result<()> {
    let (cfg, image) = load_image(config, out_dir)?;
    let layout = image.layout();

    let report = verify_mfg_image(layout, image.flash_map(), image.meta_policy())
        .with_context(|| format!("Failed to verify manufacturing image {}", cfg.name))?;

    if json {
        let serialized =
            serde_json::to_string_pretty(&report).context("Failed to serialize report to JSON")?;
        println!("{}", serialized);
    } else {
        println!("Manufacturing image: {}", cfg.name);
        println!("  Build time: {}", report.build_time);
        for section in &report.sections {
            println!("  Section: {}", display_relative(section, &layout.root));
        }
        println!("  Manifest hash: {}", report.manifest_hash);
        println!("  Stored hash:   {}", report.stored_hash);
        println!("  Computed hash: {}", report.computed_hash);
    }

    if !report.is_valid() {
        return Err(anyhow!(
            "Manufacturing hash mismatch for {}: computed {}, manifest {}, stored {}",
            cfg.name,
            report.computed_hash,
            report.manifest_hash,
            report.stored_hash
        ));
    }

    if !json {
        println!("OK");
    }
    Ok(())
}
