use anyhow::{Context, Result};

use crate::commands::{load_image, print_paths};

/// Build a manufacturing image and report every path read and written.
pub fn create_command(config: &str, out_dir: &str, json: bool) -> Result<()> {
    let (cfg, image) = load_image(config, out_dir)?;

    let artifacts = image
        .create()
        .with_context(|| format!("Failed to create manufacturing image {}", cfg.name))?;

    if json {
        let serialized = serde_json::to_string_pretty(&artifacts)
            .context("Failed to serialize artifact paths to JSON")?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Created manufacturing image:");
    println!("  Name: {}", cfg.name);
    println!("  Root: {}", image.layout().root.display());
    print_paths("Inputs", &artifacts.from_paths);
    print_paths("Outputs", &artifacts.to_paths);

    Ok(())
}
