//! Build configuration: which targets, raw blobs and flash map make up an
//! image.
//!
//! A config file is YAML (`.yml`/`.yaml`) or JSON. Relative paths inside it
//! resolve against the file's own directory. Raw entry files are read while
//! loading, so everything past this module works on in-memory data.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::flash::{load_flash_map, FlashMap, FlashMapSpec};
use crate::layout::MfgLayout;
use crate::model::{BuildTarget, RawEntry};
use crate::services::{MetaPolicy, MfgImage, OverlapPolicy};
use crate::units::deserialize_size;

/// A raw blob as written in the config file; its bytes are read on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntrySpec {
    pub filename: PathBuf,
    #[serde(deserialize_with = "deserialize_size")]
    pub offset: usize,
}

/// Serializable description of one manufacturing image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfgConfig {
    /// Image name; names the output directory and section files.
    pub name: String,
    /// Inline flash map. Exactly one of `flash_map` / `flash_map_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_map: Option<FlashMapSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_map_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootloader: Option<BuildTarget>,
    #[serde(default)]
    pub images: Vec<BuildTarget>,
    #[serde(default)]
    pub raw: Vec<RawEntrySpec>,
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
    #[serde(default)]
    pub meta: MetaPolicy,
}

impl MfgConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flash_map: None,
            flash_map_path: None,
            bootloader: None,
            images: Vec::new(),
            raw: Vec::new(),
            overlap_policy: OverlapPolicy::default(),
            meta: MetaPolicy::default(),
        }
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        let resolve_target = |t: &mut BuildTarget| {
            resolve(&mut t.elf);
            resolve(&mut t.binary);
            if let Some(m) = t.manifest.as_mut() {
                resolve(m);
            }
            if let Some(loader) = t.loader.as_mut() {
                resolve(&mut loader.elf);
                resolve(&mut loader.binary);
            }
        };

        if let Some(path) = self.flash_map_path.as_mut() {
            resolve(path);
        }
        if let Some(boot) = self.bootloader.as_mut() {
            resolve_target(boot);
        }
        for image in &mut self.images {
            resolve_target(image);
        }
        for raw in &mut self.raw {
            resolve(&mut raw.filename);
        }
    }

    /// Every file a build of this config reads, in the order
    /// [`MfgImage::from_paths`] reports them. Nothing is opened.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> =
            self.bootloader.iter().chain(&self.images).flat_map(BuildTarget::input_paths).collect();
        paths.extend(self.raw.iter().map(|r| r.filename.clone()));
        paths
    }

    /// Load and validate the flash map, inline or from its own file.
    pub fn load_flash_map(&self) -> Result<FlashMap> {
        match (&self.flash_map, &self.flash_map_path) {
            (Some(spec), None) => Ok(FlashMap::from_spec(spec)?),
            (None, Some(path)) => load_flash_map(path),
            (Some(_), Some(_)) => {
                Err(anyhow!("Config sets both flash_map and flash_map_path; use one"))
            }
            (None, None) => Err(anyhow!("Config needs a flash_map or a flash_map_path")),
        }
    }

    /// Read every raw entry's file into memory, in config order.
    pub fn load_raw_entries(&self) -> Result<Vec<RawEntry>> {
        self.raw
            .iter()
            .map(|spec| {
                let data = fs::read(&spec.filename).with_context(|| {
                    format!("Failed to read raw entry {}", spec.filename.display())
                })?;
                Ok(RawEntry { filename: spec.filename.clone(), offset: spec.offset, data })
            })
            .collect()
    }
}

/// Parse a config document in the given format (`yaml`, `yml` or `json`).
pub fn parse_mfg_config(body: &str, format: &str) -> Result<MfgConfig> {
    let config = match format {
        "json" => serde_json::from_str(body).context("Failed to parse mfg config JSON")?,
        "yaml" | "yml" => serde_yaml::from_str(body).context("Failed to parse mfg config YAML")?,
        other => return Err(anyhow!("Unsupported mfg config format '{}'", other)),
    };
    Ok(config)
}

/// Load a config file and resolve its relative paths.
pub fn load_mfg_config(path: &Path) -> Result<MfgConfig> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read mfg config at {}", path.display()))?;
    let format = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let mut config = parse_mfg_config(&body, format)?;

    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    config.resolve_paths(&base);
    Ok(config)
}

/// Turn a loaded config into a ready-to-build image writing under `out_dir`.
pub fn mfg_image_from_config(config: &MfgConfig, out_dir: &Path) -> Result<MfgImage> {
    let flash_map = config.load_flash_map()?;
    let raw_entries = config.load_raw_entries()?;
    let layout = MfgLayout::new(out_dir, &config.name);

    let mut image = MfgImage::new(layout, flash_map)
        .with_images(config.images.clone())?
        .with_raw_entries(raw_entries)
        .with_overlap_policy(config.overlap_policy)
        .with_meta_policy(config.meta.clone());
    if let Some(boot) = &config.bootloader {
        image = image.with_bootloader(boot.clone());
    }
    Ok(image)
}

/// Load the config at `config_path` and build the image context from it.
pub fn load_mfg_image(config_path: &Path, out_dir: &Path) -> Result<MfgImage> {
    let config = load_mfg_config(config_path)?;
    mfg_image_from_config(&config, out_dir)
        .with_context(|| format!("Invalid mfg config {}", config_path.display()))
}
