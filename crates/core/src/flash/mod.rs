//! Flash area directory.
//!
//! A `FlashMap` maps symbolic area names to their byte range on the device.
//! The build pipeline only reads it. Loading, id assignment and validation
//! happen here so that everything downstream can assume a consistent map.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{MfgError, MfgResult};
use crate::units::deserialize_size;

pub const FLASH_AREA_NAME_BOOTLOADER: &str = "FLASH_AREA_BOOTLOADER";
pub const FLASH_AREA_NAME_IMAGE_0: &str = "FLASH_AREA_IMAGE_0";
pub const FLASH_AREA_NAME_IMAGE_1: &str = "FLASH_AREA_IMAGE_1";
pub const FLASH_AREA_NAME_IMAGE_SCRATCH: &str = "FLASH_AREA_IMAGE_SCRATCH";

/// System areas in id order; an area with one of these names and no explicit
/// id gets its index here as id.
pub const SYSTEM_AREA_NAMES: [&str; 4] = [
    FLASH_AREA_NAME_BOOTLOADER,
    FLASH_AREA_NAME_IMAGE_0,
    FLASH_AREA_NAME_IMAGE_1,
    FLASH_AREA_NAME_IMAGE_SCRATCH,
];

/// A named, fixed region of device storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashArea {
    pub name: String,
    pub id: u8,
    pub device: u8,
    pub offset: usize,
    pub size: usize,
}

impl FlashArea {
    pub fn new(name: impl Into<String>, id: u8, offset: usize, size: usize) -> Self {
        Self { name: name.into(), id, device: 0, offset, size }
    }

    /// One past the last byte of the area.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// On-disk description of one area; the name is the key in [`FlashMapSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashAreaSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u8>,
    #[serde(default)]
    pub device: u8,
    #[serde(deserialize_with = "deserialize_size")]
    pub offset: usize,
    #[serde(deserialize_with = "deserialize_size")]
    pub size: usize,
}

/// On-disk flash map document: `{ areas: { NAME: { offset, size, ... } } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMapSpec {
    pub areas: BTreeMap<String, FlashAreaSpec>,
}

/// Validated flash area directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMap {
    areas: BTreeMap<String, FlashArea>,
}

impl FlashMap {
    /// Build a map from fully specified areas, validating the layout.
    pub fn new(areas: impl IntoIterator<Item = FlashArea>) -> MfgResult<Self> {
        let mut map = BTreeMap::new();
        for area in areas {
            if map.contains_key(&area.name) {
                return Err(MfgError::InvalidFlashMap(format!(
                    "flash area \"{}\" defined twice",
                    area.name
                )));
            }
            map.insert(area.name.clone(), area);
        }
        let flash_map = Self { areas: map };
        flash_map.validate()?;
        Ok(flash_map)
    }

    /// Build a map from its on-disk form, assigning ids where none are given.
    pub fn from_spec(spec: &FlashMapSpec) -> MfgResult<Self> {
        let mut used: BTreeSet<u8> = spec.areas.values().filter_map(|a| a.id).collect();
        let mut ids: BTreeMap<&str, u8> = BTreeMap::new();

        for (name, area) in &spec.areas {
            if let Some(id) = area.id {
                ids.insert(name.as_str(), id);
            }
        }

        for (idx, name) in SYSTEM_AREA_NAMES.iter().enumerate() {
            let id = idx as u8;
            if spec.areas.contains_key(*name) && !ids.contains_key(name) && !used.contains(&id) {
                ids.insert(*name, id);
                used.insert(id);
            }
        }

        let mut unassigned: Vec<(&String, &FlashAreaSpec)> =
            spec.areas.iter().filter(|(name, _)| !ids.contains_key(name.as_str())).collect();
        unassigned.sort_by(|a, b| a.1.offset.cmp(&b.1.offset).then(a.0.cmp(b.0)));

        let mut next: u16 = SYSTEM_AREA_NAMES.len() as u16;
        for (name, _) in unassigned {
            while next <= u8::MAX as u16 && used.contains(&(next as u8)) {
                next += 1;
            }
            if next > u8::MAX as u16 {
                return Err(MfgError::InvalidFlashMap(format!(
                    "no free area id left for flash area \"{name}\""
                )));
            }
            ids.insert(name.as_str(), next as u8);
            used.insert(next as u8);
        }

        let areas = spec.areas.iter().map(|(name, area)| FlashArea {
            name: name.clone(),
            id: ids[name.as_str()],
            device: area.device,
            offset: area.offset,
            size: area.size,
        });
        Self::new(areas)
    }

    /// Look up an area by name.
    pub fn get(&self, name: &str) -> Option<&FlashArea> {
        self.areas.get(name)
    }

    /// Look up an area that the build cannot do without.
    pub fn require(&self, name: &str) -> MfgResult<&FlashArea> {
        self.get(name).ok_or_else(|| MfgError::MissingFlashArea { area: name.to_string() })
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Areas ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &FlashArea> {
        self.areas.values()
    }

    /// Areas ordered by id; this is the order used in the meta record.
    pub fn areas_by_id(&self) -> Vec<&FlashArea> {
        let mut areas: Vec<&FlashArea> = self.areas.values().collect();
        areas.sort_by_key(|a| a.id);
        areas
    }

    /// Areas ordered by device, then offset.
    pub fn areas_by_offset(&self) -> Vec<&FlashArea> {
        let mut areas: Vec<&FlashArea> = self.areas.values().collect();
        areas.sort_by(|a, b| (a.device, a.offset, &a.name).cmp(&(b.device, b.offset, &b.name)));
        areas
    }

    fn validate(&self) -> MfgResult<()> {
        let mut ids = BTreeMap::new();
        for area in self.areas.values() {
            if area.size == 0 {
                return Err(MfgError::InvalidFlashMap(format!(
                    "flash area \"{}\" has zero size",
                    area.name
                )));
            }
            if area.offset.checked_add(area.size).is_none() {
                return Err(MfgError::InvalidFlashMap(format!(
                    "flash area \"{}\" extends past the end of the address space",
                    area.name
                )));
            }
            if let Some(other) = ids.insert(area.id, &area.name) {
                return Err(MfgError::InvalidFlashMap(format!(
                    "flash areas \"{}\" and \"{}\" share id {}",
                    other, area.name, area.id
                )));
            }
        }

        let sorted = self.areas_by_offset();
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.device == b.device && b.offset < a.end() {
                return Err(MfgError::InvalidFlashMap(format!(
                    "flash areas \"{}\" ({:#x}..{:#x}) and \"{}\" ({:#x}..{:#x}) overlap on device {}",
                    a.name,
                    a.offset,
                    a.end(),
                    b.name,
                    b.offset,
                    b.end(),
                    a.device
                )));
            }
        }

        Ok(())
    }
}

/// Parse a flash map document, choosing YAML or JSON by file extension.
pub fn parse_flash_map(body: &str, format: &str) -> Result<FlashMapSpec> {
    let spec = match format {
        "json" => serde_json::from_str(body).context("Failed to parse flash map JSON")?,
        "yaml" | "yml" => serde_yaml::from_str(body).context("Failed to parse flash map YAML")?,
        other => return Err(anyhow!("Unsupported flash map format '{}'", other)),
    };
    Ok(spec)
}

/// Load and validate a standalone flash map file.
pub fn load_flash_map(path: &Path) -> Result<FlashMap> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read flash map at {}", path.display()))?;
    let format = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let spec = parse_flash_map(&body, format)
        .with_context(|| format!("Failed to load flash map {}", path.display()))?;
    let flash_map = FlashMap::from_spec(&spec)?;
    Ok(flash_map)
}
