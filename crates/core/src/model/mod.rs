//! Core data model for manufacturing image builds.
//!
//! - Build targets and loaders (inputs produced by an external builder)
//! - Parts and raw entries (bytes positioned at absolute offsets)
//! - Sections and the build manifest (outputs)

use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::flash::{FLASH_AREA_NAME_IMAGE_0, FLASH_AREA_NAME_IMAGE_1};

/// One contiguous flashable blob.
pub type Section = Vec<u8>;

/// Secondary "loader" component of an application target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderTarget {
    pub name: String,
    /// Compiled executable (ELF).
    pub elf: PathBuf,
    /// Flashable image.
    pub binary: PathBuf,
}

/// Outputs of a compiled bootloader or application target.
///
/// These are plain paths into the external builder's output tree; nothing in
/// this crate compiles or inspects them beyond copying and reading bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub name: String,
    /// Compiled executable (ELF).
    pub elf: PathBuf,
    /// Flashable image (`.elf.bin` for a bootloader, `.img` for an app).
    pub binary: PathBuf,
    /// Per-target build manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderTarget>,
}

impl BuildTarget {
    pub fn new(name: impl Into<String>, elf: impl Into<PathBuf>, binary: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            elf: elf.into(),
            binary: binary.into(),
            manifest: None,
            loader: None,
        }
    }

    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    pub fn with_loader(mut self, loader: LoaderTarget) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Files this target contributes to a build: loader ELF and image first,
    /// then the target's ELF, flashable binary and manifest.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(loader) = &self.loader {
            paths.push(loader.elf.clone());
            paths.push(loader.binary.clone());
        }
        paths.push(self.elf.clone());
        paths.push(self.binary.clone());
        paths.extend(self.manifest.clone());
        paths
    }
}

/// Bytes that go at an absolute offset in section 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Diagnostic label, e.g. `FLASH_AREA_IMAGE_0 (blinky.img)`.
    pub name: String,
    pub offset: usize,
    pub data: Vec<u8>,
}

impl Part {
    pub fn end(&self) -> usize {
        self.offset + self.data.len()
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// User-declared blob placed at a fixed offset without any flash area lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub filename: PathBuf,
    pub offset: usize,
    pub data: Vec<u8>,
}

impl RawEntry {
    pub fn end(&self) -> usize {
        self.offset + self.data.len()
    }
}

/// Image slot an application artifact is flashed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageSlot {
    Zero,
    One,
}

impl ImageSlot {
    /// Flash area backing this slot.
    pub fn area_name(self) -> &'static str {
        match self {
            ImageSlot::Zero => FLASH_AREA_NAME_IMAGE_0,
            ImageSlot::One => FLASH_AREA_NAME_IMAGE_1,
        }
    }
}

/// Side-channel record written next to the section binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub build_time: String,
    pub mfg_hash: String,
}

/// Lowercase hex encoding used for hashes in manifests and reports.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
