use std::path::PathBuf;

use log::info;

use crate::error::{MfgError, MfgResult};
use crate::flash::{FlashMap, FLASH_AREA_NAME_BOOTLOADER};
use crate::layout::MfgLayout;
use crate::model::{BuildTarget, ImageSlot, Part, RawEntry, Section};
use crate::services::assemble::{section0_data, section0_size};
use crate::services::meta::{insert_meta, stamp_sections, MetaPolicy};
use crate::services::parts::{
    assign_slot, check_overlaps, check_raw_entries, part_from_image, raw_entry_parts, sort_parts,
    OverlapPolicy, TargetRole,
};
use crate::services::writer::{
    copy_bin_file, create_manifest, write_manifest, write_sections, MfgArtifacts,
};

/// Maximum number of application image targets.
pub const MAX_IMAGE_TARGETS: usize = 2;

/// In-memory result of a build, before anything is written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    pub sections: Vec<Section>,
    pub hash: Vec<u8>,
    /// Absolute offset of the hash field in section 0.
    pub hash_offset: usize,
    /// Parts in the order they were placed: `(name, offset, len)`.
    pub parts: Vec<(String, usize, usize)>,
}

/// Flashable artifact destined for an image slot, read from its staged copy.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SlotSource {
    slot: ImageSlot,
    path: PathBuf,
}

/// Context for building one manufacturing image.
///
/// Construct once per invocation, configure, then call [`MfgImage::create`].
#[derive(Debug, Clone)]
pub struct MfgImage {
    layout: MfgLayout,
    flash_map: FlashMap,
    boot: Option<BuildTarget>,
    images: Vec<BuildTarget>,
    raw_entries: Vec<RawEntry>,
    overlap_policy: OverlapPolicy,
    meta_policy: MetaPolicy,
}

impl MfgImage {
    pub fn new(layout: MfgLayout, flash_map: FlashMap) -> Self {
        Self {
            layout,
            flash_map,
            boot: None,
            images: Vec::new(),
            raw_entries: Vec::new(),
            overlap_policy: OverlapPolicy::default(),
            meta_policy: MetaPolicy::default(),
        }
    }

    pub fn with_bootloader(mut self, target: BuildTarget) -> Self {
        self.boot = Some(target);
        self
    }

    /// Set the application targets; at most two, and only the first may
    /// carry a loader.
    pub fn with_images(mut self, images: Vec<BuildTarget>) -> MfgResult<Self> {
        if images.len() > MAX_IMAGE_TARGETS {
            return Err(MfgError::TooManyImages(images.len()));
        }
        if images.iter().skip(1).any(|t| t.loader.is_some()) {
            return Err(MfgError::SlotAssignment(
                "a loader is only supported on the first image target".to_string(),
            ));
        }
        if images.len() == MAX_IMAGE_TARGETS && images[0].loader.is_some() {
            return Err(MfgError::SlotAssignment(
                "image 1 has no free slot; the loader and application of image 0 occupy both slots"
                    .to_string(),
            ));
        }
        self.images = images;
        Ok(self)
    }

    pub fn with_raw_entries(mut self, entries: Vec<RawEntry>) -> Self {
        self.raw_entries = entries;
        self
    }

    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    pub fn with_meta_policy(mut self, policy: MetaPolicy) -> Self {
        self.meta_policy = policy;
        self
    }

    pub fn layout(&self) -> &MfgLayout {
        &self.layout
    }

    pub fn flash_map(&self) -> &FlashMap {
        &self.flash_map
    }

    pub fn meta_policy(&self) -> &MetaPolicy {
        &self.meta_policy
    }

    fn first_has_loader(&self) -> bool {
        self.images.first().map_or(false, |t| t.loader.is_some())
    }

    /// Every file the build reads, without building anything.
    pub fn from_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> =
            self.boot.iter().chain(&self.images).flat_map(BuildTarget::input_paths).collect();
        paths.extend(self.raw_entries.iter().map(|e| e.filename.clone()));
        paths
    }

    /// Staged copies of target outputs, in reporting order.
    fn staged_to_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(boot) = &self.boot {
            let dir = &self.layout.boot_dir;
            paths.push(MfgLayout::staged_path(dir, &boot.binary));
            paths.push(MfgLayout::staged_path(dir, &boot.elf));
            if let Some(manifest) = &boot.manifest {
                paths.push(MfgLayout::staged_path(dir, manifest));
            }
        }
        for (i, image) in self.images.iter().enumerate() {
            let dir = self.layout.image_dir(i);
            if let Some(loader) = &image.loader {
                paths.push(MfgLayout::staged_path(&dir, &loader.binary));
                paths.push(MfgLayout::staged_path(&dir, &loader.elf));
            }
            paths.push(MfgLayout::staged_path(&dir, &image.binary));
            paths.push(MfgLayout::staged_path(&dir, &image.elf));
            if let Some(manifest) = &image.manifest {
                paths.push(MfgLayout::staged_path(&dir, manifest));
            }
        }
        paths
    }

    /// Copy every target output into the staging tree.
    fn copy_bin_files(&self) -> MfgResult<()> {
        if let Some(boot) = &self.boot {
            for path in boot.input_paths() {
                copy_bin_file(&path, &self.layout.boot_dir)?;
            }
        }
        for (i, image) in self.images.iter().enumerate() {
            let dir = self.layout.image_dir(i);
            for path in image.input_paths() {
                copy_bin_file(&path, &dir)?;
            }
        }
        Ok(())
    }

    fn dst_boot_bin_path(&self) -> Option<PathBuf> {
        self.boot.as_ref().map(|b| MfgLayout::staged_path(&self.layout.boot_dir, &b.binary))
    }

    /// Staged flashable artifacts and the slot each one occupies.
    fn slot_sources(&self) -> MfgResult<Vec<SlotSource>> {
        let first_has_loader = self.first_has_loader();
        let mut sources = Vec::new();

        for (i, image) in self.images.iter().enumerate() {
            let dir = self.layout.image_dir(i);
            if let Some(loader) = &image.loader {
                let slot = assign_slot(first_has_loader, TargetRole::Loader)?;
                sources.push(SlotSource { slot, path: MfgLayout::staged_path(&dir, &loader.binary) });
            }
            let slot = assign_slot(first_has_loader, TargetRole::App { image: i })?;
            sources.push(SlotSource { slot, path: MfgLayout::staged_path(&dir, &image.binary) });
        }

        Ok(sources)
    }

    fn target_parts(&self, slots: &[SlotSource]) -> MfgResult<Vec<Part>> {
        let mut parts = Vec::new();

        if let Some(boot_path) = self.dst_boot_bin_path() {
            parts.push(part_from_image(&self.flash_map, &boot_path, FLASH_AREA_NAME_BOOTLOADER)?);
        }

        for source in slots {
            parts.push(part_from_image(&self.flash_map, &source.path, source.slot.area_name())?);
        }

        Ok(parts)
    }

    /// Flash areas section 0 has to cover.
    fn used_areas<'a>(&'a self, slots: &[SlotSource]) -> Vec<&'a str> {
        let mut areas = Vec::new();
        if self.boot.is_some() {
            areas.push(FLASH_AREA_NAME_BOOTLOADER);
        }
        for source in slots {
            areas.push(source.slot.area_name());
        }
        areas.push(self.meta_policy.area.as_str());
        areas
    }

    /// Stage inputs and assemble the stamped sections in memory.
    ///
    /// Nothing but the staged copies is written; a failure here leaves no
    /// section or manifest behind.
    pub fn build(&self) -> MfgResult<BuiltImage> {
        check_raw_entries(&self.raw_entries)?;
        self.copy_bin_files()?;

        let slots = self.slot_sources()?;
        let mut parts = self.target_parts(&slots)?;
        parts.extend(raw_entry_parts(&self.raw_entries));
        sort_parts(&mut parts);
        check_overlaps(&parts, self.overlap_policy)?;

        let size = section0_size(&self.flash_map, &self.used_areas(&slots), &self.raw_entries)?;
        let mut section0 = section0_data(size, &parts);
        let hash_offset = insert_meta(&mut section0, &self.flash_map, &self.meta_policy, &parts)?;

        // Additional sections would be appended here.
        let mut sections = vec![section0];
        let hash = stamp_sections(&mut sections, hash_offset);

        let parts = parts.iter().map(|p| (p.name.clone(), p.offset, p.data.len())).collect();
        Ok(BuiltImage { sections, hash, hash_offset, parts })
    }

    /// Build the image and write sections and manifest.
    pub fn create(&self) -> MfgResult<MfgArtifacts> {
        let built = self.build()?;

        let section_paths = write_sections(&self.layout, &built.sections)?;
        let manifest = create_manifest(&built.hash);
        let manifest_path = write_manifest(&self.layout, &manifest)?;

        info!("wrote manufacturing image {} to {}", self.layout.name, self.layout.root.display());

        let mut to_paths = self.staged_to_paths();
        to_paths.extend(section_paths);
        to_paths.push(manifest_path);

        Ok(MfgArtifacts { from_paths: self.from_paths(), to_paths })
    }
}

