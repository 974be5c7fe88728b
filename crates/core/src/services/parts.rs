//! Turning build artifacts and raw entries into positioned parts.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{MfgError, MfgResult};
use crate::flash::FlashMap;
use crate::model::{ImageSlot, Part, RawEntry};

/// Read an artifact and position it at the start of `area_name`.
///
/// Fails if the area is unknown or the artifact is larger than the area. The
/// data is never truncated to fit.
pub fn part_from_image(flash_map: &FlashMap, image_path: &Path, area_name: &str) -> MfgResult<Part> {
    let area = flash_map.get(area_name).ok_or_else(|| MfgError::UnknownFlashArea {
        image: image_path.to_path_buf(),
        area: area_name.to_string(),
    })?;

    let data = fs::read(image_path).map_err(MfgError::io("read image", image_path))?;

    if data.len() > area.size {
        return Err(MfgError::ImageTooLarge {
            image: image_path.to_path_buf(),
            area: area_name.to_string(),
            image_size: data.len(),
            area_size: area.size,
            overflow: data.len() - area.size,
        });
    }

    let base_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| image_path.display().to_string());

    Ok(Part { name: format!("{} ({})", area_name, base_name), offset: area.offset, data })
}

/// Convert configured raw entries into parts verbatim.
///
/// Raw entries skip the flash area lookup and the overflow check.
pub fn raw_entry_parts(entries: &[RawEntry]) -> Vec<Part> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| Part {
            name: format!("entry-{} ({})", i, entry.filename.display()),
            offset: entry.offset,
            data: entry.data.clone(),
        })
        .collect()
}

/// Exclusive upper bound for any byte a raw entry may cover.
///
/// Meta record offsets are `u32`, so nothing above 4 GiB is addressable.
pub const MAX_FLASH_ADDRESS: u64 = 1 << 32;

/// Reject raw entries whose end overflows or lies past [`MAX_FLASH_ADDRESS`].
///
/// Runs before anything is sized or allocated, so a bad offset from a config
/// file is an error rather than an overflow or a huge allocation.
pub fn check_raw_entries(entries: &[RawEntry]) -> MfgResult<()> {
    for entry in entries {
        let end = (entry.offset as u64).checked_add(entry.data.len() as u64);
        if end.map_or(true, |end| end > MAX_FLASH_ADDRESS) {
            return Err(MfgError::RawEntryOutOfRange {
                filename: entry.filename.clone(),
                offset: entry.offset,
                len: entry.data.len(),
                limit: MAX_FLASH_ADDRESS,
            });
        }
    }
    Ok(())
}

/// Role of an artifact within the application image targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRole {
    /// The loader of the first image target.
    Loader,
    /// The application of image target `image`.
    App { image: usize },
}

/// Decide which image slot an artifact occupies.
///
/// `first_has_loader` says whether the first image target carries a loader.
/// With a loader, the loader takes slot 0 and the first application slot 1;
/// otherwise each application takes the slot matching its index.
///
/// # Panics
///
/// Panics for an application index above 1. Image target counts are checked
/// when the image is configured, so such an index is a bug.
pub fn assign_slot(first_has_loader: bool, role: TargetRole) -> MfgResult<ImageSlot> {
    match (first_has_loader, role) {
        (true, TargetRole::Loader) => Ok(ImageSlot::Zero),
        (false, TargetRole::Loader) => Err(MfgError::SlotAssignment(
            "a loader is only supported on the first image target".to_string(),
        )),
        (true, TargetRole::App { image: 0 }) => Ok(ImageSlot::One),
        (false, TargetRole::App { image: 0 }) => Ok(ImageSlot::Zero),
        (true, TargetRole::App { image: 1 }) => Err(MfgError::SlotAssignment(
            "image 1 has no free slot; the loader and application of image 0 occupy both slots"
                .to_string(),
        )),
        (false, TargetRole::App { image: 1 }) => Ok(ImageSlot::One),
        (_, TargetRole::App { image }) => panic!("invalid image index: {image}"),
    }
}

/// What to do when two parts claim the same bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Fail the build.
    #[default]
    Reject,
    /// Keep going; the part copied later overwrites the earlier one.
    LastWins,
}

/// Put parts into processing order: ascending offset, ties broken by name.
pub fn sort_parts(parts: &mut [Part]) {
    parts.sort_by(|a, b| a.offset.cmp(&b.offset).then_with(|| a.name.cmp(&b.name)));
}

/// Check sorted parts for overlapping byte ranges.
///
/// Each part is compared with the part reaching furthest so far, which finds
/// every part that overlaps any earlier one. Empty parts never overlap.
pub fn check_overlaps(parts: &[Part], policy: OverlapPolicy) -> MfgResult<()> {
    let mut furthest: Option<&Part> = None;

    for part in parts.iter().filter(|p| !p.data.is_empty()) {
        if let Some(prev) = furthest {
            if part.offset < prev.end() {
                match policy {
                    OverlapPolicy::Reject => {
                        return Err(MfgError::PartsOverlap {
                            first: prev.name.clone(),
                            first_start: prev.offset,
                            first_end: prev.end(),
                            second: part.name.clone(),
                            second_start: part.offset,
                            second_end: part.end(),
                        });
                    }
                    OverlapPolicy::LastWins => {
                        warn!(
                            "part {} ({:#x}..{:#x}) overwrites part {} ({:#x}..{:#x})",
                            part.name,
                            part.offset,
                            part.end(),
                            prev.name,
                            prev.offset,
                            prev.end()
                        );
                    }
                }
            }
        }

        if furthest.map_or(true, |prev| part.end() > prev.end()) {
            furthest = Some(part);
        }
    }

    debug!("checked {} parts for overlap", parts.len());
    Ok(())
}
