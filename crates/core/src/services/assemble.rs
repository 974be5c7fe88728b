//! Section layout and part placement.

use log::{debug, info};

use crate::error::MfgResult;
use crate::flash::FlashMap;
use crate::model::{Part, RawEntry, Section};

/// Value of unwritten flash. Gaps between parts must read back as this.
pub const ERASED_FLASH_VALUE: u8 = 0xff;

/// Size of section 0: the end of the highest used area or raw entry.
///
/// `used_areas` lists every flash area the build writes into (bootloader,
/// occupied image slots, the meta host area). Each must exist in the map.
pub fn section0_size(
    flash_map: &FlashMap,
    used_areas: &[&str],
    raw_entries: &[RawEntry],
) -> MfgResult<usize> {
    let mut greatest = 0;

    for name in used_areas {
        let area = flash_map.require(name)?;
        greatest = greatest.max(area.end());
    }

    for entry in raw_entries {
        greatest = greatest.max(entry.end());
    }

    Ok(greatest)
}

/// Copy a part into the blob at its offset.
///
/// # Panics
///
/// Panics if the part does not fit. Section sizing and the per-image overflow
/// check should make that impossible, so the blob is never clipped to fit.
pub fn insert_part_into_blob(blob: &mut [u8], part: &Part) {
    let end = part.offset.checked_add(part.data.len());
    match end {
        Some(end) if end <= blob.len() => {
            blob[part.offset..end].copy_from_slice(&part.data);
        }
        _ => panic!(
            "internal error; mfg blob too small: part {} at {:#x} ({} bytes) exceeds blob of {} bytes",
            part.name,
            part.offset,
            part.data.len(),
            blob.len()
        ),
    }
}

/// Allocate section 0, fill it with erased flash, and place every part.
///
/// Parts are copied in the order given; callers sort them first.
pub fn section0_data(size: usize, parts: &[Part]) -> Section {
    info!("section 0: {} bytes, {} parts", size, parts.len());

    let mut blob = vec![ERASED_FLASH_VALUE; size];
    for part in parts {
        debug!("placing {} at {:#x}..{:#x}", part.name, part.offset, part.end());
        insert_part_into_blob(&mut blob, part);
    }

    blob
}
