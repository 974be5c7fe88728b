//! Manufacturing meta record and the integrity stamp.
//!
//! The meta record sits flush against the end of a host flash area (the
//! bootloader area by default). Layout, all integers little-endian:
//!
//! ```text
//! [flash area TLV]*   type=0x02 size=12 | area u8 | device u8 | pad u16 | offset u32 | size u32
//! [hash TLV]          type=0x01 size=32 | sha256 [u8; 32]
//! [footer]            size u16 | version u8 | pad u8 | magic u32
//! ```
//!
//! Stamping is two-pass: the record is written with a zeroed hash field, the
//! digest is taken over all sections as they stand (placeholder included),
//! and the digest is then patched into the field. A verifier zeroes the
//! stored field again, hashes every section, and compares. The field is
//! never excluded from the hashed range.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MfgError, MfgResult};
use crate::flash::{FlashArea, FlashMap, FLASH_AREA_NAME_BOOTLOADER};
use crate::model::{Part, Section};
use crate::services::assemble::ERASED_FLASH_VALUE;

pub const META_MAGIC: u32 = 0x3bb2_a269;
pub const META_VERSION: u8 = 1;

pub const META_TLV_TYPE_HASH: u8 = 0x01;
pub const META_TLV_TYPE_FLASH_AREA: u8 = 0x02;

pub const META_TLV_HEADER_SIZE: usize = 2;
pub const META_TLV_FLASH_AREA_SIZE: usize = 12;
pub const META_FOOTER_SIZE: usize = 8;

/// Width of the reserved hash field (SHA-256).
pub const MFG_HASH_SIZE: usize = 32;

/// Where the meta record goes and what it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaPolicy {
    /// Flash area whose tail hosts the record.
    pub area: String,
    /// Emit one TLV per flash area ahead of the hash TLV.
    pub include_flash_areas: bool,
}

impl Default for MetaPolicy {
    fn default() -> Self {
        Self { area: FLASH_AREA_NAME_BOOTLOADER.to_string(), include_flash_areas: true }
    }
}

/// Encoded meta record with its hash field still zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaRecord {
    bytes: Vec<u8>,
    hash_offset: usize,
}

impl MetaRecord {
    pub fn build(flash_map: &FlashMap, policy: &MetaPolicy) -> MfgResult<Self> {
        let mut bytes = Vec::new();

        if policy.include_flash_areas {
            for area in flash_map.areas_by_id() {
                write_flash_area_tlv(&mut bytes, area)?;
            }
        }

        bytes.push(META_TLV_TYPE_HASH);
        bytes.push(MFG_HASH_SIZE as u8);
        let hash_offset = bytes.len();
        bytes.extend_from_slice(&[0u8; MFG_HASH_SIZE]);

        let total = bytes.len() + META_FOOTER_SIZE;
        let total_u16 = u16::try_from(total).map_err(|_| MfgError::MetaRegionTooLarge {
            area: policy.area.clone(),
            required: total,
            available: u16::MAX as usize,
        })?;
        bytes.extend_from_slice(&total_u16.to_le_bytes());
        bytes.push(META_VERSION);
        bytes.push(0xff);
        bytes.extend_from_slice(&META_MAGIC.to_le_bytes());

        Ok(Self { bytes, hash_offset })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset of the hash field relative to the start of the record.
    pub fn hash_offset(&self) -> usize {
        self.hash_offset
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn meta_u32(area: &FlashArea, field: &'static str, value: usize) -> MfgResult<u32> {
    u32::try_from(value).map_err(|_| MfgError::MetaFieldOverflow {
        area: area.name.clone(),
        field,
        value,
    })
}

fn write_flash_area_tlv(buf: &mut Vec<u8>, area: &FlashArea) -> MfgResult<()> {
    let offset = meta_u32(area, "offset", area.offset)?;
    let size = meta_u32(area, "size", area.size)?;

    buf.push(META_TLV_TYPE_FLASH_AREA);
    buf.push(META_TLV_FLASH_AREA_SIZE as u8);
    buf.push(area.id);
    buf.push(area.device);
    buf.extend_from_slice(&0xffffu16.to_le_bytes());
    buf.extend_from_slice(&offset.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    Ok(())
}

/// Reserve the meta record at the end of the host area.
///
/// Returns the absolute offset of the zeroed hash field in `section0`. No
/// non-empty part in `parts` may reach into the record's range, even when its
/// bytes there are erased, and the destination bytes must still be erased.
///
/// # Panics
///
/// Panics if `section0` does not reach the end of the host area, which
/// section sizing guarantees.
pub fn insert_meta(
    section0: &mut [u8],
    flash_map: &FlashMap,
    policy: &MetaPolicy,
    parts: &[Part],
) -> MfgResult<usize> {
    let area = flash_map.require(&policy.area)?;
    let record = MetaRecord::build(flash_map, policy)?;

    if record.len() > area.size {
        return Err(MfgError::MetaRegionTooLarge {
            area: area.name.clone(),
            required: record.len(),
            available: area.size,
        });
    }

    assert!(
        area.end() <= section0.len(),
        "internal error; section 0 ({} bytes) does not cover meta host area {} ending at {:#x}",
        section0.len(),
        area.name,
        area.end()
    );

    let meta_off = area.end() - record.len();
    let meta_range = meta_off..area.end();
    let occupied = || MfgError::MetaRegionOccupied { area: area.name.clone(), required: record.len() };

    let intruder = parts.iter().find(|p| {
        let range = p.range();
        !range.is_empty() && range.start < meta_range.end && meta_range.start < range.end
    });
    if let Some(part) = intruder {
        debug!(
            "part {} ({:#x}..{:#x}) reaches the meta record at {:#x}",
            part.name,
            part.offset,
            part.end(),
            meta_off
        );
        return Err(occupied());
    }

    let region = &mut section0[meta_range];
    if region.iter().any(|b| *b != ERASED_FLASH_VALUE) {
        return Err(occupied());
    }

    region.copy_from_slice(record.as_bytes());
    Ok(meta_off + record.hash_offset())
}

/// SHA-256 over the concatenation of all sections.
pub fn calc_meta_hash(sections: &[Section]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for section in sections {
        hasher.update(section);
    }
    hasher.finalize().to_vec()
}

/// Overwrite the reserved hash field with `digest`.
///
/// # Panics
///
/// Panics if the digest width differs from [`MFG_HASH_SIZE`] or the field
/// lies outside the section.
pub fn patch_hash(section: &mut [u8], hash_offset: usize, digest: &[u8]) {
    assert_eq!(
        digest.len(),
        MFG_HASH_SIZE,
        "internal error; digest is {} bytes, reserved hash field is {}",
        digest.len(),
        MFG_HASH_SIZE
    );
    assert!(
        hash_offset + MFG_HASH_SIZE <= section.len(),
        "internal error; hash field at {:#x} lies outside section of {} bytes",
        hash_offset,
        section.len()
    );
    section[hash_offset..hash_offset + MFG_HASH_SIZE].copy_from_slice(digest);
}

/// Hash the sections with the placeholder in place, then patch section 0.
///
/// Returns the digest for the manifest.
pub fn stamp_sections(sections: &mut [Section], hash_offset: usize) -> Vec<u8> {
    let hash = calc_meta_hash(sections);
    patch_hash(&mut sections[0], hash_offset, &hash);
    info!("mfg hash: {}", crate::model::to_hex(&hash));
    hash
}

/// Flash area entry decoded from a meta record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaFlashArea {
    pub id: u8,
    pub device: u8,
    pub offset: u32,
    pub size: u32,
}

/// Meta record decoded from a finished section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedMeta {
    pub version: u8,
    /// Absolute offset of the record in the section.
    pub offset: usize,
    /// Absolute offset of the hash field in the section.
    pub hash_offset: usize,
    pub hash: Vec<u8>,
    pub flash_areas: Vec<MetaFlashArea>,
}

/// Decode the meta record that ends at `area.end()` in `section0`.
pub fn parse_meta(section0: &[u8], area: &FlashArea) -> MfgResult<ParsedMeta> {
    let not_found = |reason: String| MfgError::MetaNotFound { area: area.name.clone(), reason };

    let end = area.end();
    if end > section0.len() {
        return Err(not_found(format!(
            "section 0 is {} bytes but the area ends at {:#x}",
            section0.len(),
            end
        )));
    }
    if area.size < META_FOOTER_SIZE {
        return Err(not_found("area is smaller than the meta footer".to_string()));
    }

    let footer = &section0[end - META_FOOTER_SIZE..end];
    let size = u16::from_le_bytes([footer[0], footer[1]]) as usize;
    let version = footer[2];
    let magic = u32::from_le_bytes([footer[4], footer[5], footer[6], footer[7]]);

    if magic != META_MAGIC {
        return Err(not_found(format!("bad magic {magic:#010x}")));
    }
    if size < META_FOOTER_SIZE || size > area.size {
        return Err(not_found(format!("bad record size {size}")));
    }

    let start = end - size;
    let body = &section0[start..end - META_FOOTER_SIZE];

    let mut hash = None;
    let mut flash_areas = Vec::new();
    let mut pos = 0;
    while pos < body.len() {
        if pos + META_TLV_HEADER_SIZE > body.len() {
            return Err(not_found(format!("truncated TLV header at {:#x}", start + pos)));
        }
        let ty = body[pos];
        let len = body[pos + 1] as usize;
        let value_start = pos + META_TLV_HEADER_SIZE;
        let value_end = value_start + len;
        if value_end > body.len() {
            return Err(not_found(format!("TLV at {:#x} runs past the footer", start + pos)));
        }
        let value = &body[value_start..value_end];

        match ty {
            META_TLV_TYPE_HASH if len == MFG_HASH_SIZE => {
                hash = Some((start + value_start, value.to_vec()));
            }
            META_TLV_TYPE_FLASH_AREA if len == META_TLV_FLASH_AREA_SIZE => {
                flash_areas.push(MetaFlashArea {
                    id: value[0],
                    device: value[1],
                    offset: u32::from_le_bytes([value[4], value[5], value[6], value[7]]),
                    size: u32::from_le_bytes([value[8], value[9], value[10], value[11]]),
                });
            }
            _ => {}
        }

        pos = value_end;
    }

    let (hash_offset, hash) = hash.ok_or_else(|| not_found("no hash TLV".to_string()))?;
    Ok(ParsedMeta { version, offset: start, hash_offset, hash, flash_areas })
}
