//! Offline verification of a finished manufacturing image.
//!
//! Re-reads the section files and manifest from disk and checks the hash
//! round trip: zero the stored hash field, hash all sections, and compare the
//! result against both the manifest and the stored field.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{MfgError, MfgResult};
use crate::flash::FlashMap;
use crate::layout::MfgLayout;
use crate::model::{to_hex, Section};
use crate::services::meta::{calc_meta_hash, parse_meta, MetaPolicy, MFG_HASH_SIZE};
use crate::services::writer::read_manifest;

/// Outcome of verifying one manufacturing image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub sections: Vec<PathBuf>,
    pub build_time: String,
    pub manifest_hash: String,
    pub stored_hash: String,
    pub computed_hash: String,
}

impl VerifyReport {
    pub fn is_valid(&self) -> bool {
        self.computed_hash == self.manifest_hash && self.computed_hash == self.stored_hash
    }
}

/// Read section files in index order, stopping at the first missing index.
pub fn read_sections(layout: &MfgLayout) -> MfgResult<(Vec<PathBuf>, Vec<Section>)> {
    let mut paths = Vec::new();
    let mut sections = Vec::new();

    loop {
        let path = layout.section_path(sections.len());
        if !path.is_file() && !sections.is_empty() {
            break;
        }
        let data = fs::read(&path).map_err(MfgError::io("read section", &path))?;
        paths.push(path);
        sections.push(data);
    }

    Ok((paths, sections))
}

/// Verify the image laid out under `layout` against its manifest.
///
/// A mismatch is reported through [`VerifyReport::is_valid`], not as an
/// error; errors mean the image could not be read or has no meta record.
pub fn verify_mfg_image(
    layout: &MfgLayout,
    flash_map: &FlashMap,
    policy: &MetaPolicy,
) -> MfgResult<VerifyReport> {
    let manifest = read_manifest(layout)?;
    let (paths, mut sections) = read_sections(layout)?;

    let area = flash_map.require(&policy.area)?;
    let meta = parse_meta(&sections[0], area)?;

    let field = meta.hash_offset..meta.hash_offset + MFG_HASH_SIZE;
    sections[0][field].fill(0);
    let computed = calc_meta_hash(&sections);

    Ok(VerifyReport {
        sections: paths,
        build_time: manifest.build_time,
        manifest_hash: manifest.mfg_hash.to_ascii_lowercase(),
        stored_hash: to_hex(&meta.hash),
        computed_hash: to_hex(&computed),
    })
}
