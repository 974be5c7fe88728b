//! Writing the staged inputs, section binaries and the build manifest.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::debug;
use serde::Serialize;

use crate::error::{MfgError, MfgResult};
use crate::layout::MfgLayout;
use crate::model::{to_hex, BuildManifest, Section};

/// Every path a build read from and wrote to, for the caller to report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MfgArtifacts {
    pub from_paths: Vec<PathBuf>,
    pub to_paths: Vec<PathBuf>,
}

fn create_dir(dir: &Path) -> MfgResult<()> {
    fs::create_dir_all(dir).map_err(MfgError::io("create directory", dir))
}

/// Copy `src` into `dst_dir`, keeping its file name. Returns the new path.
pub fn copy_bin_file(src: &Path, dst_dir: &Path) -> MfgResult<PathBuf> {
    create_dir(dst_dir)?;
    let dst = MfgLayout::staged_path(dst_dir, src);
    debug!("copying file {} --> {}", src.display(), dst.display());
    fs::copy(src, &dst).map_err(MfgError::io("copy", src))?;
    Ok(dst)
}

/// Write each section to its own file, named by index.
pub fn write_sections(layout: &MfgLayout, sections: &[Section]) -> MfgResult<Vec<PathBuf>> {
    create_dir(&layout.sections_dir)?;

    let mut paths = Vec::with_capacity(sections.len());
    for (i, section) in sections.iter().enumerate() {
        let path = layout.section_path(i);
        fs::write(&path, section).map_err(MfgError::io("write section", &path))?;
        debug!("wrote section {} ({} bytes) to {}", i, section.len(), path.display());
        paths.push(path);
    }
    Ok(paths)
}

/// Manifest record for a freshly computed hash, stamped with the current time.
pub fn create_manifest(hash: &[u8]) -> BuildManifest {
    BuildManifest {
        build_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        mfg_hash: to_hex(hash),
    }
}

pub fn write_manifest(layout: &MfgLayout, manifest: &BuildManifest) -> MfgResult<PathBuf> {
    create_dir(&layout.root)?;
    let body = serde_json::to_string_pretty(manifest)?;
    fs::write(&layout.manifest_path, body)
        .map_err(MfgError::io("write mfg manifest", &layout.manifest_path))?;
    Ok(layout.manifest_path.clone())
}

pub fn read_manifest(layout: &MfgLayout) -> MfgResult<BuildManifest> {
    let body = fs::read_to_string(&layout.manifest_path)
        .map_err(MfgError::io("read mfg manifest", &layout.manifest_path))?;
    Ok(serde_json::from_str(&body)?)
}
