use std::path::{Path, PathBuf};

/// Logical layout of one manufacturing image's output tree.
///
/// This is derived from an output base directory and the image name. It does
/// *not* perform any IO itself; the artifact writer creates directories as it
/// needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfgLayout {
    /// Manufacturing image name; also the prefix of section file names.
    pub name: String,
    /// Root directory for this image (`<base>/<name>`).
    pub root: PathBuf,
    /// Staged copies of the bootloader outputs.
    pub boot_dir: PathBuf,
    /// Section binaries (`<name>-s<N>.bin`).
    pub sections_dir: PathBuf,
    /// Build manifest (`manifest.json`).
    pub manifest_path: PathBuf,
}

impl MfgLayout {
    /// Compute the layout for image `name` under `base_dir`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(base_dir: impl AsRef<Path>, name: impl Into<String>) -> Self {
        let name = name.into();
        let root = base_dir.as_ref().join(&name);
        let boot_dir = root.join("bootloader");
        let sections_dir = root.join("sections");
        let manifest_path = root.join("manifest.json");

        Self { name, root, boot_dir, sections_dir, manifest_path }
    }

    /// Staging directory for the outputs of image target `index`.
    pub fn image_dir(&self, index: usize) -> PathBuf {
        self.root.join(format!("image{index}"))
    }

    /// Output path of section `index`.
    pub fn section_path(&self, index: usize) -> PathBuf {
        self.sections_dir.join(format!("{}-s{}.bin", self.name, index))
    }

    /// Where `src` lands when staged into `dir`: same file name, new parent.
    pub fn staged_path(dir: &Path, src: &Path) -> PathBuf {
        match src.file_name() {
            Some(file_name) => dir.join(file_name),
            None => dir.join(src),
        }
    }
}
