#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use mfg_core::flash::{
    FlashArea, FlashMap, FLASH_AREA_NAME_BOOTLOADER, FLASH_AREA_NAME_IMAGE_0,
    FLASH_AREA_NAME_IMAGE_1, FLASH_AREA_NAME_IMAGE_SCRATCH,
};
use mfg_core::model::{BuildTarget, LoaderTarget, RawEntry};

/// Bootloader at 0 (4 KiB) and image slot 0 at 4096 (8 KiB).
pub fn small_flash_map() -> FlashMap {
    FlashMap::new(vec![
        FlashArea::new(FLASH_AREA_NAME_BOOTLOADER, 0, 0, 4096),
        FlashArea::new(FLASH_AREA_NAME_IMAGE_0, 1, 4096, 8192),
    ])
    .expect("small flash map")
}

/// Bootloader, both image slots and scratch, back to back.
pub fn full_flash_map() -> FlashMap {
    FlashMap::new(vec![
        FlashArea::new(FLASH_AREA_NAME_BOOTLOADER, 0, 0, 4096),
        FlashArea::new(FLASH_AREA_NAME_IMAGE_0, 1, 4096, 8192),
        FlashArea::new(FLASH_AREA_NAME_IMAGE_1, 2, 12288, 8192),
        FlashArea::new(FLASH_AREA_NAME_IMAGE_SCRATCH, 3, 20480, 4096),
    ])
    .expect("full flash map")
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).expect("create fixture dir");
    let path = dir.join(name);
    fs::write(&path, data).expect("write fixture file");
    path
}

/// Bootloader target whose flashable binary is `data`.
pub fn boot_target(dir: &Path, data: &[u8]) -> BuildTarget {
    let dir = dir.join("boot-src");
    let elf = write_file(&dir, "boot.elf", b"\x7fELF boot");
    let bin = write_file(&dir, "boot.elf.bin", data);
    let manifest = write_file(&dir, "manifest.json", br#"{"name":"boot"}"#);
    BuildTarget::new("boot", elf, bin).with_manifest(manifest)
}

/// Application target named `name` whose `.img` is `data`.
pub fn app_target(dir: &Path, name: &str, data: &[u8]) -> BuildTarget {
    let dir = dir.join(format!("{name}-src"));
    let elf = write_file(&dir, &format!("{name}.elf"), b"\x7fELF app");
    let img = write_file(&dir, &format!("{name}.img"), data);
    let manifest = write_file(&dir, "manifest.json", br#"{"name":"app"}"#);
    BuildTarget::new(name, elf, img).with_manifest(manifest)
}

/// Loader component named `name` whose `.img` is `data`.
pub fn loader_target(dir: &Path, name: &str, data: &[u8]) -> LoaderTarget {
    let dir = dir.join(format!("{name}-src"));
    let elf = write_file(&dir, &format!("{name}.elf"), b"\x7fELF loader");
    let img = write_file(&dir, &format!("{name}.img"), data);
    LoaderTarget { name: name.to_string(), elf, binary: img }
}

pub fn raw_entry(dir: &Path, name: &str, offset: usize, data: &[u8]) -> RawEntry {
    let filename = write_file(&dir.join("raw-src"), name, data);
    RawEntry { filename, offset, data: data.to_vec() }
}
