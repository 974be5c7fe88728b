#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const MFG_NAME: &str = "board-mfg";

/// Write a small project with a bootloader, one app and a raw blob, and
/// return the path of its config file.
pub fn write_project(root: &Path) -> PathBuf {
    let out = root.join("targets");
    fs::create_dir_all(&out).expect("create targets dir");
    fs::write(out.join("boot.elf"), b"\x7fELF boot").expect("write boot elf");
    fs::write(out.join("boot.elf.bin"), [0xb0u8; 256]).expect("write boot bin");
    fs::write(out.join("blinky.elf"), b"\x7fELF app").expect("write app elf");
    fs::write(out.join("blinky.img"), [0xa0u8; 512]).expect("write app img");
    fs::write(root.join("serial.bin"), b"SN-0001").expect("write raw blob");

    let config = format!(
        r#"name: {MFG_NAME}
bootloader:
  name: boot
  elf: targets/boot.elf
  binary: targets/boot.elf.bin
images:
  - name: blinky
    elf: targets/blinky.elf
    binary: targets/blinky.img
raw:
  - filename: serial.bin
    offset: 0x3000
flash_map:
  areas:
    FLASH_AREA_BOOTLOADER: {{ offset: 0x0, size: 4kB }}
    FLASH_AREA_IMAGE_0: {{ offset: 0x1000, size: 8kB }}
"#
    );
    let path = root.join("mfg.yml");
    fs::write(&path, config).expect("write config");
    path
}
