mod common;

use std::fs;

use common::{write_project, MFG_NAME};
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

/// `create` writes the staged inputs, section 0 and the manifest.
#[test]
fn create_writes_sections_and_manifest() {
    let dir = tempdir().expect("tempdir");
    let config = write_project(dir.path());
    let out = dir.path().join("bin");

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("create")
        .arg("--config")
        .arg(&config)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created manufacturing image"))
        .stdout(predicate::str::contains(format!("{MFG_NAME}-s0.bin")));

    let root = out.join(MFG_NAME);
    assert!(root.join("bootloader/boot.elf.bin").is_file());
    assert!(root.join("image0/blinky.img").is_file());

    let section = fs::read(root.join("sections").join(format!("{MFG_NAME}-s0.bin")))
        .expect("read section");
    assert_eq!(section.len(), 0x3000 + 7);
    assert_eq!(&section[0x3000..], b"SN-0001");

    // Meta record ends the 4 KiB bootloader area; its hash field starts at 4056.
    let mut zeroed = section.clone();
    zeroed[4056..4088].fill(0);
    let expected: String =
        Sha256::digest(&zeroed).iter().map(|b| format!("{:02x}", b)).collect();

    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(root.join("manifest.json")).expect("read manifest"),
    )
    .expect("parse manifest");
    assert_eq!(manifest["mfg_hash"], expected);
    assert!(manifest["build_time"].is_string());
}

/// `create --json` reports input and output paths as JSON.
#[test]
fn create_json_lists_paths() {
    let dir = tempdir().expect("tempdir");
    let config = write_project(dir.path());

    let output = assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("create")
        .arg("--config")
        .arg(&config)
        .arg("--out-dir")
        .arg(dir.path().join("bin"))
        .arg("--json")
        .output()
        .expect("run create");
    assert!(output.status.success());

    let artifacts: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("parse create output");
    assert_eq!(artifacts["from_paths"].as_array().expect("from_paths").len(), 5);
    assert_eq!(artifacts["to_paths"].as_array().expect("to_paths").len(), 6);
}

/// The default output directory is `bin/mfgs` under the working directory.
#[test]
fn create_defaults_to_bin_mfgs() {
    let dir = tempdir().expect("tempdir");
    write_project(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .current_dir(dir.path())
        .args(["create", "--config", "mfg.yml"])
        .assert()
        .success();

    assert!(dir.path().join("bin/mfgs").join(MFG_NAME).join("manifest.json").is_file());
}

/// `verify` accepts a freshly created image.
#[test]
fn verify_accepts_created_image() {
    let dir = tempdir().expect("tempdir");
    let config = write_project(dir.path());
    let out = dir.path().join("bin");

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("create")
        .arg("--config")
        .arg(&config)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success();

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("verify")
        .arg("--config")
        .arg(&config)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

/// `verify` fails once a section byte changes after creation.
#[test]
fn verify_rejects_modified_section() {
    let dir = tempdir().expect("tempdir");
    let config = write_project(dir.path());
    let out = dir.path().join("bin");

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("create")
        .arg("--config")
        .arg(&config)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success();

    let section_path = out.join(MFG_NAME).join("sections").join(format!("{MFG_NAME}-s0.bin"));
    let mut section = fs::read(&section_path).expect("read section");
    section[0x1000] ^= 0x01;
    fs::write(&section_path, section).expect("write section");

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("verify")
        .arg("--config")
        .arg(&config)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manufacturing hash mismatch"));
}

/// `inputs` lists source files without building anything.
#[test]
fn inputs_lists_sources_without_building() {
    let dir = tempdir().expect("tempdir");
    let config = write_project(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .current_dir(dir.path())
        .arg("inputs")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Inputs (5):"))
        .stdout(predicate::str::contains("boot.elf.bin"))
        .stdout(predicate::str::contains("serial.bin"));

    assert!(!dir.path().join("bin").exists());
}

/// `inputs` still lists a raw entry whose file does not exist yet.
#[test]
fn inputs_lists_missing_raw_entry() {
    let dir = tempdir().expect("tempdir");
    let config = write_project(dir.path());
    fs::remove_file(dir.path().join("serial.bin")).expect("remove raw blob");

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("inputs")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Inputs (5):"))
        .stdout(predicate::str::contains("serial.bin"));
}

/// `flash-map` prints areas in offset order with assigned ids.
#[test]
fn flash_map_lists_areas() {
    let dir = tempdir().expect("tempdir");
    let config = write_project(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("flash-map")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Flash areas (2):"))
        .stdout(predicate::str::contains("FLASH_AREA_BOOTLOADER [id: 0, device: 0]"))
        .stdout(predicate::str::contains("FLASH_AREA_IMAGE_0 [id: 1, device: 0]"));
}

#[test]
fn flash_map_json_is_parseable() {
    let dir = tempdir().expect("tempdir");
    let config = write_project(dir.path());

    let output = assert_cmd::cargo::cargo_bin_cmd!("mfg-image")
        .arg("flash-map")
        .arg("--config")
        .arg(&config)
        .arg("--json")
        .output()
        .expect("run flash-map");
    assert!(output.status.success());

    let areas: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse areas");
    assert_eq!(areas[1]["name"], "FLASH_AREA_IMAGE_0");
    assert_eq!(areas[1]["offset"], 4096);
}
