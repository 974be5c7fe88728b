use mfg_core::flash::{
    load_flash_map, parse_flash_map, FlashArea, FlashMap, FlashMapSpec,
    FLASH_AREA_NAME_BOOTLOADER, FLASH_AREA_NAME_IMAGE_0, FLASH_AREA_NAME_IMAGE_1,
};
use mfg_core::MfgError;
use tempfile::tempdir;

const BSP_YAML: &str = r#"
areas:
  FLASH_AREA_BOOTLOADER:
    offset: 0x00000000
    size: 16kB
  FLASH_AREA_IMAGE_0:
    offset: 0x4000
    size: 232kB
  FLASH_AREA_IMAGE_1:
    offset: "0x3e000"
    size: 232kB
  FLASH_AREA_NFFS:
    offset: 0x78000
    size: 32kB
  FLASH_AREA_REBOOT_LOG:
    offset: 0x80000
    size: 8192
"#;

#[test]
fn parses_yaml_with_hex_offsets_and_kb_sizes() {
    let spec = parse_flash_map(BSP_YAML, "yml").expect("parse yaml");
    let map = FlashMap::from_spec(&spec).expect("valid map");

    let boot = map.require(FLASH_AREA_NAME_BOOTLOADER).expect("boot area");
    assert_eq!(boot.offset, 0);
    assert_eq!(boot.size, 16 * 1024);

    let img1 = map.require(FLASH_AREA_NAME_IMAGE_1).expect("image 1 area");
    assert_eq!(img1.offset, 0x3e000);
    assert_eq!(img1.end(), 0x3e000 + 232 * 1024);
}

#[test]
fn assigns_system_ids_then_user_ids_by_offset() {
    let spec = parse_flash_map(BSP_YAML, "yaml").expect("parse yaml");
    let map = FlashMap::from_spec(&spec).expect("valid map");

    assert_eq!(map.require(FLASH_AREA_NAME_BOOTLOADER).unwrap().id, 0);
    assert_eq!(map.require(FLASH_AREA_NAME_IMAGE_0).unwrap().id, 1);
    assert_eq!(map.require(FLASH_AREA_NAME_IMAGE_1).unwrap().id, 2);
    // Scratch is absent, so user areas start at 4, lowest offset first.
    assert_eq!(map.require("FLASH_AREA_NFFS").unwrap().id, 4);
    assert_eq!(map.require("FLASH_AREA_REBOOT_LOG").unwrap().id, 5);

    let ids: Vec<u8> = map.areas_by_id().iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 4, 5]);
}

#[test]
fn explicit_ids_are_kept() {
    let json = r#"{"areas":{
        "FLASH_AREA_BOOTLOADER":{"id":7,"offset":0,"size":4096},
        "FLASH_AREA_IMAGE_0":{"offset":4096,"size":4096}
    }}"#;
    let spec = parse_flash_map(json, "json").expect("parse json");
    let map = FlashMap::from_spec(&spec).expect("valid map");
    assert_eq!(map.require(FLASH_AREA_NAME_BOOTLOADER).unwrap().id, 7);
    assert_eq!(map.require(FLASH_AREA_NAME_IMAGE_0).unwrap().id, 1);
}

#[test]
fn rejects_overlapping_areas_on_same_device() {
    let err = FlashMap::new(vec![
        FlashArea::new("A", 0, 0, 0x1000),
        FlashArea::new("B", 1, 0x0800, 0x1000),
    ])
    .unwrap_err();
    assert!(matches!(err, MfgError::InvalidFlashMap(_)), "unexpected error: {err}");
    assert!(err.to_string().contains("overlap"), "unexpected error: {err}");
}

#[test]
fn allows_same_range_on_different_devices() {
    let mut external = FlashArea::new("EXT", 1, 0, 0x1000);
    external.device = 1;
    let map = FlashMap::new(vec![FlashArea::new("A", 0, 0, 0x1000), external]).expect("valid map");
    assert_eq!(map.len(), 2);
}

#[test]
fn rejects_zero_size_and_duplicate_ids() {
    let err = FlashMap::new(vec![FlashArea::new("A", 0, 0, 0)]).unwrap_err();
    assert!(err.to_string().contains("zero size"), "unexpected error: {err}");

    let err = FlashMap::new(vec![FlashArea::new("A", 3, 0, 16), FlashArea::new("B", 3, 16, 16)])
        .unwrap_err();
    assert!(err.to_string().contains("share id 3"), "unexpected error: {err}");
}

#[test]
fn require_reports_missing_area() {
    let map = FlashMap::new(vec![FlashArea::new(FLASH_AREA_NAME_BOOTLOADER, 0, 0, 16)]).unwrap();
    assert!(map.get(FLASH_AREA_NAME_IMAGE_0).is_none());
    match map.require(FLASH_AREA_NAME_IMAGE_0) {
        Err(MfgError::MissingFlashArea { area }) => assert_eq!(area, FLASH_AREA_NAME_IMAGE_0),
        other => panic!("expected MissingFlashArea, got {other:?}"),
    }
}

#[test]
fn load_flash_map_reads_file_and_reports_bad_format() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bsp.yml");
    std::fs::write(&path, BSP_YAML).expect("write bsp");
    let map = load_flash_map(&path).expect("load flash map");
    assert_eq!(map.len(), 5);

    let bad = dir.path().join("bsp.toml");
    std::fs::write(&bad, "areas = {}").expect("write toml");
    let err = load_flash_map(&bad).unwrap_err();
    assert!(format!("{err:#}").contains("Unsupported flash map format"), "unexpected error: {err:#}");

    let missing = dir.path().join("missing.yml");
    let err = load_flash_map(&missing).unwrap_err();
    assert!(err.to_string().contains("Failed to read flash map"), "unexpected error: {err}");
}

#[test]
fn empty_spec_gives_empty_map() {
    let map = FlashMap::from_spec(&FlashMapSpec::default()).expect("empty map");
    assert!(map.is_empty());
}
