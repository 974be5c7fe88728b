use std::fs;
use std::path::Path;

use log::LevelFilter;
use mfg_image::commands::display_relative;
use mfg_image::{canonicalize_or_current, verbosity_level};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_returns_cwd_for_dot() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current(".").expect("canonicalize").canonicalize().expect("canon");
    let expected = tmp.path().canonicalize().expect("canon tmp");
    assert_eq!(result, expected);

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn canonicalize_or_current_resolves_existing_path() {
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");

    let result = canonicalize_or_current(subdir.to_str().expect("utf-8 path"))
        .expect("canonicalize nested");
    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));
}

#[test]
fn canonicalize_or_current_keeps_missing_absolute_path() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("not-yet/created");

    let result = canonicalize_or_current(missing.to_str().expect("utf-8 path")).expect("resolve");
    assert_eq!(result, missing);
}

#[test]
fn verbosity_count_maps_to_levels() {
    assert_eq!(verbosity_level(0), LevelFilter::Warn);
    assert_eq!(verbosity_level(1), LevelFilter::Info);
    assert_eq!(verbosity_level(2), LevelFilter::Debug);
    assert_eq!(verbosity_level(3), LevelFilter::Trace);
    assert_eq!(verbosity_level(9), LevelFilter::Trace);
}

#[test]
fn display_relative_strips_base() {
    let base = Path::new("/out/board");
    assert_eq!(display_relative(Path::new("/out/board/sections/a-s0.bin"), base), "sections/a-s0.bin");
    assert_eq!(display_relative(Path::new("/elsewhere/x"), base), "/elsewhere/x");
}
