use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const THEME: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <declare-styleable name="Theme_Attrs">
        <attr name="android:textColor" format="color|reference"/>
        <attr name="other" format="string"/>
    </declare-styleable>
</resources>
"#;

fn values_path(root: &Path) -> PathBuf {
    root.join("res/values/values.xml")
}

fn write_archive(exploded: &Path, relative: &str) -> PathBuf {
    let path = values_path(&exploded.join(relative));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, THEME).unwrap();
    path
}

/// build/intermediates/exploded-aar with two archives for the debug variant
fn setup_build_dir() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let exploded = dir.path().join("build/intermediates/exploded-aar");

    let foo = write_archive(&exploded, "com.example/libfoo/debug");
    let bar = write_archive(&exploded, "com.example/libbar/debug");
    write_archive(&exploded, "com.example/libfoo/release");

    (dir, foo, bar)
}

#[test]
fn test_rewrites_debug_archives() {
    let (dir, foo, bar) = setup_build_dir();

    let mut cmd = Command::cargo_bin("fataar-attrs").unwrap();
    let assert = cmd
        .arg("--build-dir")
        .arg(dir.path().join("build"))
        .arg("--variant")
        .arg("debug")
        .arg("-e")
        .arg("Theme_Attrs=android:textColor")
        .assert();

    assert
        .success()
        .stdout(predicate::str::contains("reBundleAarDebug"))
        .stdout(predicate::str::contains("2 processed, 2 modified, 2 formats removed"));

    for path in [&foo, &bar] {
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("<attr name=\"android:textColor\"/>"));
        assert!(content.contains("<attr name=\"other\" format=\"string\"/>"));
    }

    // Other variants are untouched
    let release = dir
        .path()
        .join("build/intermediates/exploded-aar/com.example/libfoo/release/res/values/values.xml");
    assert_eq!(fs::read_to_string(release).unwrap(), THEME);
}

#[test]
fn test_policy_file_with_owner_filter() {
    let (dir, foo, bar) = setup_build_dir();
    let policy = dir.path().join("policy.toml");
    fs::write(
        &policy,
        "excludeDeclareStyleAttrsFormatPath = [\"com.example:libfoo\"]\n\n[excludeDeclareStyleAttrsFormat]\nTheme_Attrs = \"android:textColor\"\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("fataar-attrs").unwrap();
    cmd.arg("--build-dir")
        .arg(dir.path().join("build"))
        .arg("--variant")
        .arg("debug")
        .arg("--policy")
        .arg(&policy)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 filtered out"));

    assert_ne!(fs::read_to_string(foo).unwrap(), THEME);
    assert_eq!(fs::read_to_string(bar).unwrap(), THEME);
}

#[test]
fn test_dry_run_writes_nothing() {
    let (dir, foo, _) = setup_build_dir();

    let mut cmd = Command::cargo_bin("fataar-attrs").unwrap();
    cmd.arg("--exploded-dir")
        .arg(dir.path().join("build/intermediates/exploded-aar"))
        .arg("--variant")
        .arg("debug")
        .arg("-e")
        .arg("Theme_Attrs=android:textColor")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Would rewrite"))
        .stdout(predicate::str::contains("Dry run mode"));

    assert_eq!(fs::read_to_string(foo).unwrap(), THEME);
}

#[test]
fn test_malformed_archive_does_not_fail_run() {
    let (dir, foo, bar) = setup_build_dir();
    fs::write(&bar, "<resources><declare-styleable name=\"Theme_Attrs\"></resources>").unwrap();

    let mut cmd = Command::cargo_bin("fataar-attrs").unwrap();
    cmd.arg("--build-dir")
        .arg(dir.path().join("build"))
        .arg("--variant")
        .arg("debug")
        .arg("-e")
        .arg("Theme_Attrs=android:textColor")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"));

    assert!(fs::read_to_string(foo)
        .unwrap()
        .contains("<attr name=\"android:textColor\"/>"));
}

#[test]
fn test_missing_exploded_dir_is_not_an_error() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("fataar-attrs").unwrap();
    cmd.arg("--build-dir")
        .arg(dir.path().join("build"))
        .arg("--variant")
        .arg("release")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 candidate roots"));

    assert!(!dir.path().join("build").exists());
}

#[test]
fn test_variant_is_required() {
    let mut cmd = Command::cargo_bin("fataar-attrs").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_invalid_exclusion_rejected() {
    let mut cmd = Command::cargo_bin("fataar-attrs").unwrap();
    cmd.arg("--variant")
        .arg("debug")
        .arg("-e")
        .arg("Theme_Attrs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("STYLEABLE=ATTR"));
}

#[test]
fn test_unreadable_policy_file_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("fataar-attrs").unwrap();
    cmd.arg("--variant")
        .arg("debug")
        .arg("--policy")
        .arg(dir.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load policy"));
}
