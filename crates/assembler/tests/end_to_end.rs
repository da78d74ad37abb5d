/*
 * end_to_end.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end tests for the assembler binary.
 */

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Fixture root shared with assembler-core
fn fixture_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("../assembler-core/test-fixtures")
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_assembler"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run assembler")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_merge_with_both_engines() {
    let root = fixture_root();
    let root = root.to_str().unwrap();
    for engine in ["normal", "preprocess"] {
        let output = run(&[
            "merge", "--root", root, "--site", "Demo", "--file", "Demo", "--engine", engine,
        ]);
        assert!(output.status.success(), "engine {engine} failed");
        assert_eq!(stdout(&output), "<p><b>Hi</b></p>\n");
    }
}

#[test]
fn test_merge_with_view() {
    let root = fixture_root();
    let output = run(&[
        "merge",
        "--root",
        root.to_str().unwrap(),
        "--site",
        "Portal",
        "--file",
        "Html3A",
        "--view",
        "Html3B",
        "--prefix",
        "Html3A",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("B view <section>extra</section>"));
}

#[test]
fn test_merge_unknown_file_fails() {
    let root = fixture_root();
    let output = run(&[
        "merge", "--root", root.to_str().unwrap(), "--site", "Demo", "--file", "Nope",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_verify_fixture_sites() {
    let root = fixture_root();
    let output = run(&["verify", "--root", root.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert_eq!(text.lines().filter(|l| l.starts_with("ok")).count(), 5);
    assert!(!text.contains("FAIL"));
}

#[test]
fn test_verify_reports_unresolved_tags() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("AppSites/Broken");
    std::fs::create_dir_all(&site).unwrap();
    std::fs::write(site.join("Index.html"), "<p>{{Missing}}</p>").unwrap();

    let output = run(&["verify", "--root", dir.path().to_str().unwrap()]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("FAIL Broken/Index"));
    assert!(text.contains("unresolved: {{Missing}}"));
}

#[test]
fn test_dump_summary() {
    let root = fixture_root();
    let output = run(&[
        "dump", "--root", root.to_str().unwrap(), "--site", "Shop", "--summary",
    ]);
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["siteName"], "Shop");
    assert_eq!(summary["totalTemplates"], 7);
}

#[test]
fn test_sites_listing() {
    let root = fixture_root();
    let output = run(&["sites", "--root", root.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Portal\n  files: Html3A\n  views: Html3A, Html3B"));
}
