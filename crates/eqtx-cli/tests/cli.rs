//! Integration tests for the eqtx binary. None of them reach the network or
//! the system clipboard.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const UNSET_KEY_VAR: &str = "EQTX_TEST_KEY_THAT_IS_NEVER_SET";

fn eqtx() -> Command {
    let mut cmd = Command::cargo_bin("eqtx").unwrap();
    cmd.env_remove("GEMINI_API_KEY");
    cmd
}

fn write_config(dir: &Path) -> String {
    let path = dir.join("config.json");
    fs::write(
        &path,
        format!(r#"{{"service": {{"api_key_env": "{}"}}}}"#, UNSET_KEY_VAR),
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_help_lists_commands() {
    eqtx()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("recognize"))
        .stdout(predicate::str::contains("explain"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("copy"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("serve-clipboard").not());
}

#[test]
fn test_clipboard_helper_rejects_mismatched_pixels() {
    eqtx()
        .args(["serve-clipboard", "--width", "2", "--height", "2"])
        .write_stdin(vec![0u8; 3])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match a 2x2 image"));
}

#[test]
fn test_config_path_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.json");

    eqtx()
        .args(["--config", path.to_str().unwrap(), "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file:"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let path = path.to_str().unwrap();

    eqtx()
        .args(["--config", path, "config", "init"])
        .assert()
        .success();

    eqtx()
        .args(["--config", path, "config", "get", "service.recognition_model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini-2.0-flash"));

    eqtx()
        .args(["--config", path, "config", "set", "export.supersample", "3"])
        .assert()
        .success();

    eqtx()
        .args(["--config", path, "config", "get", "export.supersample"])
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));

    eqtx()
        .args(["--config", path, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_get_unknown_key() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    eqtx()
        .args(["--config", &config, "config", "get", "service.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_recognize_without_key_fails_fast() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let image = dir.path().join("equation.png");
    fs::write(&image, b"\x89PNG\r\n\x1a\n\0\0\0\0").unwrap();

    eqtx()
        .args(["--config", &config, "recognize", image.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Gemini API key is missing"));
}

#[test]
fn test_recognize_requires_input() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    eqtx()
        .args(["--config", &config, "recognize"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No input given"));
}

#[test]
fn test_recognize_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    eqtx()
        .args(["--config", &config, "recognize", "does-not-exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_explain_without_key_fails_fast() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    eqtx()
        .args(["--config", &config, "explain", "--markup", "E=mc^2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Gemini API key is missing"));
}

#[test]
fn test_export_download_writes_svg() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let out = dir.path().join("out");

    eqtx()
        .args([
            "--config",
            &config,
            "export",
            "--markup",
            r"\frac{a}{b}=c",
            "--output-dir",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("formula.svg"));

    let svg = fs::read_to_string(out.join("formula.svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("<foreignObject"));
    assert!(svg.contains("katex"));
}
