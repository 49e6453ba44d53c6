//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Build a command for the onyx-parts binary against an isolated data dir.
fn onyx_parts(data_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("onyx-parts");
    cmd.arg("--data-dir").arg(data_dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Path to library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("onyx-parts")
        .join("tests")
        .join("fixtures")
}

fn add(data_dir: &Path, id: &str, category: &str, value: &str) {
    onyx_parts(data_dir)
        .args(["add", id, "--category", category, "--value", value])
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    let mut cmd = cargo_bin_cmd!("onyx-parts");

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("inventory"));
}

#[test]
fn test_cli_version() {
    let mut cmd = cargo_bin_cmd!("onyx-parts");

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_add_and_search() {
    let temp = TempDir::new().unwrap();
    add(temp.path(), "ONX-RES-002", "Resistor", "4.7k");
    add(temp.path(), "ONX-CAP-001", "Capacitor", "100n");

    onyx_parts(temp.path())
        .arg("search")
        .assert()
        .success()
        .stdout(predicate::str::contains("ONX-CAP-001"))
        .stdout(predicate::str::contains("100 nF"))
        .stdout(predicate::str::contains("4.7 kΩ"));

    onyx_parts(temp.path())
        .args(["search", "--category", "Resistor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ONX-RES-002"))
        .stdout(predicate::str::contains("ONX-CAP-001").not());
}

#[test]
fn test_cli_search_json_is_ordered() {
    let temp = TempDir::new().unwrap();
    add(temp.path(), "ONX-RES-002", "Resistor", "4.7k");
    add(temp.path(), "ONX-CAP-001", "Capacitor", "100n");

    let output = onyx_parts(temp.path())
        .args(["--format", "json", "search", "--category", "All"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["identifier"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ONX-CAP-001", "ONX-RES-002"]);
}

#[test]
fn test_cli_duplicate_fails() {
    let temp = TempDir::new().unwrap();
    add(temp.path(), "ONX-CAP-001", "Capacitor", "100n");

    onyx_parts(temp.path())
        .args(["add", "ONX-CAP-001", "--category", "Capacitor", "--value", "10u"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: component 'ONX-CAP-001' already exists",
        ));
}

#[test]
fn test_cli_rejects_bad_input() {
    let temp = TempDir::new().unwrap();

    onyx_parts(temp.path())
        .args(["add", "; DELETE FROM components--", "--category", "Resistor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));

    onyx_parts(temp.path())
        .args(["add", "ONX-RES-001", "--category", "Resistor", "--stock", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an integer"));
}

#[test]
fn test_cli_stock_and_low_stock() {
    let temp = TempDir::new().unwrap();
    onyx_parts(temp.path())
        .args([
            "add",
            "ONX-LED-001",
            "--category",
            "LED",
            "--stock",
            "10",
            "--min-stock",
            "5",
        ])
        .assert()
        .success();

    onyx_parts(temp.path())
        .args(["stock", "ONX-LED-001", "-7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 in stock"));

    onyx_parts(temp.path())
        .arg("low-stock")
        .assert()
        .success()
        .stdout(predicate::str::contains("ONX-LED-001"));

    onyx_parts(temp.path())
        .args(["stock", "ONX-LED-001", "-100"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_cli_import() {
    let temp = TempDir::new().unwrap();

    onyx_parts(temp.path())
        .arg("import")
        .arg(fixtures_dir().join("broken_rows.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 components"))
        .stdout(predicate::str::contains("line 3"));

    onyx_parts(temp.path())
        .args(["show", "ONX-LED-003"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LED"));
}

#[test]
fn test_cli_attach() {
    let temp = TempDir::new().unwrap();
    add(temp.path(), "ONX-IC-001", "IC", "LM358");
    let pdf = temp.path().join("lm358.pdf");
    fs::write(&pdf, b"%PDF-1.4").unwrap();

    onyx_parts(temp.path())
        .arg("attach")
        .arg("ONX-IC-001")
        .arg(&pdf)
        .assert()
        .success();
    assert!(temp
        .path()
        .join("datasheets")
        .join("ONX-IC-001")
        .join("lm358.pdf")
        .is_file());

    onyx_parts(temp.path())
        .args(["attach", "ONX-IC-404"])
        .arg(&pdf)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_cli_show_missing() {
    let temp = TempDir::new().unwrap();
    onyx_parts(temp.path())
        .args(["show", "ONX-NOPE-001"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error: "));
}

#[test]
fn test_cli_quotes_without_refresh() {
    let temp = TempDir::new().unwrap();
    add(temp.path(), "ONX-RES-001", "Resistor", "10k");

    onyx_parts(temp.path())
        .args(["quotes", "ONX-RES-001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No quotes stored"));
}

#[test]
fn test_cli_normalize() {
    let temp = TempDir::new().unwrap();

    onyx_parts(temp.path())
        .args(["normalize", "4.7µ", "--category", "Capacitor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4.7 µF"));

    onyx_parts(temp.path())
        .args(["normalize", "abc", "--category", "Resistor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unparsed"));

    // Normalizing never creates the catalog.
    assert!(!temp.path().join("parts.db").exists());
}

#[test]
fn test_cli_categories() {
    let temp = TempDir::new().unwrap();
    onyx_parts(temp.path())
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("Capacitor"))
        .stdout(predicate::str::contains("Crystal/Oscillator"));
}

#[test]
fn test_cli_manual_quote() {
    let temp = TempDir::new().unwrap();
    add(temp.path(), "ONX-RES-001", "Resistor", "10k");

    onyx_parts(temp.path())
        .args(["quote", "ONX-RES-001", "lcsc", "--price", "0.0021", "--spn", "C25804"])
        .assert()
        .success()
        .stdout(predicate::str::contains("C25804"));

    onyx_parts(temp.path())
        .args(["quote", "ONX-RES-001", "lcsc", "--price", "cheap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("price is not a number"));

    onyx_parts(temp.path())
        .args(["--format", "json", "quotes", "ONX-RES-001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"supplier\": \"lcsc\""));
}
