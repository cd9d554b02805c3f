//! CLI smoke tests for hubsync.
//!
//! Every test runs the binary against its own temp directory for settings,
//! packages, the catalog index and the mirror.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Isolated home for a single invocation.
struct Sandbox {
  temp: TempDir,
}

impl Sandbox {
  fn new() -> Self {
    let temp = TempDir::new().unwrap();
    for dir in ["config", "data", "packages", "mirror"] {
      fs::create_dir_all(temp.path().join(dir)).unwrap();
    }
    Self { temp }
  }

  fn path(&self, rel: &str) -> PathBuf {
    self.temp.path().join(rel)
  }

  fn packages(&self) -> PathBuf {
    self.path("packages")
  }

  fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("hubsync");
    cmd
      .env("HOME", self.temp.path())
      .env("XDG_CONFIG_HOME", self.path("config"))
      .env("XDG_DATA_HOME", self.path("data"))
      .env_remove("HUBSYNC_PACKAGES_DIR")
      .env_remove("RUST_LOG");
    cmd
  }

  fn manifest(&self, json: &str) -> PathBuf {
    let path = self.path("meta.json");
    fs::write(&path, json).unwrap();
    path
  }

  fn install(&self, id: &str) {
    fs::write(self.packages().join(format!("{}.var", id)), b"installed").unwrap();
  }

  fn mirror(&self, file: &str, content: &[u8]) {
    fs::write(self.path("mirror").join(file), content).unwrap();
  }

  fn catalog(&self, json: &str) -> PathBuf {
    let path = self.path("catalog.json");
    fs::write(&path, json).unwrap();
    path
  }

  fn fetch(&self, manifest: &Path, catalog: &Path) -> Command {
    let mut cmd = self.cmd();
    cmd
      .arg("fetch")
      .arg(manifest)
      .arg("--packages")
      .arg(self.packages())
      .arg("--catalog")
      .arg(catalog)
      .arg("--mirror")
      .arg(self.path("mirror"));
    cmd
  }
}

const TWO_DEPS: &str = r#"{
  "dependencies": {
    "acme.hair.3": {},
    "bob.scene.1": {}
  }
}"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  Sandbox::new()
    .cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  Sandbox::new()
    .cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("hubsync"));
}

#[test]
fn subcommand_help_works() {
  let sandbox = Sandbox::new();
  for cmd in &["scan", "fetch", "config"] {
    sandbox
      .cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// Scan
// =============================================================================

#[test]
fn scan_lists_missing_dependencies() {
  let sandbox = Sandbox::new();
  sandbox.install("acme.hair.3");
  let manifest = sandbox.manifest(TWO_DEPS);

  sandbox
    .cmd()
    .arg("scan")
    .arg(&manifest)
    .arg("--packages")
    .arg(sandbox.packages())
    .assert()
    .success()
    .stdout(predicate::str::contains("Missing (1)"))
    .stdout(predicate::str::contains("bob.scene.1"))
    .stdout(predicate::str::contains("Installed (1)"));
}

#[test]
fn scan_json_reports_buckets() {
  let sandbox = Sandbox::new();
  sandbox.install("acme.hair.3");
  let manifest = sandbox.manifest(TWO_DEPS);

  let output = sandbox
    .cmd()
    .arg("scan")
    .arg(&manifest)
    .arg("--packages")
    .arg(sandbox.packages())
    .arg("--json")
    .output()
    .unwrap();
  assert!(output.status.success());

  let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(summary["phase"], "pending");
  assert_eq!(summary["missing"], serde_json::json!(["bob.scene.1"]));
  assert_eq!(summary["installed"], serde_json::json!(["acme.hair.3"]));
}

#[test]
fn scan_reads_meta_json_from_directory() {
  let sandbox = Sandbox::new();
  sandbox.install("acme.hair.3");
  sandbox.install("bob.scene.1");
  sandbox.manifest(TWO_DEPS);

  sandbox
    .cmd()
    .arg("scan")
    .arg(sandbox.temp.path())
    .arg("--packages")
    .arg(sandbox.packages())
    .assert()
    .success()
    .stdout(predicate::str::contains("finished"));
}

#[test]
fn scan_missing_manifest_fails() {
  let sandbox = Sandbox::new();

  sandbox
    .cmd()
    .arg("scan")
    .arg(sandbox.path("nope.json"))
    .arg("--packages")
    .arg(sandbox.packages())
    .assert()
    .failure()
    .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn scan_honors_packages_env() {
  let sandbox = Sandbox::new();
  sandbox.install("acme.hair.3");
  sandbox.install("bob.scene.1");
  let manifest = sandbox.manifest(TWO_DEPS);

  sandbox
    .cmd()
    .env("HUBSYNC_PACKAGES_DIR", sandbox.packages())
    .arg("scan")
    .arg(&manifest)
    .arg("--json")
    .assert()
    .success()
    .stdout(predicate::str::contains("\"finished\""));
}

// =============================================================================
// Fetch
// =============================================================================

#[test]
fn fetch_installs_missing_package() {
  let sandbox = Sandbox::new();
  sandbox.install("acme.hair.3");
  sandbox.mirror("bob.scene.1.var", b"scene archive");
  let manifest = sandbox.manifest(TWO_DEPS);
  let catalog = sandbox.catalog(
    r#"{
      "items": [
        { "name": "bob.scene.1", "group": "bob.scene", "version": "1", "file": "bob.scene.1.var" }
      ]
    }"#,
  );

  sandbox
    .fetch(&manifest, &catalog)
    .assert()
    .success()
    .stdout(predicate::str::contains("All 2 dependencies installed"));

  let installed = fs::read(sandbox.packages().join("bob.scene.1.var")).unwrap();
  assert_eq!(installed, b"scene archive");
}

#[test]
fn fetch_with_nothing_missing_skips_catalog() {
  let sandbox = Sandbox::new();
  sandbox.install("acme.hair.3");
  sandbox.install("bob.scene.1");
  let manifest = sandbox.manifest(TWO_DEPS);

  // The catalog file does not exist; it must never be opened.
  sandbox
    .fetch(&manifest, &sandbox.path("absent.json"))
    .assert()
    .success();
}

#[test]
fn fetch_reports_unmatched_dependency() {
  let sandbox = Sandbox::new();
  sandbox.install("acme.hair.3");
  let manifest = sandbox.manifest(TWO_DEPS);
  let catalog = sandbox.catalog(r#"{ "items": [] }"#);

  let output = sandbox.fetch(&manifest, &catalog).arg("--json").output().unwrap();
  assert!(!output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["success"], false);
  assert_eq!(report["missing"], serde_json::json!(["bob.scene.1"]));
  assert!(!sandbox.packages().join("bob.scene.1.var").exists());
}

#[test]
fn fetch_rejects_corrupt_mirror_file() {
  let sandbox = Sandbox::new();
  sandbox.install("acme.hair.3");
  sandbox.mirror("bob.scene.1.var", b"tampered");
  let manifest = sandbox.manifest(TWO_DEPS);
  let catalog = sandbox.catalog(
    r#"{
      "items": [
        { "name": "bob.scene.1", "group": "bob.scene", "version": "1", "file": "bob.scene.1.var",
          "sha256": "0000000000000000000000000000000000000000000000000000000000000000" }
      ]
    }"#,
  );

  sandbox
    .fetch(&manifest, &catalog)
    .assert()
    .failure()
    .stdout(predicate::str::contains("sha256 mismatch"));

  assert!(!sandbox.packages().join("bob.scene.1.var").exists());
  assert!(!sandbox.packages().join("bob.scene.1.var.part").exists());
}

#[test]
fn fetch_without_catalog_index_fails() {
  let sandbox = Sandbox::new();
  let manifest = sandbox.manifest(TWO_DEPS);

  sandbox
    .fetch(&manifest, &sandbox.path("absent.json"))
    .assert()
    .failure();
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn config_shows_defaults_without_file() {
  let sandbox = Sandbox::new();

  sandbox
    .cmd()
    .arg("config")
    .assert()
    .success()
    .stdout(predicate::str::contains("not found, using defaults"));
}

#[test]
fn config_json_reads_settings_file() {
  let sandbox = Sandbox::new();
  let dir = sandbox.path("config").join("hubsync");
  fs::create_dir_all(&dir).unwrap();
  fs::write(
    dir.join("settings.json"),
    r#"{ "alwaysCheckForUpdates": true, "packagesDir": "/mnt/addons" }"#,
  )
  .unwrap();

  let output = sandbox.cmd().arg("config").arg("--json").output().unwrap();
  assert!(output.status.success());

  let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(config["exists"], true);
  assert_eq!(config["packagesDir"], "/mnt/addons");
  assert_eq!(config["settings"]["alwaysCheckForUpdates"], true);
  assert_eq!(config["settings"]["recursive"], true);
}

#[test]
fn config_rejects_invalid_settings() {
  let sandbox = Sandbox::new();
  let dir = sandbox.path("config").join("hubsync");
  fs::create_dir_all(&dir).unwrap();
  fs::write(dir.join("settings.json"), r#"{ "pollIntervalMs": 0 }"#).unwrap();

  sandbox
    .cmd()
    .arg("config")
    .assert()
    .failure()
    .stderr(predicate::str::contains("pollIntervalMs"));
}
